use crate::{
    error::InstallerError,
    ops::SystemOps,
    plan::{wait_for_partitions, PartitionPlan, RetryPolicy},
    ui,
};

/// Writes the EFI → swap → root table and waits for the kernel to create
/// the partition nodes.
pub fn run(ops: &dyn SystemOps, plan: &PartitionPlan, retry: RetryPolicy) -> Result<(), InstallerError> {
    let sizes: Vec<(String, String)> = plan
        .partitions()
        .iter()
        .map(|p| {
            let size = match p.size_mib {
                Some(mib) => format!("{mib} MiB"),
                None => "rest of disk".to_string(),
            };
            (format!("{} ({})", p.role.label(), p.path), size)
        })
        .collect();
    let rows: Vec<(&str, &str)> = sizes.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    println!();
    ui::print_kv_box("Partition Layout", &rows);
    println!();

    ops.create_partitions(plan)?;

    let pb = ui::spinner("Waiting for partition devices…");
    let ready = wait_for_partitions(ops, plan, retry);
    pb.finish_and_clear();
    ready?;

    ui::print_success(&format!("Partitions ready on {}.", plan.disk));
    Ok(())
}
