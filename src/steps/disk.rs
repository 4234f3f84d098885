use console::style;

use crate::{
    error::InstallerError,
    lsblk::Disk,
    ops::SystemOps,
    plan::is_known_virtual_disk,
    prompt::{prompt_until_valid, Prompter},
    steps::preflight::check_disk_size,
    ui,
    validate::validate_disk_with,
};

/// Arrow-key disk picker. A disk that is mounted, not a block device or too
/// small is refused and the user picks again.
pub fn select(prompter: &mut dyn Prompter, ops: &dyn SystemOps) -> Result<Disk, InstallerError> {
    let disks = ops.list_disks();

    if disks.is_empty() {
        // lsblk unavailable: fall back to manual input.
        ui::print_warning("Could not detect disks automatically.");
        return prompt_until_valid(prompter, "Enter disk path (e.g. /dev/sda)", Some("/dev/sda"), |s| {
            let path = s.trim();
            let disk = ops
                .describe_disk(path)
                .ok_or_else(|| format!("could not read the size of {path}"))?;
            eligible(ops, &disk)?;
            Ok(disk)
        });
    }

    println!();
    ui::print_info("Use ↑ ↓ arrow keys to select the target disk, then press Enter.");
    println!(
        "  {:<14}  {:>10}   {}",
        style("DISK").dim(),
        style("SIZE").dim(),
        style("MODEL").dim()
    );
    println!("  {}", style("─".repeat(44)).dim());

    let labels: Vec<String> = disks.iter().map(Disk::display).collect();
    loop {
        let idx = prompter.select("Target disk", &labels, 0)?;
        let Some(disk) = disks.get(idx) else { continue };
        match eligible(ops, disk) {
            Ok(()) => {
                tracing::info!(disk = %disk.path, size = disk.size_bytes, model = %disk.model, "disk selected");
                ui::print_success(&format!("Selected {}.", disk.path));
                return Ok(disk.clone());
            }
            Err(reason) => {
                tracing::info!(disk = %disk.path, %reason, "disk refused");
                prompter.reject(&reason);
            }
        }
    }
}

fn eligible(ops: &dyn SystemOps, disk: &Disk) -> Result<(), String> {
    validate_disk_with(&disk.path, ops.is_block_device(&disk.path), &ops.mount_table())
        .map_err(|e| e.to_string())?;
    check_disk_size(disk)
}

/// The last question before anything is written. A virtual disk is trusted
/// without asking; any answer other than yes cancels the installation.
pub fn confirm_wipe(prompter: &mut dyn Prompter, disk: &Disk) -> Result<(), InstallerError> {
    if is_known_virtual_disk(&disk.model) {
        tracing::warn!(disk = %disk.path, model = %disk.model, "virtual disk, wipe confirmation skipped");
        ui::print_warning(&format!(
            "{} looks like a virtual disk ({}); not asking for confirmation.",
            disk.path, disk.model
        ));
        return Ok(());
    }

    println!();
    println!(
        "  {}",
        style(format!("⚠  ALL DATA ON {} WILL BE PERMANENTLY ERASED.", disk.path))
            .red()
            .bold()
    );
    println!();

    if !prompter.confirm(&format!("Erase {} and install?", disk.path), false)? {
        tracing::info!(disk = %disk.path, "wipe declined");
        return Err(InstallerError::Cancelled);
    }
    Ok(())
}

/// Clears filesystem signatures and the partition table.
pub fn wipe(ops: &dyn SystemOps, disk: &str) -> Result<(), InstallerError> {
    tracing::info!(disk, "wiping disk");
    ops.wipe_disk(disk)
}
