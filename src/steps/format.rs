use std::path::Path;

use crate::{
    config::InstallationConfig,
    error::InstallerError,
    ops::SystemOps,
    plan::PartitionPlan,
    subvolume::create_subvolumes,
    ui,
};

/// FAT32 on the EFI partition, swap signature on the swap partition, the
/// chosen filesystem on root. Btrfs additionally gets its subvolumes.
pub fn run(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    plan: &PartitionPlan,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let fs = config.require_filesystem()?;

    ops.format_efi(&plan.efi.path)?;
    ops.format_swap(&plan.swap.path)?;
    ops.format_root(&plan.root.path, fs)?;

    if let Some(layout) = config.subvolumes.as_ref().filter(|_| fs.uses_subvolumes()) {
        create_subvolumes(ops, layout, &plan.root.path, mount_root)?;
        ui::print_success(&format!("{} subvolumes created.", layout.len()));
    }
    Ok(())
}
