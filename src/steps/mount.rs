use std::path::Path;

use crate::{
    cleanup::EFI_MOUNT_POINT,
    config::InstallationConfig,
    error::InstallerError,
    ops::SystemOps,
    plan::{target_path, PartitionPlan},
    subvolume::mount_layout,
};

/// Mounts the new system under `mount_root`.
///
/// Mount order:
///   1. Root  → mount_root (btrfs: every subvolume of the layout)
///   2. EFI   → mount_root/boot
///   3. Swap  → swapon
pub fn run(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    plan: &PartitionPlan,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let fs = config.require_filesystem()?;
    ops.create_dir(mount_root)?;

    match config.subvolumes.as_ref().filter(|_| fs.uses_subvolumes()) {
        Some(layout) => mount_layout(ops, layout, &config.mount_options, &plan.root.path, mount_root)?,
        None => ops.mount(&plan.root.path, mount_root, None)?,
    }

    let efi_target = target_path(mount_root, EFI_MOUNT_POINT);
    ops.create_dir(&efi_target)?;
    ops.mount(&plan.efi.path, &efi_target, None)?;

    ops.swap_on(&plan.swap.path)
}
