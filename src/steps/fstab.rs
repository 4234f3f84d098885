use std::path::Path;

use crate::{error::InstallerError, ops::SystemOps, ui};

/// Appends UUID-based entries for everything mounted under `mount_root` to
/// the new system's `/etc/fstab`.
///
/// Equivalent to: `genfstab -U /mnt >> /mnt/etc/fstab`
pub fn generate(ops: &dyn SystemOps, mount_root: &Path) -> Result<(), InstallerError> {
    let pb = ui::spinner("Generating fstab (UUID-based)…");
    let result = ops.generate_fstab(mount_root);
    pb.finish_and_clear();
    result?;

    ui::print_success(&format!("fstab written to {}.", mount_root.join("etc/fstab").display()));
    Ok(())
}
