use std::path::Path;

use console::style;

use crate::{
    config::InstallationConfig,
    error::InstallerError,
    ops::SystemOps,
    prompt::Prompter,
    ui,
};

/// Summary of what was installed, then an optional shell inside the new
/// system for last manual tweaks.
pub fn offer_shell(
    prompter: &mut dyn Prompter,
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let root = mount_root.display().to_string();
    println!();
    ui::print_kv_box(
        "Installed",
        &[
            ("disk", config.disk().unwrap_or("-")),
            ("hostname", config.hostname().unwrap_or("-")),
            ("user", config.username().unwrap_or("-")),
            ("mounted at", root.as_str()),
        ],
    );
    println!();

    if !prompter.confirm("Open a shell in the new system before finishing?", false)? {
        return Ok(());
    }

    println!(
        "  {}",
        style("Tip: type 'exit' or press Ctrl-D to leave the chroot.")
            .dim()
            .italic()
    );
    println!();
    ui::print_info("Entering chroot…");
    println!("{}", style("─".repeat(52)).dim());
    println!();

    ops.chroot_shell(mount_root)?;

    println!();
    println!("{}", style("─".repeat(52)).dim());
    ui::print_success("Exited chroot.");
    Ok(())
}

/// Asked after cleanup, so the target is already unmounted.
pub fn offer_reboot(prompter: &mut dyn Prompter, ops: &dyn SystemOps) -> Result<(), InstallerError> {
    println!();
    ui::print_success("Installation complete. Remove the installation medium before rebooting.");
    if prompter.confirm("Reboot now?", false)? {
        tracing::info!("rebooting");
        ops.reboot()?;
    } else {
        ui::print_info("Reboot when you are ready:  systemctl reboot");
    }
    Ok(())
}
