use std::path::Path;

use crate::{config::InstallationConfig, error::InstallerError, ops::SystemOps, ui};

/// `useradd` arguments for the configured account.
pub fn useradd_args(config: &InstallationConfig) -> Result<Vec<&str>, InstallerError> {
    let mut args = vec!["-m", "-s", config.shell.path()];
    if config.sudo {
        args.extend(["-G", "wheel"]);
    }
    args.push(config.require_username()?);
    Ok(args)
}

/// Creates the user with a home directory and login shell, then sets the
/// password. The password only ever travels over stdin. Does nothing when no
/// account was requested.
pub fn create(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    if !config.has_user() {
        tracing::info!("no user account requested");
        ui::print_info("Skipping user creation.");
        return Ok(());
    }
    let username = config.require_username()?;
    let password = config.require_user_password()?;

    ops.chroot(mount_root, "useradd", &useradd_args(config)?, None)?;
    ops.chroot(mount_root, "chpasswd", &[], Some(&format!("{username}:{password}\n")))?;

    tracing::info!(username, shell = %config.shell, sudo = config.sudo, "user created");
    ui::print_success(&format!("User {username} created."));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Shell;

    #[test]
    fn wheel_membership_follows_sudo_flag() {
        let mut config = InstallationConfig::new();
        config.set_username("alice").unwrap();
        config.shell = Shell::Zsh;

        config.sudo = true;
        assert_eq!(
            useradd_args(&config).unwrap(),
            ["-m", "-s", "/usr/bin/zsh", "-G", "wheel", "alice"]
        );

        config.sudo = false;
        assert_eq!(useradd_args(&config).unwrap(), ["-m", "-s", "/usr/bin/zsh", "alice"]);
    }
}
