use std::path::Path;

use crate::{
    config::{InstallType, InstallationConfig},
    error::InstallerError,
    ops::SystemOps,
    ui,
};

/// Packages every installation gets.
pub const BASE_PACKAGES: &[&str] = &["base", "linux-firmware", "networkmanager", "sudo", "nano"];

/// Final package list for `pacstrap`, derived from the collected settings.
pub fn resolve(config: &InstallationConfig) -> Result<Vec<&'static str>, InstallerError> {
    let fs = config.require_filesystem()?;

    let mut packages: Vec<&'static str> = BASE_PACKAGES.to_vec();
    packages.push(config.kernel.package_name());
    packages.push(fs.tools_package());
    packages.push("dosfstools");
    packages.extend(config.microcode_package());
    packages.extend(config.shell.package());
    packages.extend_from_slice(config.bootloader.packages());
    if config.install_type == InstallType::Custom {
        packages.extend(config.extras.iter().map(|e| e.package_name()));
    }
    Ok(packages)
}

/// Shows the resolved list. Nothing is installed here.
pub fn show(packages: &[&str]) {
    let list = packages.join(" ");
    let count = packages.len().to_string();
    println!();
    ui::print_kv_box("Packages to install", &[("count", count.as_str())]);
    ui::print_info(&list);
    println!();
}

/// Bootstraps the new system with `pacstrap`.
pub fn install(ops: &dyn SystemOps, mount_root: &Path, packages: &[&str]) -> Result<(), InstallerError> {
    tracing::info!(count = packages.len(), "installing base system");
    ops.pacstrap(mount_root, packages)?;
    ui::print_success("Base system installed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bootloader, CpuVendor, Extra, Filesystem, KernelVariant, Shell};

    fn config() -> InstallationConfig {
        let mut c = InstallationConfig::new();
        c.set_filesystem(Filesystem::Btrfs);
        c
    }

    #[test]
    fn minimal_install_ignores_extras() {
        let mut c = config();
        c.extras = vec![Extra::Vim];
        let pkgs = resolve(&c).unwrap();
        assert!(pkgs.contains(&"base"));
        assert!(pkgs.contains(&"linux"));
        assert!(pkgs.contains(&"btrfs-progs"));
        assert!(!pkgs.contains(&"vim"));
    }

    #[test]
    fn choices_add_their_packages() {
        let mut c = config();
        c.kernel = KernelVariant::Zen;
        c.cpu_vendor = CpuVendor::Intel;
        c.microcode = true;
        c.shell = Shell::Zsh;
        c.bootloader = Bootloader::Grub;
        c.install_type = InstallType::Custom;
        c.extras = vec![Extra::Zram, Extra::BaseDevel];

        let pkgs = resolve(&c).unwrap();
        for want in ["linux-zen", "intel-ucode", "zsh", "grub", "efibootmgr", "zram-generator", "base-devel"] {
            assert!(pkgs.contains(&want), "missing {want}: {pkgs:?}");
        }
        assert!(!pkgs.contains(&"linux"));
    }

    #[test]
    fn filesystem_is_required() {
        assert!(matches!(
            resolve(&InstallationConfig::new()),
            Err(InstallerError::Incomplete("filesystem"))
        ));
    }
}
