//! Configuration of the installed system from inside the chroot.

use std::path::Path;

use crate::{
    config::{Extra, InstallationConfig},
    error::InstallerError,
    ops::SystemOps,
    plan::target_path,
    ui,
};

/// Sudoers drop-in for the `wheel` group. Credentials are cached for five
/// minutes; there is never a NOPASSWD rule.
pub const SUDOERS_DROP_IN: &str = "\
%wheel ALL=(ALL:ALL) ALL
Defaults timestamp_timeout=5
";

pub const SUDOERS_DROP_IN_PATH: &str = "/etc/sudoers.d/10-wheel";

pub const ZRAM_CONFIG: &str = "\
[zram0]
zram-size = ram / 2
compression-algorithm = zstd
";

// ── Initramfs ─────────────────────────────────────────────────────────────────

pub fn initramfs(ops: &dyn SystemOps, mount_root: &Path) -> Result<(), InstallerError> {
    ops.chroot(mount_root, "mkinitcpio", &["-P"], None)?;
    ui::print_success("Initramfs images generated.");
    Ok(())
}

// ── Network ───────────────────────────────────────────────────────────────────

pub fn network_service(ops: &dyn SystemOps, mount_root: &Path) -> Result<(), InstallerError> {
    ops.chroot(mount_root, "systemctl", &["enable", "NetworkManager"], None)?;
    ui::print_success("NetworkManager enabled.");
    Ok(())
}

// ── Locale, hostname, timezone ────────────────────────────────────────────────

pub fn identity(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let locale = config.require_locale()?;
    ops.write_file(&target_path(mount_root, "/etc/locale.gen"), &locale_gen_line(locale))?;
    ops.chroot(mount_root, "locale-gen", &[], None)?;
    ops.write_file(&target_path(mount_root, "/etc/locale.conf"), &format!("LANG={locale}\n"))?;
    ui::print_success(&format!("Locale set to {locale}."));

    let hostname = config.require_hostname()?;
    ops.write_file(&target_path(mount_root, "/etc/hostname"), &format!("{hostname}\n"))?;
    ops.write_file(&target_path(mount_root, "/etc/hosts"), &hosts_file(hostname))?;
    ui::print_success(&format!("Hostname set to {hostname}."));

    let timezone = config.require_timezone()?;
    let zoneinfo = format!("/usr/share/zoneinfo/{timezone}");
    ops.chroot(mount_root, "ln", &["-sf", &zoneinfo, "/etc/localtime"], None)?;
    ops.chroot(mount_root, "hwclock", &["--systohc"], None)?;
    ui::print_success(&format!("Timezone set to {timezone}."));
    Ok(())
}

/// `/etc/locale.gen` line for `locale`; the charset follows the dot.
pub fn locale_gen_line(locale: &str) -> String {
    let charset = locale.split_once('.').map(|(_, c)| c).unwrap_or("ISO-8859-1");
    format!("{locale} {charset}\n")
}

pub fn hosts_file(hostname: &str) -> String {
    format!(
        "127.0.0.1   localhost\n\
         ::1         localhost\n\
         127.0.1.1   {hostname}.localdomain {hostname}\n"
    )
}

// ── Shell, sudo and the rest ──────────────────────────────────────────────────

/// Multilib, root password, ZRAM and the sudoers drop-in.
pub fn shell_and_sudo(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    if config.multilib {
        let path = target_path(mount_root, "/etc/pacman.conf");
        let current = ops.read_file(&path)?;
        ops.write_file(&path, &enable_multilib(&current))?;
        ui::print_success("Multilib repository enabled.");
    }

    let root_password = config.require_root_password()?;
    ops.chroot(mount_root, "chpasswd", &[], Some(&format!("root:{root_password}\n")))?;
    ui::print_success("Root password set.");

    if config.extras.contains(&Extra::Zram) {
        ops.write_file(&target_path(mount_root, "/etc/systemd/zram-generator.conf"), ZRAM_CONFIG)?;
        ui::print_success("ZRAM swap configured.");
    }

    if config.sudo {
        ops.write_file(&target_path(mount_root, SUDOERS_DROP_IN_PATH), SUDOERS_DROP_IN)?;
        ops.chroot(mount_root, "chmod", &["0440", SUDOERS_DROP_IN_PATH], None)?;
        ops.chroot(mount_root, "visudo", &["-c", "-f", SUDOERS_DROP_IN_PATH], None)?;
        ui::print_success("sudo enabled for the wheel group.");
    }
    Ok(())
}

/// Uncomments the `[multilib]` section header and the `Include` line that
/// follows it. Everything else is left alone.
pub fn enable_multilib(pacman_conf: &str) -> String {
    let mut out = String::with_capacity(pacman_conf.len());
    let mut in_section = false;

    for line in pacman_conf.lines() {
        let trimmed = line.trim();
        if trimmed == "#[multilib]" || trimmed == "[multilib]" {
            in_section = true;
            out.push_str("[multilib]\n");
            continue;
        }
        if in_section {
            if let Some(include) = trimmed.strip_prefix('#').map(str::trim_start) {
                if include.starts_with("Include") {
                    out.push_str(include);
                    out.push('\n');
                    in_section = false;
                    continue;
                }
            }
            if trimmed.starts_with("Include") || trimmed.starts_with('[') {
                in_section = false;
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACMAN_CONF: &str = "\
[core]
Include = /etc/pacman.d/mirrorlist

#[multilib-testing]
#Include = /etc/pacman.d/mirrorlist

#[multilib]
#Include = /etc/pacman.d/mirrorlist
";

    #[test]
    fn multilib_is_uncommented() {
        let conf = enable_multilib(PACMAN_CONF);
        assert!(conf.contains("\n[multilib]\nInclude = /etc/pacman.d/mirrorlist\n"), "{conf}");
        assert!(conf.contains("#[multilib-testing]\n#Include"), "{conf}");
    }

    #[test]
    fn enabling_twice_changes_nothing() {
        let once = enable_multilib(PACMAN_CONF);
        assert_eq!(enable_multilib(&once), once);
    }

    #[test]
    fn locale_lines() {
        assert_eq!(locale_gen_line("en_US.UTF-8"), "en_US.UTF-8 UTF-8\n");
        assert_eq!(locale_gen_line("de_DE"), "de_DE ISO-8859-1\n");
    }

    #[test]
    fn hosts_names_the_machine() {
        let hosts = hosts_file("archbox");
        assert!(hosts.contains("127.0.1.1   archbox.localdomain archbox"));
    }

    #[test]
    fn sudo_drop_in_never_skips_passwords() {
        assert!(!SUDOERS_DROP_IN.contains("NOPASSWD"));
        assert!(SUDOERS_DROP_IN.contains("timestamp_timeout=5"));
    }
}
