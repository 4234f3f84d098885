use std::path::Path;

use crate::{
    cleanup::EFI_MOUNT_POINT,
    config::{Bootloader, InstallationConfig},
    error::InstallerError,
    ops::SystemOps,
    plan::{target_path, PartitionPlan},
    subvolume::ROOT_SUBVOLUME,
    ui,
};

pub fn install(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    plan: &PartitionPlan,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let cmdline = kernel_cmdline(config, &root_spec(ops, plan, mount_root)?)?;
    tracing::info!(bootloader = %config.bootloader, %cmdline, "installing bootloader");

    match config.bootloader {
        Bootloader::SystemdBoot => systemd_boot(ops, config, mount_root, &cmdline)?,
        Bootloader::Grub => grub(ops, mount_root)?,
        Bootloader::Refind => refind(ops, config, mount_root, &cmdline)?,
    }
    ui::print_success(&format!("{} installed.", config.bootloader));
    Ok(())
}

/// `root=` value for the kernel command line. Prefers the PARTUUID and
/// falls back to the device path when `blkid` has nothing to say.
fn root_spec(ops: &dyn SystemOps, plan: &PartitionPlan, mount_root: &Path) -> Result<String, InstallerError> {
    let partuuid = ops.chroot_capture(
        mount_root,
        "blkid",
        &["-s", "PARTUUID", "-o", "value", &plan.root.path],
    )?;
    Ok(match partuuid.trim() {
        "" => plan.root.path.clone(),
        id => format!("PARTUUID={id}"),
    })
}

pub fn kernel_cmdline(config: &InstallationConfig, root: &str) -> Result<String, InstallerError> {
    let mut cmdline = format!("root={root} rw");
    if config.require_filesystem()?.uses_subvolumes() {
        cmdline.push_str(&format!(" rootflags=subvol={ROOT_SUBVOLUME}"));
    }
    Ok(cmdline)
}

/// Initrd images in load order: microcode first, then the kernel's own.
pub fn initrd_images(config: &InstallationConfig) -> Vec<String> {
    config
        .microcode_package()
        .map(|ucode| format!("/{ucode}.img"))
        .into_iter()
        .chain(std::iter::once(format!(
            "/initramfs-{}.img",
            config.kernel.package_name()
        )))
        .collect()
}

pub fn loader_entry(config: &InstallationConfig, cmdline: &str) -> String {
    let mut entry = format!(
        "title   Arch Linux\nlinux   /vmlinuz-{}\n",
        config.kernel.package_name()
    );
    for image in initrd_images(config) {
        entry.push_str(&format!("initrd  {image}\n"));
    }
    entry.push_str(&format!("options {cmdline}\n"));
    entry
}

fn systemd_boot(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
    cmdline: &str,
) -> Result<(), InstallerError> {
    ops.chroot(mount_root, "bootctl", &["install"], None)?;
    let boot = target_path(mount_root, EFI_MOUNT_POINT);
    ops.write_file(
        &boot.join("loader/loader.conf"),
        "default arch.conf\ntimeout 3\nconsole-mode max\neditor no\n",
    )?;
    ops.write_file(&boot.join("loader/entries/arch.conf"), &loader_entry(config, cmdline))
}

fn grub(ops: &dyn SystemOps, mount_root: &Path) -> Result<(), InstallerError> {
    let efi_dir = format!("--efi-directory={EFI_MOUNT_POINT}");
    ops.chroot(
        mount_root,
        "grub-install",
        &["--target=x86_64-efi", &efi_dir, "--bootloader-id=GRUB"],
        None,
    )?;
    ops.chroot(mount_root, "grub-mkconfig", &["-o", "/boot/grub/grub.cfg"], None)
}

/// `refind_linux.conf`: normal, fallback and text-mode boot entries.
pub fn refind_linux_conf(config: &InstallationConfig, cmdline: &str) -> String {
    let initrds: String = initrd_images(config)
        .iter()
        .map(|img| format!(" initrd={img}"))
        .collect();
    let fallback = format!(" initrd=/initramfs-{}-fallback.img", config.kernel.package_name());
    format!(
        "\"Boot with standard options\"  \"{cmdline}{initrds}\"\n\
         \"Boot using fallback initramfs\"  \"{cmdline}{fallback}\"\n\
         \"Boot to terminal\"  \"{cmdline}{initrds} systemd.unit=multi-user.target\"\n"
    )
}

fn refind(
    ops: &dyn SystemOps,
    config: &InstallationConfig,
    mount_root: &Path,
    cmdline: &str,
) -> Result<(), InstallerError> {
    ops.chroot(mount_root, "refind-install", &[], None)?;
    ops.write_file(
        &target_path(mount_root, EFI_MOUNT_POINT).join("refind_linux.conf"),
        &refind_linux_conf(config, cmdline),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CpuVendor, Filesystem, KernelVariant};

    fn config(fs: Filesystem) -> InstallationConfig {
        let mut c = InstallationConfig::new();
        c.set_filesystem(fs);
        c
    }

    #[test]
    fn btrfs_root_names_its_subvolume() {
        let cmdline = kernel_cmdline(&config(Filesystem::Btrfs), "PARTUUID=abcd").unwrap();
        assert_eq!(cmdline, "root=PARTUUID=abcd rw rootflags=subvol=@");
        let cmdline = kernel_cmdline(&config(Filesystem::Ext4), "/dev/sda3").unwrap();
        assert_eq!(cmdline, "root=/dev/sda3 rw");
    }

    #[test]
    fn microcode_loads_before_the_initramfs() {
        let mut c = config(Filesystem::Ext4);
        c.cpu_vendor = CpuVendor::Amd;
        c.microcode = true;
        c.kernel = KernelVariant::Lts;
        assert_eq!(initrd_images(&c), ["/amd-ucode.img", "/initramfs-linux-lts.img"]);

        let entry = loader_entry(&c, "root=/dev/sda3 rw");
        assert!(entry.contains("linux   /vmlinuz-linux-lts\n"), "{entry}");
        let ucode = entry.find("amd-ucode").unwrap();
        let initramfs = entry.find("initramfs-linux-lts").unwrap();
        assert!(ucode < initramfs);
    }

    #[test]
    fn refind_entries() {
        let c = config(Filesystem::Btrfs);
        let conf = refind_linux_conf(&c, "root=PARTUUID=x rw rootflags=subvol=@");
        assert_eq!(conf.lines().count(), 3);
        assert!(conf.contains("initrd=/initramfs-linux-fallback.img"));
        assert!(conf.contains("systemd.unit=multi-user.target"));
    }
}
