use clap::ValueEnum;
use strum::Display;

use crate::{
    cmd,
    error::InstallerError,
    lsblk::Disk,
    ops::SystemOps,
    plan::{is_known_virtual_disk, MIN_DISK_BYTES},
    ui,
};

/// Tools the installer shells out to. Checked before anything else runs.
pub const REQUIRED_TOOLS: &[&str] = &[
    "lsblk",
    "wipefs",
    "sgdisk",
    "partprobe",
    "mkfs.fat",
    "mkswap",
    "mkfs.ext4",
    "mkfs.btrfs",
    "mkfs.xfs",
    "btrfs",
    "mount",
    "umount",
    "swapon",
    "swapoff",
    "pacstrap",
    "genfstab",
    "arch-chroot",
    "curl",
    "ping",
];

/// Hosts probed by the connectivity check.
pub const NETWORK_HOSTS: &[&str] = &["archlinux.org", "geo.mirror.pkgbuild.com", "google.com"];

/// How many of `NETWORK_HOSTS` must answer before the network counts as up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum NetworkPolicy {
    /// One reachable host is enough.
    Any,
    /// Two of the three hosts must answer, so one flaky host does not block.
    #[default]
    Quorum,
}

impl NetworkPolicy {
    pub fn required(self) -> usize {
        match self {
            NetworkPolicy::Any => 1,
            NetworkPolicy::Quorum => 2,
        }
    }
}

/// Root, tools, firmware, network. Stops at the first failure.
pub fn run(
    ops: &dyn SystemOps,
    allow_bios: bool,
    policy: NetworkPolicy,
) -> Result<(), InstallerError> {
    check_root(ops)?;
    check_dependencies(ops)?;
    check_boot_mode(ops, allow_bios)?;
    check_network(ops, policy)
}

pub fn check_root(ops: &dyn SystemOps) -> Result<(), InstallerError> {
    if !ops.is_root() {
        return Err(InstallerError::NotRoot);
    }
    ui::print_success("Running as root.");
    Ok(())
}

/// Lists every missing tool together with the package that provides it.
pub fn check_dependencies(ops: &dyn SystemOps) -> Result<(), InstallerError> {
    let missing: Vec<String> = REQUIRED_TOOLS
        .iter()
        .filter(|tool| !ops.binary_exists(tool))
        .map(|tool| match cmd::package_for(tool) {
            pkg if pkg == *tool => tool.to_string(),
            pkg => format!("{tool} ({pkg})"),
        })
        .collect();

    if !missing.is_empty() {
        tracing::error!(?missing, "required tools missing");
        return Err(InstallerError::MissingDependencies(missing));
    }
    ui::print_success("All required tools are available.");
    Ok(())
}

/// UEFI is required unless the override flag was given.
pub fn check_boot_mode(ops: &dyn SystemOps, allow_bios: bool) -> Result<(), InstallerError> {
    if ops.firmware_is_uefi() {
        ui::print_success("UEFI mode detected.");
        return Ok(());
    }
    if allow_bios {
        tracing::warn!("no EFI variables found, continuing because of --allow-bios");
        ui::print_warning("BIOS/Legacy mode detected. Continuing because --allow-bios was given.");
        return Ok(());
    }
    Err(InstallerError::precondition(
        "UEFI firmware not detected (rerun with --allow-bios to override)",
    ))
}

/// A host counts as reachable if a HEAD request or, failing that, a ping
/// gets through.
pub fn check_network(ops: &dyn SystemOps, policy: NetworkPolicy) -> Result<(), InstallerError> {
    let needed = policy.required();
    let pb = ui::spinner("Checking network connectivity…");

    let mut reachable = 0;
    for host in NETWORK_HOSTS {
        let ok = ops.http_head(&format!("https://{host}")) || ops.icmp_echo(host);
        tracing::debug!(host, ok, "connectivity probe");
        if ok {
            reachable += 1;
            if reachable >= needed {
                break;
            }
        }
    }
    pb.finish_and_clear();

    if reachable < needed {
        return Err(InstallerError::precondition(format!(
            "network unreachable: {reachable} of {} hosts answered, {needed} required ({policy} policy)",
            NETWORK_HOSTS.len()
        )));
    }
    ui::print_success("Network is reachable.");
    Ok(())
}

/// Disk-size floor. Virtual disks are trusted at any size.
///
/// Returns the reason for refusal so disk selection can ask again.
pub fn check_disk_size(disk: &Disk) -> Result<(), String> {
    if is_known_virtual_disk(&disk.model) {
        tracing::warn!(disk = %disk.path, model = %disk.model, "virtual disk, size check skipped");
        return Ok(());
    }
    if disk.size_bytes < MIN_DISK_BYTES {
        return Err(format!(
            "{} is too small: {} found, at least {} required",
            disk.path,
            indicatif::HumanBytes(disk.size_bytes),
            indicatif::HumanBytes(MIN_DISK_BYTES)
        ));
    }
    Ok(())
}
