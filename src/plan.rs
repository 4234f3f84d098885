//! Disk planning: partition layout, partition naming and swap sizing.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use regex::Regex;

use crate::{error::InstallerError, ops::SystemOps};

/// Disks below this size are refused unless they look virtual.
pub const MIN_DISK_BYTES: u64 = 20 * 1024 * 1024 * 1024;

/// Smallest root partition the swap size may leave behind.
pub const ROOT_MIN_MIB: u64 = 4096;

/// Alignment gap at the start plus the backup GPT at the end.
const GPT_OVERHEAD_MIB: u64 = 2;

/// Model-string fragments that identify a virtual disk.
const VIRTUAL_DISK_MARKERS: &[&str] = &["qemu", "vbox", "virtual", "vmware", "virtio"];

static P_SEPARATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(nvme[0-9]+n[0-9]+|mmcblk[0-9]+)$").unwrap());

/// True when partitions of `disk` are named `<disk>p<N>`.
pub fn is_nvme_style(disk: &str) -> bool {
    P_SEPARATED_RE.is_match(disk)
}

/// Device path of partition `index` on `disk`.
///
/// Every partition path in the installer comes from here; a wrong separator
/// would point at a different device node.
pub fn part_path(disk: &str, index: u32) -> String {
    if is_nvme_style(disk) {
        format!("{disk}p{index}")
    } else {
        format!("{disk}{index}")
    }
}

/// Default swap: half of physical memory, rounded down.
pub fn swap_size_mib(total_memory_mib: u64) -> u64 {
    total_memory_mib / 2
}

/// Largest swap partition that still leaves `ROOT_MIN_MIB` for root.
/// Zero when the disk cannot hold EFI and a minimal root at all.
pub fn max_swap_mib(disk_bytes: u64, efi_mib: u64) -> u64 {
    (disk_bytes / (1024 * 1024))
        .saturating_sub(GPT_OVERHEAD_MIB)
        .saturating_sub(efi_mib)
        .saturating_sub(ROOT_MIN_MIB)
}

/// Decides whether a disk model string names a hypervisor-backed disk.
///
/// Virtual disks skip both the minimum-size check and the wipe confirmation.
/// Matching is a plain substring test on the model string, so this is the
/// only place to tighten if that proves too loose.
pub fn is_known_virtual_disk(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    VIRTUAL_DISK_MARKERS.iter().any(|m| model.contains(m))
}

/// Maps a mount point of the new system to its path under `mount_root`.
pub fn target_path(mount_root: &Path, mount_point: &str) -> PathBuf {
    match mount_point.trim_start_matches('/') {
        "" => mount_root.to_path_buf(),
        rel => mount_root.join(rel),
    }
}

// ── Partition plan ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionRole {
    Efi,
    Swap,
    Root,
}

impl PartitionRole {
    /// GPT type code as understood by `sgdisk`.
    pub fn type_code(self) -> &'static str {
        match self {
            PartitionRole::Efi => "ef00",
            PartitionRole::Swap => "8200",
            PartitionRole::Root => "8300",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PartitionRole::Efi => "EFI",
            PartitionRole::Swap => "Swap",
            PartitionRole::Root => "Root",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    pub index: u32,
    pub path: String,
    pub role: PartitionRole,
    /// `None` takes the rest of the disk.
    pub size_mib: Option<u64>,
}

/// EFI → swap → root, root taking whatever is left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    pub disk: String,
    pub efi: PartitionSpec,
    pub swap: PartitionSpec,
    pub root: PartitionSpec,
}

impl PartitionPlan {
    pub fn new(disk: &str, efi_mib: u64, swap_mib: u64) -> Self {
        let spec = |index, role, size_mib| PartitionSpec {
            index,
            path: part_path(disk, index),
            role,
            size_mib,
        };
        Self {
            disk: disk.to_string(),
            efi: spec(1, PartitionRole::Efi, Some(efi_mib)),
            swap: spec(2, PartitionRole::Swap, Some(swap_mib)),
            root: spec(3, PartitionRole::Root, None),
        }
    }

    pub fn partitions(&self) -> [&PartitionSpec; 3] {
        [&self.efi, &self.swap, &self.root]
    }
}

// ── Waiting for device nodes ──────────────────────────────────────────────────

/// Bounded polling for partition nodes after the table is rewritten.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(500),
        }
    }
}

pub fn wait_for_partitions(
    ops: &dyn SystemOps,
    plan: &PartitionPlan,
    policy: RetryPolicy,
) -> Result<(), InstallerError> {
    let mut missing = plan.efi.path.clone();
    for attempt in 1..=policy.attempts {
        ops.settle(&plan.disk);
        match plan.partitions().into_iter().find(|p| !ops.partition_exists(&p.path)) {
            None => {
                tracing::debug!(attempt, disk = %plan.disk, "partition nodes present");
                return Ok(());
            }
            Some(p) => missing = p.path.clone(),
        }
        tracing::debug!(attempt, device = %missing, "waiting for partition node");
        if attempt < policy.attempts {
            thread::sleep(policy.interval);
        }
    }
    Err(InstallerError::PartitionsNotReady {
        device: missing,
        attempts: policy.attempts,
    })
}
