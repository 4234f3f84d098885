//! Test doubles for the installer's two seams.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use arch_installer::{
    config::{CpuVendor, Filesystem},
    error::InstallerError,
    install::InstallOptions,
    lsblk::Disk,
    ops::SystemOps,
    plan::{PartitionPlan, RetryPolicy},
    prompt::Answer,
    steps::preflight::NETWORK_HOSTS,
};

pub const GIB: u64 = 1024 * 1024 * 1024;

pub fn disk(path: &str, size_gib: u64, model: &str) -> Disk {
    Disk {
        path: path.to_string(),
        size_bytes: size_gib * GIB,
        model: model.to_string(),
    }
}

/// Options for tests: `/mnt`, quorum network policy, no sleeping between
/// partition polls.
pub fn options() -> InstallOptions {
    InstallOptions {
        retry: RetryPolicy {
            attempts: 3,
            interval: std::time::Duration::ZERO,
        },
        ..InstallOptions::default()
    }
}

/// Records every mutating call and keeps a model of what is mounted.
pub struct FakeOps {
    pub root: bool,
    pub uefi: bool,
    pub missing_binaries: Vec<&'static str>,
    /// Hosts that answer the HEAD probe. Nothing answers ICMP.
    pub reachable_hosts: Vec<&'static str>,
    pub disks: Vec<Disk>,
    pub memory_mib: u64,
    pub cpu: CpuVendor,
    pub partitions_appear: bool,
    /// Any recorded call starting with this prefix fails.
    pub fail_on: Option<String>,

    pub calls: RefCell<Vec<String>>,
    pub mounted: RefCell<Vec<PathBuf>>,
    pub swap_active: RefCell<bool>,
    pub files: RefCell<BTreeMap<PathBuf, String>>,
}

impl Default for FakeOps {
    fn default() -> Self {
        Self {
            root: true,
            uefi: true,
            missing_binaries: Vec::new(),
            reachable_hosts: NETWORK_HOSTS.to_vec(),
            disks: vec![disk("/dev/sda", 100, "Samsung SSD 870")],
            memory_mib: 8192,
            cpu: CpuVendor::Intel,
            partitions_appear: true,
            fail_on: None,
            calls: RefCell::new(Vec::new()),
            mounted: RefCell::new(Vec::new()),
            swap_active: RefCell::new(false),
            files: RefCell::new(BTreeMap::new()),
        }
    }
}

impl FakeOps {
    pub fn failing_on(prefix: &str) -> Self {
        Self {
            fail_on: Some(prefix.to_string()),
            ..Self::default()
        }
    }

    fn record(&self, call: String) -> Result<(), InstallerError> {
        self.calls.borrow_mut().push(call.clone());
        match &self.fail_on {
            Some(prefix) if call.starts_with(prefix.as_str()) => {
                let program = call.split_whitespace().next().unwrap_or_default();
                Err(InstallerError::CommandFailed(program.to_string(), 1))
            }
            _ => Ok(()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls.borrow().iter().position(|c| c.starts_with(prefix))
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.files.borrow().get(Path::new(path)).cloned()
    }

    pub fn nothing_mounted(&self) -> bool {
        self.mounted.borrow().is_empty() && !*self.swap_active.borrow()
    }
}

impl SystemOps for FakeOps {
    fn is_root(&self) -> bool {
        self.root
    }

    fn binary_exists(&self, program: &str) -> bool {
        !self.missing_binaries.iter().any(|m| *m == program)
    }

    fn firmware_is_uefi(&self) -> bool {
        self.uefi
    }

    fn http_head(&self, url: &str) -> bool {
        self.reachable_hosts.iter().any(|h| url.ends_with(h))
    }

    fn icmp_echo(&self, _host: &str) -> bool {
        false
    }

    fn list_disks(&self) -> Vec<Disk> {
        self.disks.clone()
    }

    fn describe_disk(&self, path: &str) -> Option<Disk> {
        self.disks.iter().find(|d| d.path == path).cloned()
    }

    fn is_block_device(&self, path: &str) -> bool {
        self.disks.iter().any(|d| d.path == path)
    }

    fn mount_table(&self) -> String {
        self.mounted
            .borrow()
            .iter()
            .map(|m| format!("/dev/fake {} ext4 rw 0 0\n", m.display()))
            .collect()
    }

    fn total_memory_mib(&self) -> Result<u64, InstallerError> {
        Ok(self.memory_mib)
    }

    fn cpu_vendor(&self) -> CpuVendor {
        self.cpu
    }

    fn timezone_exists(&self, tz: &str) -> bool {
        ["UTC", "Europe/Berlin", "America/New_York"].contains(&tz)
    }

    fn locale_supported(&self, locale: &str) -> bool {
        ["en_US.UTF-8", "de_DE.UTF-8"].contains(&locale)
    }

    fn partition_exists(&self, _path: &str) -> bool {
        self.partitions_appear
    }

    fn is_mounted(&self, target: &Path) -> bool {
        self.mounted.borrow().iter().any(|m| m == target)
    }

    fn wipe_disk(&self, disk: &str) -> Result<(), InstallerError> {
        self.record(format!("wipe_disk {disk}"))
    }

    fn create_partitions(&self, plan: &PartitionPlan) -> Result<(), InstallerError> {
        self.record(format!("create_partitions {}", plan.disk))
    }

    fn settle(&self, _disk: &str) {}

    fn format_efi(&self, device: &str) -> Result<(), InstallerError> {
        self.record(format!("format_efi {device}"))
    }

    fn format_swap(&self, device: &str) -> Result<(), InstallerError> {
        self.record(format!("format_swap {device}"))
    }

    fn format_root(&self, device: &str, fs: Filesystem) -> Result<(), InstallerError> {
        self.record(format!("format_root {device} {fs}"))
    }

    fn create_subvolume(&self, path: &Path) -> Result<(), InstallerError> {
        self.record(format!("create_subvolume {}", path.display()))
    }

    fn create_dir(&self, path: &Path) -> Result<(), InstallerError> {
        self.record(format!("create_dir {}", path.display()))
    }

    fn mount(&self, device: &str, target: &Path, options: Option<&str>) -> Result<(), InstallerError> {
        self.record(format!(
            "mount {device} {} {}",
            target.display(),
            options.unwrap_or("-")
        ))?;
        self.mounted.borrow_mut().push(target.to_path_buf());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<(), InstallerError> {
        self.record(format!("unmount {}", target.display()))?;
        let mut mounted = self.mounted.borrow_mut();
        match mounted.iter().position(|m| m == target) {
            Some(i) => {
                mounted.remove(i);
                Ok(())
            }
            None => Err(InstallerError::CommandFailed("umount".into(), 32)),
        }
    }

    fn swap_on(&self, device: &str) -> Result<(), InstallerError> {
        self.record(format!("swap_on {device}"))?;
        *self.swap_active.borrow_mut() = true;
        Ok(())
    }

    fn swap_off_all(&self) -> Result<(), InstallerError> {
        self.record("swap_off_all".to_string())?;
        *self.swap_active.borrow_mut() = false;
        Ok(())
    }

    fn pacstrap(&self, root: &Path, packages: &[&str]) -> Result<(), InstallerError> {
        self.record(format!("pacstrap {} {}", root.display(), packages.join(" ")))
    }

    fn generate_fstab(&self, root: &Path) -> Result<(), InstallerError> {
        self.record(format!("generate_fstab {}", root.display()))
    }

    fn chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<(), InstallerError> {
        let stdin = if stdin.is_some() { " <stdin>" } else { "" };
        self.record(format!(
            "chroot {} {program} {}{stdin}",
            root.display(),
            args.join(" ")
        ))
    }

    fn chroot_capture(&self, root: &Path, program: &str, args: &[&str]) -> Result<String, InstallerError> {
        self.record(format!("chroot {} {program} {}", root.display(), args.join(" ")))?;
        Ok(match program {
            "blkid" => "0f1e2d3c-aaaa-bbbb-cccc-123456789abc\n".to_string(),
            _ => String::new(),
        })
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), InstallerError> {
        self.record(format!("write_file {}", path.display()))?;
        self.files.borrow_mut().insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, InstallerError> {
        Ok(self.files.borrow().get(path).cloned().unwrap_or_default())
    }

    fn chroot_shell(&self, root: &Path) -> Result<(), InstallerError> {
        self.record(format!("chroot_shell {}", root.display()))
    }

    fn reboot(&self) -> Result<(), InstallerError> {
        self.record("reboot".to_string())
    }
}

// ── Scripted answers ──────────────────────────────────────────────────────────

pub fn text(s: &str) -> Answer {
    Answer::text(s)
}

/// Answers for the disk picker and the settings questionnaire: first listed
/// disk, ext4, default swap, stable kernel, microcode yes, minimal install,
/// systemd-boot, UTC, en_US.UTF-8, archbox, a user alice with bash and sudo,
/// no multilib.
pub fn ext4_settings() -> Vec<Answer> {
    vec![
        Answer::Choice(0),  // target disk
        Answer::Choice(0),  // filesystem: ext4
        text(""),           // swap size: default
        Answer::Choice(0),  // kernel
        Answer::Yes,        // microcode
        Answer::Choice(0),  // installation type: minimal
        Answer::Choice(0),  // bootloader: systemd-boot
        text(""),           // timezone: UTC
        text(""),           // locale: en_US.UTF-8
        text("archbox"),    // hostname
        text("rootpass"),   // root password
        Answer::Yes,        // create a user
        text("alice"),      // username
        text("alicepass"),  // user password
        Answer::Choice(0),  // shell: bash
        Answer::Yes,        // sudo
        Answer::No,         // multilib
    ]
}

/// Completion prompts: no chroot shell, no reboot.
pub fn finish() -> Vec<Answer> {
    vec![Answer::No, Answer::No]
}
