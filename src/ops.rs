//! External collaborators.
//!
//! Everything the installer asks of the outside world goes through
//! `SystemOps`: probes, disk tools, mounts, the package bootstrapper and
//! chrooted commands. Each call either succeeds or returns an error; callers never
//! look at command lines. `HostOps` is the real implementation.

use std::fs;
use std::path::Path;

use crate::{
    cmd::Runner,
    config::{CpuVendor, Filesystem},
    error::InstallerError,
    hardware,
    lsblk::{self, Disk},
    plan::PartitionPlan,
};

pub trait SystemOps {
    // ── Probes (read-only) ────────────────────────────────────────────────────
    fn is_root(&self) -> bool;
    fn binary_exists(&self, program: &str) -> bool;
    fn firmware_is_uefi(&self) -> bool;
    fn http_head(&self, url: &str) -> bool;
    fn icmp_echo(&self, host: &str) -> bool;
    fn list_disks(&self) -> Vec<Disk>;
    fn describe_disk(&self, path: &str) -> Option<Disk>;
    fn is_block_device(&self, path: &str) -> bool;
    fn mount_table(&self) -> String;
    fn total_memory_mib(&self) -> Result<u64, InstallerError>;
    fn cpu_vendor(&self) -> CpuVendor;
    fn timezone_exists(&self, tz: &str) -> bool;
    fn locale_supported(&self, locale: &str) -> bool;
    fn partition_exists(&self, path: &str) -> bool;

    /// True when `target` is currently a mount point.
    fn is_mounted(&self, target: &Path) -> bool {
        let target = target.to_string_lossy();
        hardware::mount_table_has_target(&self.mount_table(), &target)
    }

    // ── Disk mutation ─────────────────────────────────────────────────────────
    fn wipe_disk(&self, disk: &str) -> Result<(), InstallerError>;
    fn create_partitions(&self, plan: &PartitionPlan) -> Result<(), InstallerError>;
    /// Asks the kernel to re-read the partition table. Best effort.
    fn settle(&self, disk: &str);
    fn format_efi(&self, device: &str) -> Result<(), InstallerError>;
    fn format_swap(&self, device: &str) -> Result<(), InstallerError>;
    fn format_root(&self, device: &str, fs: Filesystem) -> Result<(), InstallerError>;
    fn create_subvolume(&self, path: &Path) -> Result<(), InstallerError>;

    // ── Mounts ────────────────────────────────────────────────────────────────
    fn create_dir(&self, path: &Path) -> Result<(), InstallerError>;
    fn mount(&self, device: &str, target: &Path, options: Option<&str>)
        -> Result<(), InstallerError>;
    fn unmount(&self, target: &Path) -> Result<(), InstallerError>;
    fn swap_on(&self, device: &str) -> Result<(), InstallerError>;
    fn swap_off_all(&self) -> Result<(), InstallerError>;

    // ── Target system ─────────────────────────────────────────────────────────
    fn pacstrap(&self, root: &Path, packages: &[&str]) -> Result<(), InstallerError>;
    fn generate_fstab(&self, root: &Path) -> Result<(), InstallerError>;
    /// Runs a command inside the target, optionally feeding it `stdin`.
    fn chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<(), InstallerError>;
    fn chroot_capture(&self, root: &Path, program: &str, args: &[&str])
        -> Result<String, InstallerError>;
    fn write_file(&self, path: &Path, contents: &str) -> Result<(), InstallerError>;
    fn read_file(&self, path: &Path) -> Result<String, InstallerError>;
    fn chroot_shell(&self, root: &Path) -> Result<(), InstallerError>;
    fn reboot(&self) -> Result<(), InstallerError>;
}

// ── Host implementation ───────────────────────────────────────────────────────

/// Talks to the real machine through `cmd::Runner`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostOps {
    runner: Runner,
}

impl HostOps {
    pub fn new(runner: Runner) -> Self {
        Self { runner }
    }

    pub fn is_dry_run(&self) -> bool {
        self.runner.dry_run
    }
}

impl SystemOps for HostOps {
    /// Skipped automatically in dry-run mode: no root needed to simulate.
    fn is_root(&self) -> bool {
        self.is_dry_run() || nix::unistd::geteuid().is_root()
    }

    fn binary_exists(&self, program: &str) -> bool {
        self.runner.binary_exists(program)
    }

    /// In dry-run mode the efivars path won't exist on most dev machines,
    /// so UEFI is simulated and the full flow can be exercised.
    fn firmware_is_uefi(&self) -> bool {
        self.is_dry_run() || Path::new(hardware::EFI_VARS_PATH).exists()
    }

    fn http_head(&self, url: &str) -> bool {
        self.runner.probe(
            "curl",
            &["--head", "--silent", "--fail", "--max-time", "5", "--output", "/dev/null", url],
        )
    }

    fn icmp_echo(&self, host: &str) -> bool {
        self.runner.probe("ping", &["-c", "1", "-W", "3", host])
    }

    /// Falls back to an empty list if `lsblk` is unavailable.
    fn list_disks(&self) -> Vec<Disk> {
        self.runner
            .run_capture("lsblk", lsblk::LSBLK_ARGS)
            .map(|out| lsblk::parse_disks(&out))
            .unwrap_or_default()
    }

    fn describe_disk(&self, path: &str) -> Option<Disk> {
        let mut args = lsblk::LSBLK_ARGS.to_vec();
        args.push(path);
        let out = self.runner.run_capture("lsblk", &args).ok()?;
        lsblk::parse_disks(&out).into_iter().next()
    }

    fn is_block_device(&self, path: &str) -> bool {
        use std::os::unix::fs::FileTypeExt;
        fs::metadata(path)
            .map(|m| m.file_type().is_block_device())
            .unwrap_or(false)
    }

    fn mount_table(&self) -> String {
        fs::read_to_string("/proc/self/mounts").unwrap_or_default()
    }

    fn total_memory_mib(&self) -> Result<u64, InstallerError> {
        let meminfo = fs::read_to_string("/proc/meminfo")?;
        hardware::parse_mem_total_mib(&meminfo)
            .ok_or_else(|| InstallerError::precondition("could not read MemTotal from /proc/meminfo"))
    }

    fn cpu_vendor(&self) -> CpuVendor {
        fs::read_to_string("/proc/cpuinfo")
            .map(|s| hardware::parse_cpu_vendor(&s))
            .unwrap_or_default()
    }

    fn timezone_exists(&self, tz: &str) -> bool {
        !tz.contains("..") && Path::new("/usr/share/zoneinfo").join(tz).is_file()
    }

    fn locale_supported(&self, locale: &str) -> bool {
        fs::read_to_string("/usr/share/i18n/SUPPORTED")
            .map(|s| s.lines().any(|l| l.split_whitespace().next() == Some(locale)))
            .unwrap_or(false)
    }

    fn partition_exists(&self, path: &str) -> bool {
        self.is_dry_run() || self.is_block_device(path)
    }

    fn wipe_disk(&self, disk: &str) -> Result<(), InstallerError> {
        self.runner.run_with_spinner(
            "wipefs",
            &["--all", "--force", disk],
            &format!("Clearing signatures on {disk}…"),
            &format!("Signatures cleared on {disk}."),
        )?;
        self.runner.run_with_spinner(
            "sgdisk",
            &["--zap-all", disk],
            &format!("Destroying partition table on {disk}…"),
            &format!("{disk} wiped."),
        )
    }

    fn create_partitions(&self, plan: &PartitionPlan) -> Result<(), InstallerError> {
        let mut args: Vec<String> = Vec::new();
        for p in plan.partitions() {
            let end = match p.size_mib {
                Some(mib) => format!("+{mib}M"),
                None => "0".to_string(),
            };
            args.push(format!("--new={}:0:{}", p.index, end));
            args.push(format!("--typecode={}:{}", p.index, p.role.type_code()));
            args.push(format!("--change-name={}:{}", p.index, p.role.label()));
        }
        args.push(plan.disk.clone());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        self.runner.run_with_spinner(
            "sgdisk",
            &args,
            &format!("Writing GPT partition table to {}…", plan.disk),
            &format!("Partition table written to {}.", plan.disk),
        )
    }

    fn settle(&self, disk: &str) {
        self.runner.run_best_effort("partprobe", &[disk]);
        self.runner.run_best_effort("udevadm", &["settle"]);
    }

    fn format_efi(&self, device: &str) -> Result<(), InstallerError> {
        self.runner.run_with_spinner(
            "mkfs.fat",
            &["-F", "32", "-n", "EFI", device],
            &format!("Formatting {device} as FAT32…"),
            &format!("{device} formatted as FAT32 (EFI)."),
        )
    }

    fn format_swap(&self, device: &str) -> Result<(), InstallerError> {
        self.runner.run_with_spinner(
            "mkswap",
            &[device],
            &format!("Initialising swap on {device}…"),
            &format!("{device} initialised as swap."),
        )
    }

    fn format_root(&self, device: &str, fs: Filesystem) -> Result<(), InstallerError> {
        let (program, args): (&str, Vec<&str>) = match fs {
            Filesystem::Ext4 => ("mkfs.ext4", vec!["-F", "-L", "arch", device]),
            Filesystem::Btrfs => ("mkfs.btrfs", vec!["-f", "-L", "arch", device]),
            Filesystem::Xfs => ("mkfs.xfs", vec!["-f", "-L", "arch", device]),
        };
        self.runner.run_with_spinner(
            program,
            &args,
            &format!("Formatting {device} as {fs}…"),
            &format!("{device} formatted as {fs} (root)."),
        )
    }

    fn create_subvolume(&self, path: &Path) -> Result<(), InstallerError> {
        let p = path.to_string_lossy();
        self.runner.run_with_spinner(
            "btrfs",
            &["subvolume", "create", p.as_ref()],
            &format!("Creating subvolume {p}…"),
            &format!("Subvolume {p} created."),
        )
    }

    fn create_dir(&self, path: &Path) -> Result<(), InstallerError> {
        if self.is_dry_run() {
            tracing::info!(path = %path.display(), "dry-run: mkdir skipped");
            return Ok(());
        }
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn mount(
        &self,
        device: &str,
        target: &Path,
        options: Option<&str>,
    ) -> Result<(), InstallerError> {
        let t = target.to_string_lossy();
        let mut args = Vec::new();
        if let Some(o) = options {
            args.extend(["-o", o]);
        }
        args.extend([device, t.as_ref()]);
        self.runner.run_with_spinner(
            "mount",
            &args,
            &format!("Mounting {device} → {t}…"),
            &format!("{device} mounted at {t}."),
        )
    }

    fn unmount(&self, target: &Path) -> Result<(), InstallerError> {
        let t = target.to_string_lossy();
        self.runner.run_with_spinner(
            "umount",
            &[t.as_ref()],
            &format!("Unmounting {t}…"),
            &format!("{t} unmounted."),
        )
    }

    fn swap_on(&self, device: &str) -> Result<(), InstallerError> {
        self.runner.run_with_spinner(
            "swapon",
            &[device],
            &format!("Activating swap on {device}…"),
            &format!("Swap on {device} activated."),
        )
    }

    fn swap_off_all(&self) -> Result<(), InstallerError> {
        if self.runner.run_best_effort("swapoff", &["--all"]) {
            Ok(())
        } else {
            Err(InstallerError::CommandFailed("swapoff".into(), -1))
        }
    }

    fn pacstrap(&self, root: &Path, packages: &[&str]) -> Result<(), InstallerError> {
        let r = root.to_string_lossy();
        let mut args = vec!["-K", r.as_ref()];
        args.extend_from_slice(packages);
        // pacstrap shows download progress; keep it interactive.
        self.runner.run_interactive("pacstrap", &args)
    }

    fn generate_fstab(&self, root: &Path) -> Result<(), InstallerError> {
        let r = root.to_string_lossy();
        let fstab = if self.is_dry_run() {
            String::new()
        } else {
            self.runner.run_capture("genfstab", &["-U", r.as_ref()])?
        };
        self.append_file(&root.join("etc/fstab"), &fstab)
    }

    fn chroot(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
    ) -> Result<(), InstallerError> {
        let r = root.to_string_lossy();
        let mut full = vec![r.as_ref(), program];
        full.extend_from_slice(args);
        self.runner.run_with_input(
            "arch-chroot",
            &full,
            stdin,
            &format!("Running {program} in the new system…"),
            &format!("{program} finished."),
        )
    }

    fn chroot_capture(
        &self,
        root: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<String, InstallerError> {
        if self.is_dry_run() {
            return Ok(String::new());
        }
        let r = root.to_string_lossy();
        let mut full = vec![r.as_ref(), program];
        full.extend_from_slice(args);
        self.runner.run_capture("arch-chroot", &full)
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<(), InstallerError> {
        if self.is_dry_run() {
            tracing::info!(path = %path.display(), bytes = contents.len(), "dry-run: write skipped");
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        tracing::debug!(path = %path.display(), "file written");
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String, InstallerError> {
        if self.is_dry_run() && !path.exists() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(path)?)
    }

    fn chroot_shell(&self, root: &Path) -> Result<(), InstallerError> {
        // arch-chroot is fully interactive: hand over the terminal.
        let r = root.to_string_lossy();
        self.runner.run_interactive("arch-chroot", &[r.as_ref()])
    }

    fn reboot(&self) -> Result<(), InstallerError> {
        self.runner.run_interactive("systemctl", &["reboot"])
    }
}

impl HostOps {
    fn append_file(&self, path: &Path, contents: &str) -> Result<(), InstallerError> {
        use std::io::Write;

        if self.is_dry_run() {
            tracing::info!(path = %path.display(), "dry-run: append skipped");
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().append(true).create(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}
