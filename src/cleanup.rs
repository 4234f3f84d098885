//! Best-effort unwind after the disk has been touched.
//!
//! Unmounts everything the installer mounted and turns swap off. Every step
//! swallows its own failure, so running it twice, or on a machine where
//! nothing is mounted, is harmless.

use std::path::{Path, PathBuf};

use crate::{
    config::InstallationConfig,
    ops::SystemOps,
    plan::target_path,
    ui,
};

/// Boot partition mount point relative to the installation root.
pub const EFI_MOUNT_POINT: &str = "/boot";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub efi_mount: PathBuf,
    /// Subvolume mount points other than root; empty unless btrfs.
    pub secondary: Vec<PathBuf>,
    pub root_mount: PathBuf,
}

impl CleanupPlan {
    pub fn for_config(config: &InstallationConfig, mount_root: &Path) -> Self {
        let secondary = match (&config.subvolumes, config.filesystem()) {
            (Some(layout), Some(fs)) if fs.uses_subvolumes() => layout
                .secondary_mounts()
                .into_iter()
                .map(|(_, sv)| target_path(mount_root, &sv.mount_point))
                .collect(),
            _ => Vec::new(),
        };
        Self {
            efi_mount: target_path(mount_root, EFI_MOUNT_POINT),
            secondary,
            root_mount: mount_root.to_path_buf(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub unmounted: Vec<PathBuf>,
    pub failures: Vec<String>,
    pub swap_disabled: bool,
}

/// EFI first, then subvolumes deepest-first, then root, then all swap.
pub fn run_cleanup(ops: &dyn SystemOps, plan: &CleanupPlan) -> CleanupReport {
    tracing::info!(root = %plan.root_mount.display(), "running cleanup");
    let mut report = CleanupReport::default();

    let mut secondary = plan.secondary.clone();
    secondary.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

    let targets = std::iter::once(&plan.efi_mount)
        .chain(secondary.iter())
        .chain(std::iter::once(&plan.root_mount));

    for target in targets {
        if !ops.is_mounted(target) {
            continue;
        }
        match ops.unmount(target) {
            Ok(()) => report.unmounted.push(target.clone()),
            Err(e) => {
                tracing::warn!(target = %target.display(), error = %e, "unmount failed during cleanup");
                report.failures.push(format!("{}: {e}", target.display()));
            }
        }
    }

    match ops.swap_off_all() {
        Ok(()) => report.swap_disabled = true,
        Err(e) => {
            tracing::warn!(error = %e, "swapoff failed during cleanup");
            report.failures.push(format!("swapoff: {e}"));
        }
    }

    if report.failures.is_empty() {
        tracing::info!(unmounted = report.unmounted.len(), "cleanup finished");
    }
    report
}

/// Runs the cleanup exactly once: either through `finish`, or when dropped
/// on an error path or during unwinding.
pub struct CleanupGuard<'a> {
    ops: &'a dyn SystemOps,
    plan: CleanupPlan,
    done: bool,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(ops: &'a dyn SystemOps, plan: CleanupPlan) -> Self {
        Self {
            ops,
            plan,
            done: false,
        }
    }

    /// Runs the cleanup now. Later calls, and the drop, do nothing.
    pub fn finish(&mut self) -> Option<CleanupReport> {
        if self.done {
            return None;
        }
        self.done = true;

        let report = run_cleanup(self.ops, &self.plan);
        for failure in &report.failures {
            ui::print_warning(&format!("Cleanup: {failure}"));
        }
        Some(report)
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            ui::print_warning("Unmounting the target and disabling swap…");
            self.finish();
        }
    }
}
