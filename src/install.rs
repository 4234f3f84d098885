//! The installation state machine.
//!
//! Steps run in a fixed order and each must succeed before the next starts.
//! Every question is asked before the confirmation gate; after it the
//! configuration is only read. From the gate on, a `CleanupGuard` makes sure
//! the target is unmounted and swap is off on every way out.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use strum::{Display, EnumCount, EnumIter};

use crate::{
    cleanup::{CleanupGuard, CleanupPlan},
    config::InstallationConfig,
    error::InstallerError,
    lsblk::Disk,
    ops::SystemOps,
    plan::{PartitionPlan, RetryPolicy},
    prompt::Prompter,
    steps::{self, preflight::NetworkPolicy},
    ui,
};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Called from the signal handler. The running step finishes; the next one
/// does not start.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

fn interrupt_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumCount)]
pub enum Step {
    #[strum(to_string = "Precondition checks")]
    Preconditions,
    #[strum(to_string = "Disk selection")]
    DiskSelection,
    #[strum(to_string = "Installation settings")]
    Settings,
    #[strum(to_string = "Disk wipe")]
    WipeDisk,
    #[strum(to_string = "Partitioning")]
    Partitioning,
    #[strum(to_string = "Filesystems and mounts")]
    Filesystems,
    #[strum(to_string = "Package selection")]
    PackageSelection,
    #[strum(to_string = "Base system installation")]
    BaseInstall,
    #[strum(to_string = "Initramfs configuration")]
    Initramfs,
    #[strum(to_string = "Network service")]
    NetworkService,
    #[strum(to_string = "Locale, hostname and timezone")]
    SystemIdentity,
    #[strum(to_string = "Shell and sudo configuration")]
    ShellAndSudo,
    #[strum(to_string = "User account")]
    UserAccount,
    #[strum(to_string = "Bootloader installation")]
    Bootloader,
    #[strum(to_string = "Completion")]
    Completion,
}

impl Step {
    /// 1-based position in the run.
    pub fn number(self) -> usize {
        self as usize + 1
    }
}

/// Display-only progress; never consulted for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressState {
    pub current: usize,
    pub total: usize,
}

impl ProgressState {
    pub fn at(step: Step) -> Self {
        Self {
            current: step.number(),
            total: Step::COUNT,
        }
    }

    pub fn percent(self) -> usize {
        if self.total == 0 {
            return 0;
        }
        self.current * 100 / self.total
    }
}

/// Run-wide switches from the command line.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub allow_bios: bool,
    pub network_policy: NetworkPolicy,
    pub mount_root: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            allow_bios: false,
            network_policy: NetworkPolicy::default(),
            mount_root: PathBuf::from("/mnt"),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub enum InstallOutcome {
    Completed(Box<InstallationConfig>),
    /// The user declined the confirmation gate. Nothing was written.
    Aborted,
}

pub struct Installer<'a> {
    prompter: &'a mut dyn Prompter,
    ops: &'a dyn SystemOps,
    options: InstallOptions,
    current: Option<Step>,
}

impl<'a> Installer<'a> {
    pub fn new(prompter: &'a mut dyn Prompter, ops: &'a dyn SystemOps, options: InstallOptions) -> Self {
        Self {
            prompter,
            ops,
            options,
            current: None,
        }
    }

    /// Runs every step. A declined confirmation is `Ok(Aborted)`; every other
    /// failure comes back wrapped with the step it happened in.
    pub fn run(&mut self) -> Result<InstallOutcome, InstallerError> {
        match self.run_steps() {
            Ok(config) => Ok(InstallOutcome::Completed(Box::new(config))),
            Err(InstallerError::Cancelled) => {
                tracing::info!(step = ?self.current, "installation aborted by user");
                ui::print_warning("Installation aborted. Nothing was written to disk.");
                Ok(InstallOutcome::Aborted)
            }
            Err(e) => {
                tracing::error!(step = ?self.current, error = %e, "installation failed");
                Err(e)
            }
        }
    }

    fn begin(&mut self, step: Step) -> Result<(), InstallerError> {
        if interrupt_requested() {
            tracing::warn!(%step, "interrupt received, not starting step");
            return Err(InstallerError::Interrupted);
        }
        self.current = Some(step);
        tracing::info!(step = %step, number = step.number(), "step started");
        ui::print_step(ProgressState::at(step), &step.to_string());
        Ok(())
    }

    fn run_steps(&mut self) -> Result<InstallationConfig, InstallerError> {
        let ops = self.ops;
        let mount_root = self.options.mount_root.clone();

        // ── Before the gate: read-only probes and questions ──────────────────
        self.begin(Step::Preconditions)?;
        steps::preflight::run(ops, self.options.allow_bios, self.options.network_policy)
            .map_err(|e| e.in_step(Step::Preconditions))?;

        self.begin(Step::DiskSelection)?;
        let disk: Disk = steps::disk::select(&mut *self.prompter, ops)
            .map_err(|e| e.in_step(Step::DiskSelection))?;

        self.begin(Step::Settings)?;
        let mut config = InstallationConfig::new();
        config.set_disk(&disk.path);
        steps::settings::run(&mut *self.prompter, ops, &mut config, &disk)
            .map_err(|e| e.in_step(Step::Settings))?;

        // ── The gate ─────────────────────────────────────────────────────────
        self.begin(Step::WipeDisk)?;
        steps::disk::confirm_wipe(&mut *self.prompter, &disk).map_err(|e| e.in_step(Step::WipeDisk))?;

        let config = config;
        let plan = PartitionPlan::new(config.require_disk()?, config.efi_mib, config.swap_mib);
        let mut guard = CleanupGuard::new(ops, CleanupPlan::for_config(&config, &mount_root));

        steps::disk::wipe(ops, &plan.disk).map_err(|e| e.in_step(Step::WipeDisk))?;

        // ── Destructive phase ────────────────────────────────────────────────
        self.begin(Step::Partitioning)?;
        steps::partition::run(ops, &plan, self.options.retry)
            .map_err(|e| e.in_step(Step::Partitioning))?;

        self.begin(Step::Filesystems)?;
        steps::format::run(ops, &config, &plan, &mount_root)
            .and_then(|()| steps::mount::run(ops, &config, &plan, &mount_root))
            .map_err(|e| e.in_step(Step::Filesystems))?;

        self.begin(Step::PackageSelection)?;
        let packages = steps::packages::resolve(&config).map_err(|e| e.in_step(Step::PackageSelection))?;
        steps::packages::show(&packages);

        self.begin(Step::BaseInstall)?;
        steps::packages::install(ops, &mount_root, &packages)
            .and_then(|()| steps::fstab::generate(ops, &mount_root))
            .map_err(|e| e.in_step(Step::BaseInstall))?;

        self.begin(Step::Initramfs)?;
        steps::system::initramfs(ops, &mount_root).map_err(|e| e.in_step(Step::Initramfs))?;

        self.begin(Step::NetworkService)?;
        steps::system::network_service(ops, &mount_root)
            .map_err(|e| e.in_step(Step::NetworkService))?;

        self.begin(Step::SystemIdentity)?;
        steps::system::identity(ops, &config, &mount_root)
            .map_err(|e| e.in_step(Step::SystemIdentity))?;

        self.begin(Step::ShellAndSudo)?;
        steps::system::shell_and_sudo(ops, &config, &mount_root)
            .map_err(|e| e.in_step(Step::ShellAndSudo))?;

        self.begin(Step::UserAccount)?;
        steps::user::create(ops, &config, &mount_root).map_err(|e| e.in_step(Step::UserAccount))?;

        self.begin(Step::Bootloader)?;
        steps::bootloader::install(ops, &config, &plan, &mount_root)
            .map_err(|e| e.in_step(Step::Bootloader))?;

        self.begin(Step::Completion)?;
        steps::chroot::offer_shell(&mut *self.prompter, ops, &config, &mount_root)
            .map_err(|e| e.in_step(Step::Completion))?;
        if let Some(report) = guard.finish() {
            if report.failures.is_empty() {
                ui::print_success(&format!("{} unmounted, swap disabled.", mount_root.display()));
            }
        }
        steps::chroot::offer_reboot(&mut *self.prompter, ops).map_err(|e| e.in_step(Step::Completion))?;

        tracing::info!(?config, "installation finished");
        Ok(config)
    }
}
