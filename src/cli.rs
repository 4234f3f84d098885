use clap::{builder::BoolishValueParser, Parser};
use std::path::PathBuf;

use crate::steps::preflight::NetworkPolicy;

pub const DEFAULT_LOG_FILE: &str = "/tmp/arch-installer.log";

/// Interactive Arch Linux installer
#[derive(Debug, Parser)]
#[command(name = "arch-installer")]
#[command(about = "Installs Arch Linux onto a disk, asking before anything is erased")]
#[command(version)]
pub struct Cli {
    /// Continue even if the machine did not boot in UEFI mode.
    #[arg(long, env = "ARCH_INSTALLER_ALLOW_BIOS", value_parser = BoolishValueParser::new())]
    pub allow_bios: bool,

    /// Run the input validators against built-in samples and exit.
    /// Touches no disk.
    #[arg(long)]
    pub self_test: bool,

    /// Dry-run mode: show what would be executed without making changes.
    ///
    /// Read-only probes (lsblk, mount table, memory) still run so the
    /// walkthrough is realistic.
    #[arg(long)]
    pub dry_run: bool,

    /// How many connectivity probe hosts must answer.
    #[arg(long, value_enum, default_value_t = NetworkPolicy::Quorum)]
    pub network_policy: NetworkPolicy,

    /// Append the run log to this file.
    #[arg(long, env = "ARCH_INSTALLER_LOG", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Where the new system is mounted while it is being installed.
    #[arg(long, default_value = "/mnt")]
    pub mount_root: PathBuf,

    /// Test harness mode: log to stdout and simulate every change.
    #[arg(long, env = "ARCH_INSTALLER_TESTING", hide = true, value_parser = BoolishValueParser::new())]
    pub testing: bool,
}

impl Cli {
    /// Dry run either on request or because the harness is driving us.
    pub fn simulate(&self) -> bool {
        self.dry_run || self.testing
    }
}
