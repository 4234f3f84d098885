use clap::Parser;

use arch_installer::{
    cli::Cli,
    cmd::Runner,
    error::InstallerError,
    install::{self, InstallOptions, InstallOutcome, Installer},
    logging,
    ops::HostOps,
    plan::RetryPolicy,
    prompt::DialoguerPrompter,
    selftest, ui,
};

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_file, cli.testing) {
        // Not fatal: the run still goes ahead, just without a log file.
        ui::print_warning(&format!("Cannot open log file {}: {e}", cli.log_file.display()));
    }

    if let Err(e) = ctrlc::set_handler(install::request_interrupt) {
        tracing::warn!(error = %e, "could not install signal handler");
    }

    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    if cli.self_test {
        ui::print_banner();
        return match selftest::run() {
            0 => 0,
            n => {
                ui::print_error(&format!("{n} self-test case(s) did not match."));
                1
            }
        };
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), dry_run = cli.simulate(), "installer starting");

    // ── Welcome ───────────────────────────────────────────────────────────────
    ui::print_banner();

    if cli.simulate() {
        ui::print_warning("DRY-RUN MODE: no disk will be touched, no command will change the system.");
    }

    ui::print_info("This wizard will guide you through a full Arch Linux installation.");
    ui::print_info("Nothing is written until you confirm the disk wipe.");

    let log_target = if cli.testing {
        "standard output".to_string()
    } else {
        cli.log_file.display().to_string()
    };
    let ops = HostOps::new(Runner::new(cli.simulate()));
    let mut prompter = DialoguerPrompter;
    let options = InstallOptions {
        allow_bios: cli.allow_bios,
        network_policy: cli.network_policy,
        mount_root: cli.mount_root,
        retry: RetryPolicy::default(),
    };

    match Installer::new(&mut prompter, &ops, options).run() {
        Ok(InstallOutcome::Completed(_)) => {
            tracing::info!("installer exiting after a completed installation");
            0
        }
        Ok(InstallOutcome::Aborted) => 0,
        Err(e) => report(&e, &log_target),
    }
}

fn report(e: &InstallerError, log_target: &str) -> i32 {
    let code = e.exit_code();
    tracing::error!(error = %e, code, "installer exiting with failure");
    println!();
    ui::print_error(&e.to_string());
    ui::print_info(&format!("Details are in {log_target}."));
    code
}
