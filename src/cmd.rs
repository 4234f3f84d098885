use std::{
    io::{self, Write},
    process::{Command, Stdio},
};

use crate::{error::InstallerError, ui};

// ── Internal helpers ──────────────────────────────────────────────────────────

fn not_found_or_io(program: &str, err: io::Error) -> InstallerError {
    if err.kind() == io::ErrorKind::NotFound {
        InstallerError::CommandNotFound(program.to_string())
    } else {
        InstallerError::Io(err)
    }
}

fn print_captured_output(program: &str, stdout: &[u8], stderr: &[u8]) {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    if !out.trim().is_empty() {
        tracing::error!(program, stdout = %out.trim(), "command output");
        eprintln!("{}", out.trim());
    }
    if !err.trim().is_empty() {
        tracing::error!(program, stderr = %err.trim(), "command error output");
        eprintln!("{}", err.trim());
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

fn failed(program: &str, code: Option<i32>) -> InstallerError {
    let code = code.unwrap_or(-1);
    tracing::error!(program, code, "command failed");
    InstallerError::CommandFailed(program.to_string(), code)
}

/// Maps a binary name to the Arch package that provides it.
pub fn package_for(program: &str) -> &str {
    match program {
        "mkfs.fat" | "mkfs.vfat" | "fsck.fat" | "fatlabel" => "dosfstools",
        "mkfs.ext4" | "e2fsck" | "resize2fs" | "tune2fs" => "e2fsprogs",
        "mkfs.btrfs" | "btrfs" => "btrfs-progs",
        "mkfs.xfs" | "xfs_repair" => "xfsprogs",
        "mkswap" | "swapon" | "swapoff" | "mount" | "umount" | "wipefs" | "lsblk"
        | "blkid" | "findmnt" => "util-linux",
        "sgdisk" => "gptfdisk",
        "pacstrap" | "genfstab" | "arch-chroot" => "arch-install-scripts",
        "partprobe" => "parted",
        "udevadm" => "systemd",
        "curl" => "curl",
        "ping" => "iputils",
        other => other,
    }
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Executes external programs.
///
/// With `dry_run` set, anything that changes the system is logged and
/// reported as successful without being run. Read-only calls
/// (`run_capture`, `probe`) always execute so dry runs see the real machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Runner {
    pub dry_run: bool,
}

impl Runner {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    fn simulated(&self, program: &str, args: &[&str]) -> bool {
        if self.dry_run {
            let line = command_line(program, args);
            tracing::info!(command = %line, "dry-run: skipped");
            ui::print_info(&format!("[dry-run] {line}"));
        }
        self.dry_run
    }

    /// Runs a command silently, discarding all output and ignoring any error.
    /// Use for cleanup operations where partial failure is acceptable (e.g. umount).
    pub fn run_best_effort(&self, program: &str, args: &[&str]) -> bool {
        if self.simulated(program, args) {
            return true;
        }
        tracing::debug!(command = %command_line(program, args), "running (best effort)");
        let ok = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        if !ok {
            tracing::warn!(command = %command_line(program, args), "best-effort command failed");
        }
        ok
    }

    /// Run a command that **takes over the terminal** (stdin/stdout/stderr inherited).
    /// Use for programs that stream their own progress: `pacstrap`, `arch-chroot`.
    pub fn run_interactive(&self, program: &str, args: &[&str]) -> Result<(), InstallerError> {
        if self.simulated(program, args) {
            return Ok(());
        }
        tracing::debug!(command = %command_line(program, args), "running (interactive)");
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| not_found_or_io(program, e))?;

        if !status.success() {
            return Err(failed(program, status.code()));
        }
        Ok(())
    }

    /// Run a command **silently** while displaying a spinner.
    /// On success prints `done_msg` with a ✓.
    /// On failure prints captured output and returns an error.
    pub fn run_with_spinner(
        &self,
        program: &str,
        args: &[&str],
        spin_msg: &str,
        done_msg: &str,
    ) -> Result<(), InstallerError> {
        self.run_with_input(program, args, None, spin_msg, done_msg)
    }

    /// Like `run_with_spinner`, feeding `stdin` to the child. The input is
    /// never logged, so it may carry secrets.
    pub fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        stdin: Option<&str>,
        spin_msg: &str,
        done_msg: &str,
    ) -> Result<(), InstallerError> {
        if self.simulated(program, args) {
            ui::print_success(done_msg);
            return Ok(());
        }
        tracing::debug!(command = %command_line(program, args), "running");

        let pb = ui::spinner(spin_msg);
        let result = spawn_and_wait(program, args, stdin);
        pb.finish_and_clear();

        match result {
            Err(e) => Err(e),
            Ok(output) if !output.status.success() => {
                print_captured_output(program, &output.stdout, &output.stderr);
                Err(failed(program, output.status.code()))
            }
            Ok(_) => {
                ui::print_success(done_msg);
                Ok(())
            }
        }
    }

    /// Run a command, capture its stdout, and return it as a `String`.
    pub fn run_capture(&self, program: &str, args: &[&str]) -> Result<String, InstallerError> {
        tracing::debug!(command = %command_line(program, args), "capturing");
        let output = Command::new(program)
            .args(args)
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| not_found_or_io(program, e))?;

        if !output.status.success() {
            print_captured_output(program, &[], &output.stderr);
            return Err(failed(program, output.status.code()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Runs a read-only check and reports whether it exited successfully.
    pub fn probe(&self, program: &str, args: &[&str]) -> bool {
        let ok = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        tracing::debug!(command = %command_line(program, args), ok, "probe");
        ok
    }

    /// True when `program` resolves in `PATH`.
    pub fn binary_exists(&self, program: &str) -> bool {
        self.probe("which", &[program])
    }
}

fn spawn_and_wait(
    program: &str,
    args: &[&str],
    stdin: Option<&str>,
) -> Result<std::process::Output, InstallerError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| not_found_or_io(program, e))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input.as_bytes())?;
        // Dropping the pipe closes stdin so the child sees EOF.
    }

    Ok(child.wait_with_output()?)
}
