//! `--self-test`: runs the validators against known samples and prints each
//! verdict. No disk is read or written.

use crate::{
    error::ValidationRejection,
    plan::{is_known_virtual_disk, part_path},
    ui,
    validate::{
        validate_hostname, validate_mount_options, validate_mount_point, validate_subvolume_name,
        validate_username,
    },
};

type Validator = fn(&str) -> Result<(), ValidationRejection>;

/// (validator name, validator, input, expected to be accepted)
const CASES: &[(&str, Validator, &str, bool)] = &[
    ("username", validate_username, "alice", true),
    ("username", validate_username, "user-name", true),
    ("username", validate_username, "user-", true),
    ("username", validate_username, "_svc", true),
    ("username", validate_username, "-user", false),
    ("username", validate_username, "User1", false),
    ("username", validate_username, "1user", false),
    ("username", validate_username, "al ice", false),
    ("username", validate_username, "a;b", false),
    ("username", validate_username, "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", false),
    ("hostname", validate_hostname, "archbox", true),
    ("hostname", validate_hostname, "a", true),
    ("hostname", validate_hostname, "-arch", false),
    ("hostname", validate_hostname, "arch-", false),
    ("hostname", validate_hostname, "arch.local", false),
    ("hostname", validate_hostname, "arch_box", false),
    ("mount point", validate_mount_point, "/", true),
    ("mount point", validate_mount_point, "/home", true),
    ("mount point", validate_mount_point, "/var/log", true),
    ("mount point", validate_mount_point, "/dev/foo", false),
    ("mount point", validate_mount_point, "/proc", false),
    ("mount point", validate_mount_point, "relative", false),
    ("mount point", validate_mount_point, "/my home", false),
    ("subvolume", validate_subvolume_name, "@", true),
    ("subvolume", validate_subvolume_name, "@home", true),
    ("subvolume", validate_subvolume_name, "home", false),
    ("subvolume", validate_subvolume_name, "@ho@me", false),
    ("subvolume", validate_subvolume_name, "@home/sub", false),
];

const MOUNT_OPTION_SAMPLES: &[&str] = &[
    "noatime,compress=zstd,discard=async,space_cache=v2",
    "noatime,frobnicate",
    "noatime,$(reboot)",
];

const NAMING_SAMPLES: &[(&str, u32, &str)] = &[
    ("/dev/sda", 2, "/dev/sda2"),
    ("/dev/nvme0n1", 1, "/dev/nvme0n1p1"),
    ("/dev/mmcblk0", 3, "/dev/mmcblk0p3"),
];

const VIRTUAL_SAMPLES: &[(&str, bool)] = &[
    ("QEMU HARDDISK", true),
    ("VBOX HARDDISK", true),
    ("Samsung SSD 870", false),
];

fn verdict(accepted: bool) -> &'static str {
    if accepted {
        "accept"
    } else {
        "reject"
    }
}

fn report(ok: bool, line: &str) -> usize {
    if ok {
        ui::print_success(line);
        0
    } else {
        ui::print_error(line);
        1
    }
}

/// Prints every verdict and returns the number of unexpected ones.
pub fn run() -> usize {
    let mut mismatches = 0;

    for &(name, validator, input, expected) in CASES {
        let result = validator(input);
        let accepted = result.is_ok();
        let mut line = format!("{name:<12} {input:?} → {}", verdict(accepted));
        if let Err(rejection) = result {
            line.push_str(&format!(" ({})", rejection.reason));
        }
        mismatches += report(accepted == expected, &line);
    }

    for input in MOUNT_OPTION_SAMPLES {
        let r = validate_mount_options(input);
        ui::print_info(&format!("mount opts   {input:?} → {}", verdict(r.accepted)));
        for warning in &r.warnings {
            ui::print_warning(warning);
        }
    }

    for &(disk, index, expected) in NAMING_SAMPLES {
        let got = part_path(disk, index);
        mismatches += report(got == expected, &format!("partition    {disk} #{index} → {got}"));
    }

    for &(model, expected) in VIRTUAL_SAMPLES {
        let got = is_known_virtual_disk(model);
        mismatches += report(got == expected, &format!("virtual disk {model:?} → {got}"));
    }

    tracing::info!(mismatches, "self-test finished");
    mismatches
}
