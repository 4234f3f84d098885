//! Grammars for every user-supplied value.
//!
//! Each validator takes one string and either accepts it or hands back a
//! `ValidationRejection` describing why. None of them log, panic or touch
//! global state. `validate_disk` is the one exception that reads the system,
//! and it does so through `validate_disk_with` so the decision stays pure.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationRejection;

pub const USERNAME_MAX_LEN: usize = 32;

/// Top-level paths that must never become a mount point of the new system.
pub const RESERVED_MOUNT_PREFIXES: &[&str] = &["/dev", "/proc", "/sys", "/run", "/tmp"];

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*$").unwrap());

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap()
});

static MOUNT_POINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9._-]+(/[A-Za-z0-9._-]+)*)$").unwrap());

static SUBVOLUME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^@[A-Za-z0-9._-]*$").unwrap());

static OPTION_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:/+-]+(=[A-Za-z0-9_.:/+-]+)?$").unwrap());

static PARTITION_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^p?[0-9]+$").unwrap());

// ── Identity ──────────────────────────────────────────────────────────────────

pub fn validate_username(s: &str) -> Result<(), ValidationRejection> {
    let reject = |reason: &str| Err(ValidationRejection::new("username", s, reason));

    if s.is_empty() {
        return reject("must not be empty");
    }
    if s.len() > USERNAME_MAX_LEN {
        return reject("must be at most 32 characters");
    }
    if !USERNAME_RE.is_match(s) {
        return reject(
            "must start with a lowercase letter or '_' and contain only a-z, 0-9, '_' and '-'",
        );
    }
    Ok(())
}

pub fn validate_hostname(s: &str) -> Result<(), ValidationRejection> {
    if s.is_empty() {
        return Err(ValidationRejection::new("hostname", s, "must not be empty"));
    }
    if s.len() > 63 {
        return Err(ValidationRejection::new(
            "hostname",
            s,
            "must be at most 63 characters",
        ));
    }
    if !HOSTNAME_RE.is_match(s) {
        return Err(ValidationRejection::new(
            "hostname",
            s,
            "letters, digits and inner hyphens only (no dots, underscores or spaces)",
        ));
    }
    Ok(())
}

// ── Layout ────────────────────────────────────────────────────────────────────

pub fn validate_mount_point(s: &str) -> Result<(), ValidationRejection> {
    if s == "/" {
        return Ok(());
    }
    if !MOUNT_POINT_RE.is_match(s) {
        return Err(ValidationRejection::new(
            "mount point",
            s,
            "must be an absolute path of letters, digits, '.', '_' and '-'",
        ));
    }
    if let Some(prefix) = reserved_prefix(s) {
        return Err(ValidationRejection::new(
            "mount point",
            s,
            format!("{prefix} is reserved for the running system"),
        ));
    }
    Ok(())
}

/// Returns the reserved prefix `path` lives under, matched per path component.
fn reserved_prefix(path: &str) -> Option<&'static str> {
    RESERVED_MOUNT_PREFIXES.iter().copied().find(|prefix| {
        path == *prefix
            || path
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

pub fn validate_subvolume_name(s: &str) -> Result<(), ValidationRejection> {
    if SUBVOLUME_RE.is_match(s) {
        Ok(())
    } else {
        Err(ValidationRejection::new(
            "subvolume name",
            s,
            "must start with a single '@' followed by letters, digits, '.', '_' or '-'",
        ))
    }
}

// ── Mount options ─────────────────────────────────────────────────────────────

const KNOWN_FLAGS: &[&str] = &[
    "defaults", "rw", "ro", "noatime", "relatime", "nodiratime", "lazytime", "ssd",
    "nossd", "ssd_spread", "discard", "nodiscard", "autodefrag", "noautodefrag",
    "compress", "space_cache", "nodatacow", "datacow", "nodatasum", "datasum",
    "barrier", "nobarrier",
];

/// Outcome of the permissive mount-option check.
///
/// The string as a whole is always accepted. Every token outside the
/// allow-list, including ones with characters no mount option uses, adds a
/// warning instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountOptionReport {
    pub accepted: bool,
    pub warnings: Vec<String>,
}

pub fn validate_mount_options(s: &str) -> MountOptionReport {
    let mut report = MountOptionReport {
        accepted: true,
        warnings: Vec::new(),
    };

    for token in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !OPTION_TOKEN_RE.is_match(token) {
            report
                .warnings
                .push(format!("'{token}' contains characters not allowed in a mount option"));
            continue;
        }
        if let Some(warning) = check_option_token(token) {
            report.warnings.push(warning);
        }
    }

    report
}

fn check_option_token(token: &str) -> Option<String> {
    let Some((key, value)) = token.split_once('=') else {
        return (!KNOWN_FLAGS.contains(&token)).then(|| format!("unknown mount option '{token}'"));
    };

    let known_value = match key {
        "compress" | "compress-force" => {
            let algo = value.split(':').next().unwrap_or("");
            ["zstd", "lzo", "zlib", "no", "none"].contains(&algo)
        }
        "space_cache" => ["v1", "v2"].contains(&value),
        "discard" => ["async", "sync"].contains(&value),
        "commit" => value.parse::<u32>().is_ok(),
        "subvol" => {
            return Some("'subvol=' is set per subvolume and should not appear here".into())
        }
        _ => return Some(format!("unknown mount option '{key}'")),
    };

    (!known_value).then(|| format!("unexpected value '{value}' for '{key}'"))
}

// ── Target disk ───────────────────────────────────────────────────────────────

/// Checks a target disk against the live system: it must be a block device
/// and neither it nor any of its partitions may be mounted.
pub fn validate_disk(path: &str) -> Result<(), ValidationRejection> {
    use std::os::unix::fs::FileTypeExt;

    let is_block = std::fs::metadata(path)
        .map(|m| m.file_type().is_block_device())
        .unwrap_or(false);
    let mounts = std::fs::read_to_string("/proc/self/mounts").unwrap_or_default();
    validate_disk_with(path, is_block, &mounts)
}

pub fn validate_disk_with(
    path: &str,
    is_block_device: bool,
    mount_table: &str,
) -> Result<(), ValidationRejection> {
    if !path.starts_with("/dev/") {
        return Err(ValidationRejection::new("disk", path, "must be a path under /dev"));
    }
    if !is_block_device {
        return Err(ValidationRejection::new("disk", path, "is not a block device"));
    }
    if let Some(source) = mounted_descendant(path, mount_table) {
        return Err(ValidationRejection::new(
            "disk",
            path,
            format!("{source} is currently mounted"),
        ));
    }
    Ok(())
}

/// First mount-table source that is `disk` itself or one of its partitions.
fn mounted_descendant<'a>(disk: &str, mount_table: &'a str) -> Option<&'a str> {
    mount_table
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .find(|source| {
            source
                .strip_prefix(disk)
                .is_some_and(|rest| rest.is_empty() || PARTITION_SUFFIX_RE.is_match(rest))
        })
}
