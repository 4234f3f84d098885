use std::fmt;

use strum::{Display, EnumIter};

use crate::{
    error::{InstallerError, ValidationRejection},
    subvolume::{SubvolumeLayout, DEFAULT_BTRFS_OPTIONS},
    validate,
};

/// Fixed size of the EFI system partition.
pub const EFI_SIZE_MIB: u64 = 512;

/// Holds every user decision collected before the disk is touched.
///
/// Identity fields are only reachable through validating setters, so a step
/// that reads them never sees a value the validators did not accept. Once the
/// confirmation gate passes, the orchestrator only hands out `&InstallationConfig`.
#[derive(Clone, Default)]
pub struct InstallationConfig {
    disk: Option<String>,
    filesystem: Option<Filesystem>,
    hostname: Option<String>,
    username: Option<String>,
    user_password: Option<String>,
    root_password: Option<String>,
    timezone: Option<String>,
    locale: Option<String>,
    pub shell: Shell,
    pub sudo: bool,
    pub bootloader: Bootloader,
    pub kernel: KernelVariant,
    pub cpu_vendor: CpuVendor,
    pub microcode: bool,
    pub multilib: bool,
    pub install_type: InstallType,
    pub extras: Vec<Extra>,
    pub swap_mib: u64,
    pub efi_mib: u64,
    pub subvolumes: Option<SubvolumeLayout>,
    pub mount_options: String,
}

impl InstallationConfig {
    pub fn new() -> Self {
        Self {
            efi_mib: EFI_SIZE_MIB,
            ..Self::default()
        }
    }

    // ── Validating setters ────────────────────────────────────────────────────

    /// Records the target disk. The caller must have run `validate_disk` on it.
    pub fn set_disk(&mut self, path: &str) {
        self.disk = Some(path.to_string());
    }

    /// Selecting btrfs seeds the default subvolume layout and mount options.
    pub fn set_filesystem(&mut self, fs: Filesystem) {
        self.filesystem = Some(fs);
        if fs.uses_subvolumes() {
            if self.subvolumes.is_none() {
                self.subvolumes = Some(SubvolumeLayout::default());
                self.mount_options = DEFAULT_BTRFS_OPTIONS.to_string();
            }
        } else {
            self.subvolumes = None;
            self.mount_options.clear();
        }
    }

    pub fn set_hostname(&mut self, hostname: &str) -> Result<(), ValidationRejection> {
        validate::validate_hostname(hostname)?;
        self.hostname = Some(hostname.to_string());
        Ok(())
    }

    pub fn set_username(&mut self, username: &str) -> Result<(), ValidationRejection> {
        validate::validate_username(username)?;
        self.username = Some(username.to_string());
        Ok(())
    }

    /// Forgets the account so the step that creates it does nothing.
    pub fn clear_user(&mut self) {
        self.username = None;
        self.user_password = None;
        self.shell = Shell::default();
        self.sudo = false;
    }

    pub fn set_user_password(&mut self, password: &str) -> Result<(), ValidationRejection> {
        validate_password(password)?;
        self.user_password = Some(password.to_string());
        Ok(())
    }

    pub fn set_root_password(&mut self, password: &str) -> Result<(), ValidationRejection> {
        validate_password(password)?;
        self.root_password = Some(password.to_string());
        Ok(())
    }

    /// Records a timezone already confirmed to exist in the zoneinfo database.
    pub fn set_timezone(&mut self, tz: &str) {
        self.timezone = Some(tz.to_string());
    }

    /// Records a locale already confirmed to be supported.
    pub fn set_locale(&mut self, locale: &str) {
        self.locale = Some(locale.to_string());
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn disk(&self) -> Option<&str> {
        self.disk.as_deref()
    }

    pub fn filesystem(&self) -> Option<Filesystem> {
        self.filesystem
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    pub fn has_user(&self) -> bool {
        self.username.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn require_disk(&self) -> Result<&str, InstallerError> {
        self.disk().ok_or(InstallerError::Incomplete("disk"))
    }

    pub fn require_filesystem(&self) -> Result<Filesystem, InstallerError> {
        self.filesystem.ok_or(InstallerError::Incomplete("filesystem"))
    }

    pub fn require_hostname(&self) -> Result<&str, InstallerError> {
        self.hostname().ok_or(InstallerError::Incomplete("hostname"))
    }

    pub fn require_username(&self) -> Result<&str, InstallerError> {
        self.username().ok_or(InstallerError::Incomplete("username"))
    }

    pub fn require_user_password(&self) -> Result<&str, InstallerError> {
        self.user_password
            .as_deref()
            .ok_or(InstallerError::Incomplete("user password"))
    }

    pub fn require_root_password(&self) -> Result<&str, InstallerError> {
        self.root_password
            .as_deref()
            .ok_or(InstallerError::Incomplete("root password"))
    }

    pub fn require_timezone(&self) -> Result<&str, InstallerError> {
        self.timezone().ok_or(InstallerError::Incomplete("timezone"))
    }

    pub fn require_locale(&self) -> Result<&str, InstallerError> {
        self.locale().ok_or(InstallerError::Incomplete("locale"))
    }

    /// Microcode package to install, if any.
    pub fn microcode_package(&self) -> Option<&'static str> {
        if self.microcode {
            self.cpu_vendor.microcode_package()
        } else {
            None
        }
    }
}

impl fmt::Debug for InstallationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |p: &Option<String>| p.as_ref().map(|_| "<redacted>");
        f.debug_struct("InstallationConfig")
            .field("disk", &self.disk)
            .field("filesystem", &self.filesystem)
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("user_password", &redact(&self.user_password))
            .field("root_password", &redact(&self.root_password))
            .field("timezone", &self.timezone)
            .field("locale", &self.locale)
            .field("shell", &self.shell)
            .field("sudo", &self.sudo)
            .field("bootloader", &self.bootloader)
            .field("kernel", &self.kernel)
            .field("cpu_vendor", &self.cpu_vendor)
            .field("microcode", &self.microcode)
            .field("multilib", &self.multilib)
            .field("install_type", &self.install_type)
            .field("extras", &self.extras)
            .field("swap_mib", &self.swap_mib)
            .field("efi_mib", &self.efi_mib)
            .field("subvolumes", &self.subvolumes)
            .field("mount_options", &self.mount_options)
            .finish()
    }
}

pub const PASSWORD_MIN_LEN: usize = 6;

fn validate_password(password: &str) -> Result<(), ValidationRejection> {
    // The value is never echoed back in the rejection.
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ValidationRejection::new(
            "password",
            "",
            "must be at least 6 characters long",
        ));
    }
    if password.contains('\n') {
        return Err(ValidationRejection::new(
            "password",
            "",
            "must not contain line breaks",
        ));
    }
    Ok(())
}

// ── Choices ───────────────────────────────────────────────────────────────────

/// Root filesystem. Btrfs is the copy-on-write layout with subvolumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Filesystem {
    Ext4,
    Btrfs,
    Xfs,
}

impl Filesystem {
    pub fn uses_subvolumes(self) -> bool {
        matches!(self, Filesystem::Btrfs)
    }

    /// Package holding the userspace tools for this filesystem.
    pub fn tools_package(self) -> &'static str {
        match self {
            Filesystem::Ext4 => "e2fsprogs",
            Filesystem::Btrfs => "btrfs-progs",
            Filesystem::Xfs => "xfsprogs",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Filesystem::Ext4 => "ext4 (classic, journaled)",
            Filesystem::Btrfs => "btrfs (copy-on-write, subvolumes)",
            Filesystem::Xfs => "xfs (high-performance, journaled)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Shell {
    #[default]
    Bash,
    Zsh,
    Fish,
}

impl Shell {
    pub fn path(self) -> &'static str {
        match self {
            Shell::Bash => "/bin/bash",
            Shell::Zsh => "/usr/bin/zsh",
            Shell::Fish => "/usr/bin/fish",
        }
    }

    /// Extra package needed for this shell; bash ships with `base`.
    pub fn package(self) -> Option<&'static str> {
        match self {
            Shell::Bash => None,
            Shell::Zsh => Some("zsh"),
            Shell::Fish => Some("fish"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter)]
pub enum Bootloader {
    #[default]
    #[strum(serialize = "systemd-boot")]
    SystemdBoot,
    #[strum(serialize = "grub")]
    Grub,
    #[strum(serialize = "refind")]
    Refind,
}

impl Bootloader {
    pub fn packages(self) -> &'static [&'static str] {
        match self {
            Bootloader::SystemdBoot => &[],
            Bootloader::Grub => &["grub", "efibootmgr"],
            Bootloader::Refind => &["refind"],
        }
    }
}

/// Which Linux kernel variant to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum KernelVariant {
    #[default]
    Stable,
    Lts,
    Zen,
}

impl KernelVariant {
    /// The `pacstrap` package name for this variant.
    pub fn package_name(self) -> &'static str {
        match self {
            KernelVariant::Stable => "linux",
            KernelVariant::Lts => "linux-lts",
            KernelVariant::Zen => "linux-zen",
        }
    }

    /// Human-readable label shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            KernelVariant::Stable => "Linux stable",
            KernelVariant::Lts => "Linux LTS (long-term support)",
            KernelVariant::Zen => "Linux Zen (performance-optimized)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum CpuVendor {
    Intel,
    Amd,
    #[default]
    Unknown,
}

impl CpuVendor {
    pub fn microcode_package(self) -> Option<&'static str> {
        match self {
            CpuVendor::Intel => Some("intel-ucode"),
            CpuVendor::Amd => Some("amd-ucode"),
            CpuVendor::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
pub enum InstallType {
    /// Required packages only.
    #[default]
    Minimal,
    /// Required packages plus the selected extras.
    Custom,
}

/// Optional features offered by a custom installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Extra {
    #[strum(serialize = "base-devel")]
    BaseDevel,
    #[strum(serialize = "zram")]
    Zram,
    #[strum(serialize = "vim")]
    Vim,
    #[strum(serialize = "git")]
    Git,
}

impl Extra {
    pub fn package_name(self) -> &'static str {
        match self {
            Extra::BaseDevel => "base-devel",
            Extra::Zram => "zram-generator",
            Extra::Vim => "vim",
            Extra::Git => "git",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Extra::BaseDevel => "build tools (gcc, make, …)",
            Extra::Zram => "compressed swap in RAM",
            Extra::Vim => "text editor",
            Extra::Git => "version control",
        }
    }
}
