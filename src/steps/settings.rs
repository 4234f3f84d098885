//! Every question about the new system, asked before the disk is touched.
//!
//! Order of prompts: filesystem, subvolumes (btrfs only), swap size, kernel,
//! microcode (known CPU vendor only), installation type, extras (custom only),
//! bootloader, timezone, locale, hostname, root password, whether to create a
//! user, then username, user password, shell and sudo (only with a user),
//! multilib.

use strum::IntoEnumIterator;

use crate::{
    config::{Bootloader, Extra, Filesystem, InstallType, InstallationConfig, KernelVariant, Shell},
    error::InstallerError,
    lsblk::Disk,
    ops::SystemOps,
    plan::{max_swap_mib, swap_size_mib, ROOT_MIN_MIB},
    prompt::{password_until_valid, prompt_until_valid, Prompter},
    subvolume, ui,
};

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_LOCALE: &str = "en_US.UTF-8";
pub const DEFAULT_HOSTNAME: &str = "archlinux";

pub fn run(
    prompter: &mut dyn Prompter,
    ops: &dyn SystemOps,
    config: &mut InstallationConfig,
    disk: &Disk,
) -> Result<(), InstallerError> {
    ask_storage(prompter, ops, config, disk)?;
    ask_packages(prompter, ops, config)?;
    ask_locale(prompter, ops, config)?;
    ask_accounts(prompter, config)?;
    print_summary(config);
    Ok(())
}

fn select_from<T: Copy>(
    prompter: &mut dyn Prompter,
    question: &str,
    choices: &[T],
    label: impl Fn(T) -> String,
    default: usize,
) -> Result<T, InstallerError> {
    let items: Vec<String> = choices.iter().map(|&c| label(c)).collect();
    let idx = prompter.select(question, &items, default)?;
    choices
        .get(idx)
        .copied()
        .ok_or_else(|| InstallerError::InputExhausted(question.to_string()))
}

// ── Storage ───────────────────────────────────────────────────────────────────

fn ask_storage(
    prompter: &mut dyn Prompter,
    ops: &dyn SystemOps,
    config: &mut InstallationConfig,
    disk: &Disk,
) -> Result<(), InstallerError> {
    let filesystems: Vec<Filesystem> = Filesystem::iter().collect();
    let fs = select_from(prompter, "Root filesystem", &filesystems, |f| f.display_name().to_string(), 0)?;
    config.set_filesystem(fs);
    tracing::info!(filesystem = %fs, "filesystem chosen");

    if fs.uses_subvolumes() {
        let mut layout = config.subvolumes.take().unwrap_or_default();
        subvolume::configure(prompter, &mut layout, &mut config.mount_options)?;
        config.subvolumes = Some(layout);
    }

    let ceiling = max_swap_mib(disk.size_bytes, config.efi_mib);
    if ceiling == 0 {
        return Err(InstallerError::precondition(format!(
            "{} is too small for a {} MiB EFI partition, swap and a {ROOT_MIN_MIB} MiB root",
            disk.path, config.efi_mib
        )));
    }

    let suggested = swap_size_mib(ops.total_memory_mib()?).clamp(1, ceiling);
    tracing::debug!(suggested, ceiling, disk = %disk.path, "swap bounds");
    config.swap_mib = prompt_until_valid(
        prompter,
        &format!("Swap size in MiB (at most {ceiling})"),
        Some(&suggested.to_string()),
        |s| match s.trim().parse::<u64>() {
            Ok(0) => Err("swap must be at least 1 MiB".to_string()),
            Ok(mib) if mib > ceiling => Err(format!(
                "{mib} MiB of swap leaves less than {ROOT_MIN_MIB} MiB for root on {}; at most {ceiling} MiB fits",
                disk.path
            )),
            Ok(mib) => Ok(mib),
            Err(_) => Err(format!("'{s}' is not a whole number of MiB")),
        },
    )?;
    Ok(())
}

// ── Packages ──────────────────────────────────────────────────────────────────

fn ask_packages(
    prompter: &mut dyn Prompter,
    ops: &dyn SystemOps,
    config: &mut InstallationConfig,
) -> Result<(), InstallerError> {
    let kernels: Vec<KernelVariant> = KernelVariant::iter().collect();
    config.kernel = select_from(prompter, "Kernel", &kernels, |k| k.display_name().to_string(), 0)?;

    config.cpu_vendor = ops.cpu_vendor();
    config.microcode = match config.cpu_vendor.microcode_package() {
        Some(pkg) => prompter.confirm(
            &format!("{} CPU detected. Install {pkg}?", config.cpu_vendor),
            true,
        )?,
        None => {
            ui::print_info("CPU vendor not recognised; skipping microcode.");
            false
        }
    };

    let types = [InstallType::Minimal, InstallType::Custom];
    config.install_type = select_from(
        prompter,
        "Installation type",
        &types,
        |t| match t {
            InstallType::Minimal => "Minimal (required packages only)".to_string(),
            InstallType::Custom => "Custom (choose extra features)".to_string(),
        },
        0,
    )?;

    config.extras.clear();
    if config.install_type == InstallType::Custom {
        let extras: Vec<Extra> = Extra::iter().collect();
        let labels: Vec<String> = extras
            .iter()
            .map(|e| format!("{:<12} {}", e.to_string(), e.description()))
            .collect();
        let defaults = vec![false; extras.len()];
        let picked = prompter.multi_select("Extra features", &labels, &defaults)?;
        config.extras = picked.into_iter().filter_map(|i| extras.get(i).copied()).collect();
    }

    let loaders: Vec<Bootloader> = Bootloader::iter().collect();
    config.bootloader = select_from(prompter, "Bootloader", &loaders, |b| b.to_string(), 0)?;
    Ok(())
}

// ── Locale ────────────────────────────────────────────────────────────────────

fn ask_locale(
    prompter: &mut dyn Prompter,
    ops: &dyn SystemOps,
    config: &mut InstallationConfig,
) -> Result<(), InstallerError> {
    let timezone = prompt_until_valid(prompter, "Timezone (e.g. Europe/Berlin)", Some(DEFAULT_TIMEZONE), |s| {
        let tz = s.trim();
        if ops.timezone_exists(tz) {
            Ok(tz.to_string())
        } else {
            Err(format!("unknown timezone '{tz}'"))
        }
    })?;
    config.set_timezone(&timezone);

    let locale = prompt_until_valid(prompter, "Locale", Some(DEFAULT_LOCALE), |s| {
        let locale = s.trim();
        if ops.locale_supported(locale) {
            Ok(locale.to_string())
        } else {
            Err(format!("unsupported locale '{locale}'"))
        }
    })?;
    config.set_locale(&locale);
    Ok(())
}

// ── Accounts ──────────────────────────────────────────────────────────────────

fn ask_accounts(
    prompter: &mut dyn Prompter,
    config: &mut InstallationConfig,
) -> Result<(), InstallerError> {
    prompt_until_valid(prompter, "Hostname", Some(DEFAULT_HOSTNAME), |s| {
        config.set_hostname(s.trim()).map_err(|e| e.to_string())
    })?;

    password_until_valid(prompter, "Root password", |s| {
        config.set_root_password(s).map_err(|e| e.reason)
    })?;

    config.clear_user();
    if prompter.confirm("Create a user account?", true)? {
        prompt_until_valid(prompter, "Username", None, |s| {
            config.set_username(s.trim()).map_err(|e| e.to_string())
        })?;

        password_until_valid(prompter, "User password", |s| {
            config.set_user_password(s).map_err(|e| e.reason)
        })?;

        let shells: Vec<Shell> = Shell::iter().collect();
        config.shell = select_from(prompter, "Login shell", &shells, |s| s.to_string(), 0)?;
        config.sudo = prompter.confirm("Grant the user sudo rights (wheel group)?", true)?;
    } else {
        ui::print_warning("No user account: only root will be able to log in.");
    }

    config.multilib = prompter.confirm("Enable the multilib repository?", false)?;
    Ok(())
}

fn print_summary(config: &InstallationConfig) {
    let yes_no = |b: bool| (if b { "yes" } else { "no" }).to_string();
    let extras = if config.extras.is_empty() {
        "none".to_string()
    } else {
        config.extras.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
    };
    let rows = [
        ("Disk", config.disk().unwrap_or("-").to_string()),
        ("Filesystem", config.filesystem().map(|f| f.to_string()).unwrap_or_default()),
        ("Swap", format!("{} MiB", config.swap_mib)),
        ("Kernel", config.kernel.package_name().to_string()),
        ("Microcode", config.microcode_package().unwrap_or("none").to_string()),
        ("Install type", config.install_type.to_string()),
        ("Extras", extras),
        ("Bootloader", config.bootloader.to_string()),
        ("Timezone", config.timezone().unwrap_or("-").to_string()),
        ("Locale", config.locale().unwrap_or("-").to_string()),
        ("Hostname", config.hostname().unwrap_or("-").to_string()),
        ("Username", config.username().unwrap_or("none").to_string()),
        ("Shell", config.shell.to_string()),
        ("Sudo", yes_no(config.sudo)),
        ("Multilib", yes_no(config.multilib)),
    ];
    let borrowed: Vec<(&str, &str)> = rows.iter().map(|(k, v)| (*k, v.as_str())).collect();

    println!();
    ui::print_kv_box("Installation Summary", &borrowed);
    println!();
}
