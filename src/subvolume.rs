//! Btrfs subvolume layout and its interactive editor.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::{
    cleanup::EFI_MOUNT_POINT,
    error::{InstallerError, ValidationRejection},
    ops::SystemOps,
    plan::target_path,
    prompt::{prompt_until_valid, Prompter},
    ui,
    validate::{validate_mount_options, validate_mount_point, validate_subvolume_name},
};

pub const ROOT_SUBVOLUME: &str = "@";

pub const DEFAULT_BTRFS_OPTIONS: &str = "noatime,compress=zstd,discard=async,space_cache=v2";

const DEFAULT_LAYOUT: &[(&str, &str)] = &[
    ("@", "/"),
    ("@home", "/home"),
    ("@log", "/var/log"),
    ("@pkg", "/var/cache/pacman/pkg"),
    ("@snapshots", "/.snapshots"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subvolume {
    pub mount_point: String,
    /// Appended after the global options when this subvolume is mounted.
    pub options: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Invalid(#[from] ValidationRejection),

    #[error("a subvolume named '{0}' already exists")]
    DuplicateName(String),

    #[error("{mount_point} is already used by '{owner}'")]
    MountPointTaken { mount_point: String, owner: String },

    #[error("the root subvolume '@' cannot be modified or removed")]
    RootProtected,

    #[error("at least one subvolume must remain")]
    LastEntry,

    #[error("no subvolume named '{0}'")]
    Unknown(String),

    #[error("{0} is reserved for the EFI system partition")]
    EfiMountPoint(String),
}

/// Subvolume name → mount point. The `@` → `/` entry always exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubvolumeLayout {
    entries: BTreeMap<String, Subvolume>,
}

impl Default for SubvolumeLayout {
    fn default() -> Self {
        let entries = DEFAULT_LAYOUT
            .iter()
            .map(|(name, mp)| {
                (
                    name.to_string(),
                    Subvolume {
                        mount_point: mp.to_string(),
                        options: None,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl SubvolumeLayout {
    /// A layout holding only the root subvolume.
    pub fn root_only() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(
            ROOT_SUBVOLUME.to_string(),
            Subvolume {
                mount_point: "/".to_string(),
                options: None,
            },
        );
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Subvolume> {
        self.entries.get(name)
    }

    /// All entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Subvolume)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Names that may be modified or removed, i.e. everything but root.
    pub fn editable(&self) -> Vec<&str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| *name != ROOT_SUBVOLUME)
            .collect()
    }

    pub fn add(&mut self, name: &str, mount_point: &str) -> Result<(), LayoutError> {
        validate_subvolume_name(name)?;
        validate_mount_point(mount_point)?;
        if self.entries.contains_key(name) {
            return Err(LayoutError::DuplicateName(name.to_string()));
        }
        self.check_free(mount_point, None)?;

        self.entries.insert(
            name.to_string(),
            Subvolume {
                mount_point: mount_point.to_string(),
                options: None,
            },
        );
        Ok(())
    }

    pub fn set_mount_point(&mut self, name: &str, mount_point: &str) -> Result<(), LayoutError> {
        self.check_editable(name)?;
        validate_mount_point(mount_point)?;
        self.check_free(mount_point, Some(name))?;
        if let Some(sv) = self.entries.get_mut(name) {
            sv.mount_point = mount_point.to_string();
        }
        Ok(())
    }

    /// Sets or clears (`None` / empty) the per-subvolume option override.
    pub fn set_options(&mut self, name: &str, options: Option<&str>) -> Result<(), LayoutError> {
        self.check_editable(name)?;
        let options = options.map(str::trim).filter(|o| !o.is_empty());
        if let Some(sv) = self.entries.get_mut(name) {
            sv.options = options.map(str::to_string);
        }
        Ok(())
    }

    /// Removes a non-root subvolume. Refusals leave the layout untouched.
    pub fn remove(&mut self, name: &str) -> Result<Subvolume, LayoutError> {
        if self.entries.len() <= 1 {
            return Err(LayoutError::LastEntry);
        }
        self.check_editable(name)?;
        self.entries
            .remove(name)
            .ok_or_else(|| LayoutError::Unknown(name.to_string()))
    }

    /// `subvol=<name>,<global>[,<override>]` for one entry.
    pub fn compose_options(&self, name: &str, global: &str) -> Option<String> {
        self.entries
            .get(name)
            .map(|sv| compose_mount_options(name, global, sv.options.as_deref()))
    }

    /// Every entry with its composed options, sorted by name.
    pub fn preview(&self, global: &str) -> Vec<(String, String, String)> {
        self.iter()
            .map(|(name, sv)| {
                (
                    name.to_string(),
                    sv.mount_point.clone(),
                    compose_mount_options(name, global, sv.options.as_deref()),
                )
            })
            .collect()
    }

    /// Non-root entries ordered so a parent directory is mounted before
    /// anything nested below it.
    pub fn secondary_mounts(&self) -> Vec<(&str, &Subvolume)> {
        let mut mounts: Vec<_> = self
            .iter()
            .filter(|(name, _)| *name != ROOT_SUBVOLUME)
            .collect();
        mounts.sort_by_key(|(_, sv)| (sv.mount_point.matches('/').count(), sv.mount_point.clone()));
        mounts
    }

    fn check_editable(&self, name: &str) -> Result<(), LayoutError> {
        if name == ROOT_SUBVOLUME {
            return Err(LayoutError::RootProtected);
        }
        if !self.entries.contains_key(name) {
            return Err(LayoutError::Unknown(name.to_string()));
        }
        Ok(())
    }

    /// Refuses a mount point already owned by another entry (`except` is
    /// skipped) or one at or below the EFI mount point.
    pub fn check_free(&self, mount_point: &str, except: Option<&str>) -> Result<(), LayoutError> {
        let wanted = normalize(mount_point);
        let under_efi = wanted
            .strip_prefix(EFI_MOUNT_POINT)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        if under_efi {
            return Err(LayoutError::EfiMountPoint(mount_point.to_string()));
        }
        match self
            .iter()
            .find(|(name, sv)| Some(*name) != except && normalize(&sv.mount_point) == wanted)
        {
            Some((owner, _)) => Err(LayoutError::MountPointTaken {
                mount_point: mount_point.to_string(),
                owner: owner.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn normalize(mount_point: &str) -> &str {
    match mount_point.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    }
}

pub fn compose_mount_options(name: &str, global: &str, per_entry: Option<&str>) -> String {
    let mut parts = vec![format!("subvol={name}")];
    let global = global.trim().trim_matches(',');
    if !global.is_empty() {
        parts.push(global.to_string());
    }
    if let Some(extra) = per_entry.map(str::trim).filter(|o| !o.is_empty()) {
        parts.push(extra.to_string());
    }
    parts.join(",")
}

// ── Interactive editor ────────────────────────────────────────────────────────

const MENU: &[&str] = &[
    "Keep defaults and continue",
    "Add a subvolume",
    "Modify a subvolume",
    "Remove a subvolume",
    "Edit global mount options",
    "Preview mount options",
    "Confirm and continue",
];

/// Lets the user edit `layout` and `global` until they confirm.
pub fn configure(
    prompter: &mut dyn Prompter,
    layout: &mut SubvolumeLayout,
    global: &mut String,
) -> Result<(), InstallerError> {
    let items: Vec<String> = MENU.iter().map(|s| s.to_string()).collect();

    loop {
        println!();
        print_preview(layout, global);
        println!();

        match prompter.select("Btrfs subvolumes", &items, 6)? {
            0 => {
                *layout = SubvolumeLayout::default();
                *global = DEFAULT_BTRFS_OPTIONS.to_string();
                ui::print_success("Using the default subvolume layout.");
                return Ok(());
            }
            1 => add_entry(prompter, layout)?,
            2 => modify_entry(prompter, layout)?,
            3 => remove_entry(prompter, layout)?,
            4 => *global = ask_options(prompter, "Global mount options", Some(global.as_str()))?,
            5 => print_preview(layout, global),
            _ => {
                ui::print_success("Subvolume layout confirmed.");
                return Ok(());
            }
        }
    }
}

fn add_entry(prompter: &mut dyn Prompter, layout: &mut SubvolumeLayout) -> Result<(), InstallerError> {
    let name = prompt_until_valid(prompter, "Subvolume name (e.g. @var)", None, |s| {
        validate_subvolume_name(s).map_err(|e| e.to_string())?;
        if layout.get(s).is_some() {
            return Err(LayoutError::DuplicateName(s.to_string()).to_string());
        }
        Ok(s.to_string())
    })?;

    let mount_point = prompt_until_valid(prompter, "Mount point (e.g. /var)", None, |s| {
        validate_mount_point(s).map_err(|e| e.to_string())?;
        layout.check_free(s, None).map_err(|e| e.to_string())?;
        Ok(s.to_string())
    })?;

    match layout.add(&name, &mount_point) {
        Ok(()) => ui::print_success(&format!("Added {name} → {mount_point}.")),
        Err(e) => prompter.reject(&e.to_string()),
    }
    Ok(())
}

fn modify_entry(
    prompter: &mut dyn Prompter,
    layout: &mut SubvolumeLayout,
) -> Result<(), InstallerError> {
    let Some(name) = pick_editable(prompter, layout, "Subvolume to modify")? else {
        return Ok(());
    };

    let actions = vec![
        "Change mount point".to_string(),
        "Set per-subvolume mount options".to_string(),
        "Back".to_string(),
    ];
    match prompter.select(&format!("Modify {name}"), &actions, 0)? {
        0 => {
            let mount_point = prompt_until_valid(prompter, "New mount point", None, |s| {
                validate_mount_point(s).map_err(|e| e.to_string())?;
                layout.check_free(s, Some(&name)).map_err(|e| e.to_string())?;
                Ok(s.to_string())
            })?;
            if let Err(e) = layout.set_mount_point(&name, &mount_point) {
                prompter.reject(&e.to_string());
            }
        }
        1 => {
            let current = layout.get(&name).and_then(|sv| sv.options.clone());
            let options = ask_options(
                prompter,
                "Extra mount options (empty to clear)",
                current.as_deref().or(Some("")),
            )?;
            if let Err(e) = layout.set_options(&name, Some(&options)) {
                prompter.reject(&e.to_string());
            }
        }
        _ => {}
    }
    Ok(())
}

fn remove_entry(
    prompter: &mut dyn Prompter,
    layout: &mut SubvolumeLayout,
) -> Result<(), InstallerError> {
    if layout.len() <= 1 {
        prompter.reject(&LayoutError::LastEntry.to_string());
        return Ok(());
    }
    let Some(name) = pick_editable(prompter, layout, "Subvolume to remove")? else {
        return Ok(());
    };
    match layout.remove(&name) {
        Ok(sv) => ui::print_success(&format!("Removed {name} ({}).", sv.mount_point)),
        Err(e) => prompter.reject(&e.to_string()),
    }
    Ok(())
}

/// Offers only non-root entries; `None` when there are none.
fn pick_editable(
    prompter: &mut dyn Prompter,
    layout: &SubvolumeLayout,
    question: &str,
) -> Result<Option<String>, InstallerError> {
    let names: Vec<String> = layout.editable().into_iter().map(str::to_string).collect();
    if names.is_empty() {
        prompter.reject("Only the root subvolume is left; it cannot be changed.");
        return Ok(None);
    }
    let labels: Vec<String> = names
        .iter()
        .map(|n| {
            let mp = layout.get(n).map(|sv| sv.mount_point.as_str()).unwrap_or("");
            format!("{n:<14} {mp}")
        })
        .collect();
    let idx = prompter.select(question, &labels, 0)?;
    Ok(names.get(idx).cloned())
}

/// Options are never refused; anything outside the allow-list is warned about.
fn ask_options(
    prompter: &mut dyn Prompter,
    question: &str,
    default: Option<&str>,
) -> Result<String, InstallerError> {
    let options = prompter.input(question, default)?;
    for warning in validate_mount_options(&options).warnings {
        tracing::warn!(options = %options, "{warning}");
        ui::print_warning(&warning);
    }
    Ok(options.trim().to_string())
}

fn print_preview(layout: &SubvolumeLayout, global: &str) {
    let rows = layout.preview(global);
    let labels: Vec<(String, String)> = rows
        .into_iter()
        .map(|(name, mp, opts)| (format!("{name} {mp}"), opts))
        .collect();
    let borrowed: Vec<(&str, &str)> = labels.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    ui::print_kv_box("Subvolumes", &borrowed);
}

// ── Mounting ──────────────────────────────────────────────────────────────────

/// Creates every subvolume on the freshly formatted btrfs volume.
pub fn create_subvolumes(
    ops: &dyn SystemOps,
    layout: &SubvolumeLayout,
    device: &str,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    ops.mount(device, mount_root, None)?;
    let created = layout
        .iter()
        .try_for_each(|(name, _)| ops.create_subvolume(&mount_root.join(name)));
    // The top-level volume has to come off even when a create failed.
    let unmounted = ops.unmount(mount_root);
    created?;
    unmounted
}

/// Mounts root first, then creates the sub-mount directories, then mounts
/// every other entry. Stops at the first failure and names the entry; it
/// never unwinds what is already mounted.
pub fn mount_layout(
    ops: &dyn SystemOps,
    layout: &SubvolumeLayout,
    global: &str,
    device: &str,
    mount_root: &Path,
) -> Result<(), InstallerError> {
    let root_opts = compose_mount_options(ROOT_SUBVOLUME, global, None);
    ops.mount(device, mount_root, Some(&root_opts))
        .map_err(|e| InstallerError::SubvolumeMount {
            entry: ROOT_SUBVOLUME.to_string(),
            source: Box::new(e),
        })?;

    let secondary = layout.secondary_mounts();
    for (_, sv) in &secondary {
        ops.create_dir(&target_path(mount_root, &sv.mount_point))?;
    }

    for (name, sv) in secondary {
        let opts = compose_mount_options(name, global, sv.options.as_deref());
        ops.mount(device, &target_path(mount_root, &sv.mount_point), Some(&opts))
            .map_err(|e| InstallerError::SubvolumeMount {
                entry: name.to_string(),
                source: Box::new(e),
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Answer, ScriptedPrompter};

    #[test]
    fn default_layout_has_root() {
        let layout = SubvolumeLayout::default();
        assert_eq!(layout.get("@").unwrap().mount_point, "/");
        assert_eq!(layout.len(), 5);
        assert!(!layout.editable().contains(&"@"));
    }

    #[test]
    fn root_cannot_be_removed_regardless_of_size() {
        for mut layout in [SubvolumeLayout::default(), SubvolumeLayout::root_only()] {
            let before = layout.clone();
            assert!(layout.remove("@").is_err());
            assert_eq!(layout, before);
        }
    }

    #[test]
    fn last_entry_is_refused() {
        let mut layout = SubvolumeLayout::root_only();
        assert_eq!(layout.remove("@"), Err(LayoutError::LastEntry));
    }

    #[test]
    fn root_cannot_be_modified() {
        let mut layout = SubvolumeLayout::default();
        assert_eq!(layout.set_mount_point("@", "/other"), Err(LayoutError::RootProtected));
        assert_eq!(layout.set_options("@", Some("ssd")), Err(LayoutError::RootProtected));
    }

    #[test]
    fn mount_points_stay_distinct() {
        let mut layout = SubvolumeLayout::default();
        assert!(matches!(
            layout.add("@home2", "/home"),
            Err(LayoutError::MountPointTaken { .. })
        ));
        assert!(matches!(
            layout.add("@slash", "/"),
            Err(LayoutError::MountPointTaken { .. })
        ));
        assert!(matches!(
            layout.set_mount_point("@log", "/home"),
            Err(LayoutError::MountPointTaken { .. })
        ));
        assert!(layout.set_mount_point("@log", "/var/log").is_ok());
        assert!(layout.add("@var", "/var").is_ok());
    }

    #[test]
    fn efi_mount_point_is_reserved() {
        let mut layout = SubvolumeLayout::default();
        assert!(matches!(layout.add("@boot", "/boot"), Err(LayoutError::EfiMountPoint(_))));
        assert!(matches!(layout.add("@efi", "/boot/efi"), Err(LayoutError::EfiMountPoint(_))));
        assert!(matches!(
            layout.set_mount_point("@log", "/boot/"),
            Err(LayoutError::EfiMountPoint(_))
        ));
        assert!(layout.add("@bootstrap", "/bootstrap").is_ok());
    }

    #[test]
    fn add_validates_names_and_paths() {
        let mut layout = SubvolumeLayout::default();
        assert!(matches!(layout.add("var", "/var"), Err(LayoutError::Invalid(_))));
        assert!(matches!(layout.add("@var", "/proc/x"), Err(LayoutError::Invalid(_))));
        assert!(matches!(layout.add("@home", "/data"), Err(LayoutError::DuplicateName(_))));
    }

    #[test]
    fn composes_options() {
        assert_eq!(
            compose_mount_options("@home", "noatime,compress=zstd", None),
            "subvol=@home,noatime,compress=zstd"
        );
        assert_eq!(
            compose_mount_options("@log", "noatime", Some("nodatacow")),
            "subvol=@log,noatime,nodatacow"
        );
        assert_eq!(compose_mount_options("@", "", None), "subvol=@");
    }

    #[test]
    fn preview_is_sorted_and_pure() {
        let mut layout = SubvolumeLayout::default();
        layout.set_options("@log", Some("nodatacow")).unwrap();
        let before = layout.clone();
        let rows = layout.preview("noatime");
        let names: Vec<&str> = rows.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names, ["@", "@home", "@log", "@pkg", "@snapshots"]);
        assert_eq!(rows[2].2, "subvol=@log,noatime,nodatacow");
        assert_eq!(layout, before);
    }

    #[test]
    fn secondary_mounts_put_parents_first() {
        let mut layout = SubvolumeLayout::root_only();
        layout.add("@varlog", "/var/log").unwrap();
        layout.add("@var", "/var").unwrap();
        let order: Vec<&str> = layout.secondary_mounts().iter().map(|(n, _)| *n).collect();
        assert_eq!(order, ["@var", "@varlog"]);
    }

    #[test]
    fn interactive_add_then_confirm() {
        let mut layout = SubvolumeLayout::default();
        let mut global = DEFAULT_BTRFS_OPTIONS.to_string();
        let mut p = ScriptedPrompter::new([
            Answer::Choice(1),
            Answer::text("bad"),
            Answer::text("@var"),
            Answer::text("/home"),
            Answer::text("/var"),
            Answer::Choice(6),
        ]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert_eq!(layout.get("@var").unwrap().mount_point, "/var");
        assert_eq!(p.rejections.len(), 2);
    }

    #[test]
    fn interactive_add_refuses_the_efi_mount_point() {
        let mut layout = SubvolumeLayout::default();
        let mut global = DEFAULT_BTRFS_OPTIONS.to_string();
        let mut p = ScriptedPrompter::new([
            Answer::Choice(1),
            Answer::text("@boot"),
            Answer::text("/boot"),
            Answer::text("/srv"),
            Answer::Choice(6),
        ]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert_eq!(layout.get("@boot").unwrap().mount_point, "/srv");
        assert_eq!(p.rejections.len(), 1);
        assert!(p.rejections[0].contains("EFI"), "{:?}", p.rejections);
    }

    #[test]
    fn unusual_options_are_kept_with_a_warning() {
        let mut layout = SubvolumeLayout::default();
        let mut global = DEFAULT_BTRFS_OPTIONS.to_string();
        let mut p = ScriptedPrompter::new([
            Answer::Choice(4),
            Answer::text("noatime,$(frob)"),
            Answer::Choice(6),
        ]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert_eq!(global, "noatime,$(frob)");
        assert!(p.rejections.is_empty());

        layout.set_options("@home", Some("x y")).unwrap();
        assert_eq!(layout.get("@home").unwrap().options.as_deref(), Some("x y"));
    }

    #[test]
    fn interactive_remove_never_offers_root() {
        let mut layout = SubvolumeLayout::default();
        let mut global = String::new();
        // editable() is sorted: @home, @log, @pkg, @snapshots
        let mut p = ScriptedPrompter::new([Answer::Choice(3), Answer::Choice(0), Answer::Choice(6)]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert!(layout.get("@home").is_none());
        assert!(layout.get("@").is_some());
    }

    #[test]
    fn interactive_remove_with_only_root_reports_refusal() {
        let mut layout = SubvolumeLayout::root_only();
        let mut global = String::new();
        let mut p = ScriptedPrompter::new([Answer::Choice(3), Answer::Choice(6)]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert_eq!(layout.len(), 1);
        assert_eq!(p.rejections.len(), 1);
    }

    #[test]
    fn keep_defaults_restores_layout() {
        let mut layout = SubvolumeLayout::root_only();
        let mut global = "ssd".to_string();
        let mut p = ScriptedPrompter::new([Answer::Choice(0)]);
        configure(&mut p, &mut layout, &mut global).unwrap();
        assert_eq!(layout, SubvolumeLayout::default());
        assert_eq!(global, DEFAULT_BTRFS_OPTIONS);
    }
}
