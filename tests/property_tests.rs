use proptest::prelude::*;

use arch_installer::{
    plan::{part_path, target_path},
    subvolume::compose_mount_options,
    validate::{validate_hostname, validate_mount_point, validate_username, USERNAME_MAX_LEN},
};

proptest! {
    #[test]
    fn usernames_in_the_grammar_are_accepted(name in "[a-z_][a-z0-9_-]{0,31}") {
        prop_assert!(validate_username(&name).is_ok(), "{}", name);
    }

    #[test]
    fn overlong_usernames_are_rejected(name in "[a-z][a-z0-9]{32,48}") {
        prop_assert!(name.len() > USERNAME_MAX_LEN);
        prop_assert!(validate_username(&name).is_err());
    }

    #[test]
    fn usernames_with_uppercase_are_rejected(head in "[a-z]{0,8}", upper in "[A-Z]", tail in "[a-z]{0,8}") {
        let name = format!("{head}{upper}{tail}");
        prop_assert!(validate_username(&name).is_err());
    }

    #[test]
    fn hostnames_with_edge_hyphens_are_rejected(body in "[a-z0-9]{1,20}") {
        let leading = format!("-{body}");
        let trailing = format!("{body}-");
        prop_assert!(validate_hostname(&leading).is_err());
        prop_assert!(validate_hostname(&trailing).is_err());
    }

    #[test]
    fn hostnames_with_inner_hyphens_are_accepted(a in "[a-z0-9]{1,20}", b in "[a-z0-9]{1,20}") {
        let name = format!("{a}-{b}");
        prop_assert!(validate_hostname(&name).is_ok());
    }

    #[test]
    fn sd_disks_take_a_bare_index(letter in "[a-z]", index in 1u32..128) {
        let disk = format!("/dev/sd{letter}");
        prop_assert_eq!(part_path(&disk, index), format!("{disk}{index}"));
    }

    #[test]
    fn nvme_disks_take_a_p_separator(ctrl in 0u32..16, ns in 1u32..8, index in 1u32..128) {
        let disk = format!("/dev/nvme{ctrl}n{ns}");
        prop_assert_eq!(part_path(&disk, index), format!("{disk}p{index}"));
    }

    #[test]
    fn reserved_trees_never_become_mount_points(
        prefix in prop::sample::select(vec!["/dev", "/proc", "/sys", "/run", "/tmp"]),
        rest in "[a-z]{1,10}",
    ) {
        let path = format!("{prefix}/{rest}");
        prop_assert!(validate_mount_point(&path).is_err());
    }

    #[test]
    fn mount_targets_stay_under_the_root(parts in prop::collection::vec("[a-z]{1,8}", 1..4)) {
        let mount_point = format!("/{}", parts.join("/"));
        let target = target_path(std::path::Path::new("/mnt"), &mount_point);
        prop_assert!(target.starts_with("/mnt"));
        prop_assert_eq!(target.components().count(), parts.len() + 2);
    }

    #[test]
    fn composed_options_always_select_the_subvolume(name in "@[a-z]{0,10}") {
        let options = compose_mount_options(&name, ",noatime,compress=zstd,", Some(" ssd "));
        let expected = format!("subvol={name},noatime,compress=zstd,ssd");
        prop_assert_eq!(options, expected);
    }
}
