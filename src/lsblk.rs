use std::collections::HashMap;

use indicatif::HumanBytes;

// ── Data types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    pub path: String,    // /dev/sda
    pub size_bytes: u64, // 21474836480
    pub model: String,   // SAMSUNG SSD 870
}

impl Disk {
    /// One-line label shown in the arrow-key selector.
    pub fn display(&self) -> String {
        let model = if self.model.is_empty() { "—" } else { &self.model };
        format!(
            "{:<14}  {:>10}   {}",
            self.path,
            HumanBytes(self.size_bytes).to_string(),
            model
        )
    }
}

/// Arguments for `lsblk` that produce output `parse_disks` understands.
pub const LSBLK_ARGS: &[&str] = &[
    "--pairs",
    "--bytes",
    "--nodeps",
    "--output",
    "NAME,SIZE,TYPE,MODEL",
];

// ── Public API ────────────────────────────────────────────────────────────────

/// Keeps rows of type `disk`, skipping optical and RAM-backed devices.
pub fn parse_disks(output: &str) -> Vec<Disk> {
    output
        .lines()
        .filter_map(|line| {
            let m = parse_pairs(line);
            if m.get("TYPE").map(String::as_str) != Some("disk") {
                return None;
            }
            let name = m.get("NAME").map(String::as_str).unwrap_or("");
            if name.is_empty() || name.starts_with("zram") || name.starts_with("ram") {
                return None;
            }
            Some(Disk {
                path: format!("/dev/{name}"),
                size_bytes: m.get("SIZE").and_then(|s| s.parse().ok()).unwrap_or(0),
                model: m.get("MODEL").map(|s| s.trim().to_string()).unwrap_or_default(),
            })
        })
        .collect()
}

// ── lsblk --pairs parser ──────────────────────────────────────────────────────
//
// Each line looks like:   NAME="sda" SIZE="21474836480" TYPE="disk" MODEL="QEMU HARDDISK"

fn parse_pairs(line: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else { break };
        let key = rest[..eq].split_whitespace().last().unwrap_or("").to_string();
        rest = &rest[eq + 1..];

        if !rest.starts_with('"') {
            break;
        }
        rest = &rest[1..]; // skip opening "

        let Some(close) = rest.find('"') else { break };
        let value = rest[..close].to_string();
        rest = &rest[close + 1..]; // skip closing "

        if !key.is_empty() {
            map.insert(key, value);
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"NAME="sda" SIZE="107374182400" TYPE="disk" MODEL="Samsung SSD 870"
NAME="sr0" SIZE="1073741312" TYPE="rom" MODEL="QEMU DVD-ROM"
NAME="nvme0n1" SIZE="512110190592" TYPE="disk" MODEL="WD Blue SN570"
NAME="zram0" SIZE="4294967296" TYPE="disk" MODEL=""
NAME="vda" SIZE="21474836480" TYPE="disk" MODEL=""
"#;

    #[test]
    fn parses_disks_only() {
        let disks = parse_disks(SAMPLE);
        let paths: Vec<&str> = disks.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["/dev/sda", "/dev/nvme0n1", "/dev/vda"]);
        assert_eq!(disks[0].size_bytes, 107_374_182_400);
        assert_eq!(disks[0].model, "Samsung SSD 870");
        assert_eq!(disks[2].model, "");
    }

    #[test]
    fn display_uses_human_sizes() {
        let d = Disk {
            path: "/dev/sda".into(),
            size_bytes: 107_374_182_400,
            model: String::new(),
        };
        let label = d.display();
        assert!(label.contains("/dev/sda"));
        assert!(label.contains("GiB"), "{label}");
        assert!(label.contains('—'));
    }

    #[test]
    fn pairs_with_spaces_in_values() {
        let m = parse_pairs(r#"NAME="sdb" MODEL="Ultra Fit" TYPE="disk""#);
        assert_eq!(m.get("MODEL").map(String::as_str), Some("Ultra Fit"));
        assert_eq!(m.get("TYPE").map(String::as_str), Some("disk"));
    }
}
