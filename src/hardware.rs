//! Parsers for the kernel's view of the machine: memory, CPU vendor and
//! the mount table. The probes themselves live in `ops`.

use crate::config::CpuVendor;

/// Present only when the kernel was booted through UEFI.
pub const EFI_VARS_PATH: &str = "/sys/firmware/efi/efivars";

/// `MemTotal` from `/proc/meminfo`, in MiB.
pub fn parse_mem_total_mib(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find(|l| l.starts_with("MemTotal:"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|kib| kib.parse::<u64>().ok())
        .map(|kib| kib / 1024)
}

/// Vendor of the first CPU listed in `/proc/cpuinfo`.
pub fn parse_cpu_vendor(cpuinfo: &str) -> CpuVendor {
    let vendor = cpuinfo
        .lines()
        .find(|l| l.starts_with("vendor_id"))
        .and_then(|l| l.split(':').nth(1))
        .map(str::trim)
        .unwrap_or("");

    match vendor {
        "GenuineIntel" => CpuVendor::Intel,
        "AuthenticAMD" => CpuVendor::Amd,
        _ => CpuVendor::Unknown,
    }
}

/// True when `target` appears as a mount point in a `/proc/self/mounts` dump.
pub fn mount_table_has_target(mount_table: &str, target: &str) -> bool {
    mount_table
        .lines()
        .filter_map(|l| l.split_whitespace().nth(1))
        .any(|t| unescape_mount_field(t) == target)
}

/// The kernel writes spaces and tabs in mount paths as octal escapes.
fn unescape_mount_field(field: &str) -> String {
    field
        .replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\134", "\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meminfo() {
        let sample = "MemTotal:       16318412 kB\nMemFree:         1234 kB\n";
        assert_eq!(parse_mem_total_mib(sample), Some(15935));
        assert_eq!(parse_mem_total_mib("garbage"), None);
    }

    #[test]
    fn cpu_vendor() {
        assert_eq!(
            parse_cpu_vendor("processor\t: 0\nvendor_id\t: GenuineIntel\n"),
            CpuVendor::Intel
        );
        assert_eq!(parse_cpu_vendor("vendor_id\t: AuthenticAMD\n"), CpuVendor::Amd);
        assert_eq!(parse_cpu_vendor("vendor_id\t: ARM\n"), CpuVendor::Unknown);
        assert_eq!(parse_cpu_vendor(""), CpuVendor::Unknown);
    }

    #[test]
    fn mount_targets() {
        let table = "/dev/sda3 /mnt ext4 rw 0 0\n/dev/sda1 /mnt/boot vfat rw 0 0\n/dev/sdb1 /media/my\\040usb vfat rw 0 0\n";
        assert!(mount_table_has_target(table, "/mnt"));
        assert!(mount_table_has_target(table, "/mnt/boot"));
        assert!(mount_table_has_target(table, "/media/my usb"));
        assert!(!mount_table_has_target(table, "/mnt/home"));
    }
}
