//! One module per installation step. The orchestrator in `install` decides
//! the order; nothing in here calls another step.

pub mod bootloader;
pub mod chroot;
pub mod disk;
pub mod format;
pub mod fstab;
pub mod mount;
pub mod packages;
pub mod partition;
pub mod preflight;
pub mod settings;
pub mod system;
pub mod user;
