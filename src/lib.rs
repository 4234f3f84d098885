//! Interactive Arch Linux installer.
//!
//! The binary is a thin shell around [`install::Installer`]; everything it
//! needs from the outside world comes in through [`prompt::Prompter`] and
//! [`ops::SystemOps`].

pub mod cleanup;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod hardware;
pub mod install;
pub mod logging;
pub mod lsblk;
pub mod ops;
pub mod plan;
pub mod prompt;
pub mod selftest;
pub mod steps;
pub mod subvolume;
pub mod ui;
pub mod validate;
