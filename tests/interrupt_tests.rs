//! Kept in its own binary: the interrupt flag is process-wide.

mod common;

use arch_installer::{
    error::{InstallerError, EXIT_FAILURE},
    install::{self, Installer},
    prompt::ScriptedPrompter,
};
use common::{options, FakeOps};

#[test]
fn interrupt_stops_before_the_next_step() {
    let ops = FakeOps::default();
    let mut prompter = ScriptedPrompter::new(Vec::new());

    install::request_interrupt();
    let err = Installer::new(&mut prompter, &ops, options()).run().unwrap_err();

    assert!(matches!(err.root_cause(), InstallerError::Interrupted), "{err}");
    assert_eq!(err.exit_code(), EXIT_FAILURE);
    assert!(prompter.asked.is_empty());
    assert!(ops.calls().is_empty());
}
