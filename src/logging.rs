use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::error::InstallerError;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
}

/// Opens the run log for appending, creating it if needed.
pub fn open_log(path: &Path) -> Result<File, InstallerError> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Timestamped, human-readable lines appended to `log_file`, or written to
/// stdout when `to_stdout` is set. `RUST_LOG` overrides the level.
pub fn init(log_file: &Path, to_stdout: bool) -> Result<(), InstallerError> {
    if to_stdout {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(false)
            .init();
        return Ok(());
    }

    let file = open_log(log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn log_file_is_appended_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("install.log");

        writeln!(open_log(&path).unwrap(), "first run").unwrap();
        writeln!(open_log(&path).unwrap(), "second run").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first run\nsecond run\n");
    }

    #[test]
    fn unwritable_location_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("install.log");
        assert!(matches!(open_log(&path), Err(InstallerError::Io(_))));
    }
}
