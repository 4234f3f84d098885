use thiserror::Error;

use crate::install::Step;

/// Exit code for a run that failed before any work began
/// (not root, missing tools, unmet precondition).
pub const EXIT_ENVIRONMENT: i32 = 3;

/// Exit code for any fatal step failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command '{0}' failed with exit code {1}")]
    CommandFailed(String, i32),

    #[error("Command '{0}' not found (is it installed?)")]
    CommandNotFound(String),

    #[error("Installation cancelled by user")]
    Cancelled,

    #[error("This installer must be run as root (sudo)")]
    NotRoot,

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Missing required tools: {}", .0.join(", "))]
    MissingDependencies(Vec<String>),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Partition {device} did not appear after {attempts} attempts")]
    PartitionsNotReady { device: String, attempts: u32 },

    #[error("Mounting subvolume '{entry}' failed: {source}")]
    SubvolumeMount {
        entry: String,
        #[source]
        source: Box<InstallerError>,
    },

    #[error("Configuration incomplete: {0} was never set")]
    Incomplete(&'static str),

    #[error("Interrupted by signal")]
    Interrupted,

    #[error("Scripted input cannot answer prompt '{0}'")]
    InputExhausted(String),

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: Step,
        #[source]
        source: Box<InstallerError>,
    },
}

impl InstallerError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Wraps `self` with the step it came from. Cancellation and already
    /// wrapped errors pass through untouched.
    pub fn in_step(self, step: Step) -> Self {
        match self {
            Self::Cancelled | Self::StepFailed { .. } => self,
            other => Self::StepFailed {
                step,
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, with step wrappers peeled off.
    pub fn root_cause(&self) -> &InstallerError {
        match self {
            Self::StepFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// True when the environment was rejected before anything was touched.
    pub fn is_environment(&self) -> bool {
        matches!(
            self.root_cause(),
            Self::NotRoot | Self::MissingDependencies(_) | Self::Precondition(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_environment() {
            EXIT_ENVIRONMENT
        } else {
            EXIT_FAILURE
        }
    }
}

/// A user-supplied value rejected by one of the validators.
/// Always handled at the prompt that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field} '{value}': {reason}")]
pub struct ValidationRejection {
    pub field: &'static str,
    pub value: String,
    pub reason: String,
}

impl ValidationRejection {
    pub fn new(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}
