//! CLI-specific error types and exit code mapping

use appcert_core::error::AppcertError;
use appcert_poller::PollError;
use appcert_suite::SuiteRunnerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The target could not be reached over ssh.
    #[error("target unreachable: {0}")]
    TargetUnreachable(String),

    /// At least one hard check failed, or a wait condition was never met.
    #[error("checks failed: {0}")]
    ChecksFailed(String),

    /// Interrupted by Ctrl-C.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from appcert-core.
    #[error("{0}")]
    Core(#[from] AppcertError),

    /// Suite loading or validation error.
    #[error("suite error: {0}")]
    Suite(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                |
    /// |------|----------------------------------------|
    /// | 0    | Success                                |
    /// | 1    | General / command error                |
    /// | 2    | Configuration error                    |
    /// | 3    | Target unreachable                     |
    /// | 4    | Checks failed / wait not satisfied     |
    /// | 10   | IO error                               |
    /// | 130  | Cancelled (Ctrl-C)                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(AppcertError::Config(_)) => 2,
            Self::TargetUnreachable(_) => 3,
            Self::ChecksFailed(_) => 4,
            Self::Io(_) | Self::Core(AppcertError::Io(_)) => 10,
            Self::Cancelled(_) => 130,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Suite(_) => 1,
        }
    }
}

impl From<SuiteRunnerError> for CliError {
    fn from(e: SuiteRunnerError) -> Self {
        Self::Suite(e.to_string())
    }
}

impl From<PollError> for CliError {
    fn from(e: PollError) -> Self {
        match e {
            PollError::InvalidConfig { .. } => Self::Config(e.to_string()),
            PollError::ProbeFault { ref source, .. } if source.is_transport() => {
                Self::TargetUnreachable(e.to_string())
            }
            PollError::ProbeFault { .. } => Self::Command(e.to_string()),
        }
    }
}
