//! CLI-specific error types and exit code mapping

use lockpost_core::error::LockpostError;
use lockpost_lock_scanner::LockScanError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Compromised packages remain unpinned after the run.
    #[error("{0}")]
    Compromised(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from lockpost-core.
    #[error("{0}")]
    Core(#[from] LockpostError),

    /// Lockfile scanner domain error.
    #[error("scan error: {0}")]
    Scan(String),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 4    | Compromised packages found, not pinned   |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LockpostError::Config(_)) => 2,
            Self::Compromised(_) => 4,
            Self::Io(_) | Self::Core(LockpostError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) | Self::Scan(_) => 1,
        }
    }
}

impl From<LockScanError> for CliError {
    fn from(e: LockScanError) -> Self {
        match e {
            LockScanError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Scan(other.to_string()),
        }
    }
}
