//! Shared error type across iostat-exporter crates.

use std::time::Duration;

use thiserror::Error;

/// Stable error codes, used as metric labels and in log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid or unreadable configuration.
    Config,
    /// A candidate row could not be converted into a sample.
    Parse,
    /// The statistics tool could not be launched.
    Spawn,
    /// The statistics tool did not finish in time.
    Timeout,
    /// The statistics tool exited unsuccessfully.
    ExitStatus,
    /// Anything else.
    Internal,
}

impl ErrorKind {
    /// String representation used in metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Parse => "parse",
            ErrorKind::Spawn => "spawn",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ExitStatus => "exit_status",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, IostatError>;

/// Unified error type used by core and exporter.
#[derive(Debug, Error)]
pub enum IostatError {
    #[error("config: {0}")]
    Config(String),
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("failed to launch sampler: {0}")]
    Spawn(String),
    #[error("sampler timed out after {0:?}")]
    SamplerTimeout(Duration),
    #[error("sampler exited with {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },
    #[error("internal: {0}")]
    Internal(String),
}

impl IostatError {
    /// Map the error to its stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IostatError::Config(_) => ErrorKind::Config,
            IostatError::Parse { .. } => ErrorKind::Parse,
            IostatError::Spawn(_) => ErrorKind::Spawn,
            IostatError::SamplerTimeout(_) => ErrorKind::Timeout,
            IostatError::ExitStatus { .. } => ErrorKind::ExitStatus,
            IostatError::Internal(_) => ErrorKind::Internal,
        }
    }
}
