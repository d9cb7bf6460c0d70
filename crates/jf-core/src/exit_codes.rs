//! Exit codes for the jf-core CLI.
//!
//! Exit codes communicate the run outcome without requiring output parsing.
//!
//! Exit code ranges:
//! - 0-1: Operational outcomes (the simulation completed)
//! - 10-19: User/input errors (fixable by changing arguments, config, or data)
//! - 20-29: Internal and environment errors

use jf_common::{Error, ErrorCategory};

/// Exit codes for jf-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-1)
    // ========================================================================
    /// Every window ran normally.
    Clean = 0,

    /// Run completed, but some windows fell back or skipped training.
    Degraded = 1,

    // ========================================================================
    // User / Input Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, unreadable, or invalid
    ConfigError = 11,

    /// Stream corrupted or out of order
    DataError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,

    /// External trainer never signalled or timed out
    TimeoutError = 22,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if the simulation completed (codes 0-1).
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::Degraded)
    }

    /// Check if this exit code is a user/input error (codes 10-19).
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    /// Check if this exit code is an internal error (codes 20-29).
    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::Degraded => "OK_DEGRADED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DataError => "ERR_DATA",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::TimeoutError => "ERR_TIMEOUT",
        }
    }

    /// Map a fatal error to the exit code automation should see.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::SignalTimeout { .. } | Error::CollaboratorTimeout { .. } => {
                ExitCode::TimeoutError
            }
            Error::InvalidStream(_) => ExitCode::DataError,
            _ => match err.category() {
                ErrorCategory::Config => ExitCode::ConfigError,
                ErrorCategory::Precondition => ExitCode::DataError,
                ErrorCategory::Io => ExitCode::IoError,
                ErrorCategory::Training
                | ErrorCategory::Collaborator
                | ErrorCategory::Calibration => ExitCode::InternalError,
            },
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Degraded.is_success());
        assert!(ExitCode::DataError.is_user_error());
        assert!(!ExitCode::DataError.is_internal_error());
        assert!(ExitCode::TimeoutError.is_internal_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::ConfigError.to_string(), "ERR_CONFIG (11)");
        assert_eq!(i32::from(ExitCode::Degraded), 1);
    }

    #[test]
    fn test_for_error() {
        assert_eq!(
            ExitCode::for_error(&Error::TimestampRegression {
                commit_id: "c".into(),
                timestamp: 1,
                last: 2
            }),
            ExitCode::DataError
        );
        assert_eq!(
            ExitCode::for_error(&Error::SignalTimeout {
                path: "p".into(),
                waited_secs: 5
            }),
            ExitCode::TimeoutError
        );
        assert_eq!(
            ExitCode::for_error(&Error::Config("bad".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::for_error(&Error::InvalidStream("line 3".into())),
            ExitCode::DataError
        );
    }
}
