//! Error types for jitflow.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints that drive the simulation's skip-or-abort policy
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Stream Precondition Violated
//!   Reason: precondition violated: commit c42 at 1500 precedes 1600
//!   Fix: Sort the stream by author timestamp and rerun.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 21,
//!   "category": "precondition",
//!   "message": "timestamp regression at commit c42: 1500 < 1600",
//!   "recoverable": false,
//!   "suggested_action": "abort",
//!   "context": { "commit_id": "c42" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for jitflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Corrupted stream or broken verifier bookkeeping.
    Precondition,
    /// Not enough labeled data to train this cycle.
    Training,
    /// External trainer/tester failures.
    Collaborator,
    /// Threshold calibration over unusable samples.
    Calibration,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Precondition => write!(f, "precondition"),
            ErrorCategory::Training => write!(f, "training"),
            ErrorCategory::Collaborator => write!(f, "collaborator"),
            ErrorCategory::Calibration => write!(f, "calibration"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Suggested actions for automation reacting to errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    /// Retry the operation (possibly next window).
    Retry,
    /// Skip this window and continue.
    Skip,
    /// Run the configuration check command.
    RunCheck,
    /// Fix the input data.
    FixInput,
    /// Abort the run.
    Abort,
    /// Manual intervention required.
    ManualIntervention,
}

impl std::fmt::Display for SuggestedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuggestedAction::Retry => write!(f, "retry"),
            SuggestedAction::Skip => write!(f, "skip"),
            SuggestedAction::RunCheck => write!(f, "run_check"),
            SuggestedAction::FixInput => write!(f, "fix_input"),
            SuggestedAction::Abort => write!(f, "abort"),
            SuggestedAction::ManualIntervention => write!(f, "manual_intervention"),
        }
    }
}

/// Unified error type for jitflow.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    // Precondition violations (20-29)
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("timestamp regression at commit {commit_id}: {timestamp} < {last}")]
    TimestampRegression {
        commit_id: String,
        timestamp: i64,
        last: i64,
    },

    #[error("duplicate commit in stream: {commit_id}")]
    DuplicateCommit { commit_id: String },

    // Training errors (30-39)
    #[error("insufficient training data: {0}")]
    InsufficientTrainingData(String),

    #[error("model update signal not observed at {path} after {waited_secs}s")]
    SignalTimeout { path: String, waited_secs: u64 },

    // Collaborator errors (40-49)
    #[error("external collaborator failed: {0}")]
    ExternalCollaborator(String),

    #[error("external collaborator timed out after {seconds}s")]
    CollaboratorTimeout { seconds: u64 },

    // Calibration errors (50-59)
    #[error("calibration needs both classes: {positives} positives, {negatives} negatives")]
    CalibrationDegenerate { positives: usize, negatives: usize },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration and input errors
    /// - 20-29: Precondition violations
    /// - 30-39: Training errors
    /// - 40-49: Collaborator errors
    /// - 50-59: Calibration errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidStream(_) => 11,
            Error::PreconditionViolation(_) => 20,
            Error::TimestampRegression { .. } => 21,
            Error::DuplicateCommit { .. } => 22,
            Error::InsufficientTrainingData(_) => 30,
            Error::SignalTimeout { .. } => 31,
            Error::ExternalCollaborator(_) => 40,
            Error::CollaboratorTimeout { .. } => 41,
            Error::CalibrationDegenerate { .. } => 50,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidStream(_) => ErrorCategory::Config,

            Error::PreconditionViolation(_)
            | Error::TimestampRegression { .. }
            | Error::DuplicateCommit { .. } => ErrorCategory::Precondition,

            Error::InsufficientTrainingData(_) | Error::SignalTimeout { .. } => {
                ErrorCategory::Training
            }

            Error::ExternalCollaborator(_) | Error::CollaboratorTimeout { .. } => {
                ErrorCategory::Collaborator
            }

            Error::CalibrationDegenerate { .. } => ErrorCategory::Calibration,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether the simulation may continue past this error.
    ///
    /// Recoverable errors degrade a single window (training skipped or fallback
    /// predictions); everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => false,
            Error::InvalidStream(_) => false,

            // Corrupted stream or logic bug: never silently corrected
            Error::PreconditionViolation(_) => false,
            Error::TimestampRegression { .. } => false,
            Error::DuplicateCommit { .. } => false,

            Error::InsufficientTrainingData(_) => true,
            Error::SignalTimeout { .. } => false,

            Error::ExternalCollaborator(_) => true,
            Error::CollaboratorTimeout { .. } => true,

            Error::CalibrationDegenerate { .. } => true,

            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns true if this error must abort the run.
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the suggested action for automation.
    pub fn suggested_action(&self) -> SuggestedAction {
        match self {
            Error::Config(_) => SuggestedAction::RunCheck,
            Error::InvalidStream(_) => SuggestedAction::FixInput,

            Error::PreconditionViolation(_) => SuggestedAction::Abort,
            Error::TimestampRegression { .. } => SuggestedAction::FixInput,
            Error::DuplicateCommit { .. } => SuggestedAction::FixInput,

            Error::InsufficientTrainingData(_) => SuggestedAction::Skip,
            Error::SignalTimeout { .. } => SuggestedAction::ManualIntervention,

            Error::ExternalCollaborator(_) => SuggestedAction::Retry,
            Error::CollaboratorTimeout { .. } => SuggestedAction::Retry,

            Error::CalibrationDegenerate { .. } => SuggestedAction::Skip,

            Error::Io(_) => SuggestedAction::Retry,
            Error::Json(_) => SuggestedAction::ManualIntervention,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'jf-core check' to validate configuration, or check syntax in the config file."
            }
            Error::InvalidStream(_) => {
                "Each stream line must be a JSON change record with commit_hash and author_date_unix_timestamp."
            }
            Error::PreconditionViolation(_) => {
                "Verifier bookkeeping is inconsistent. Report as a bug with the stream and config used."
            }
            Error::TimestampRegression { .. } => {
                "Sort the stream by author timestamp (ascending) and rerun."
            }
            Error::DuplicateCommit { .. } => {
                "Each commit_hash must appear once. Deduplicate the stream and rerun."
            }
            Error::InsufficientTrainingData(_) => {
                "Training is delayed until the pool holds both buggy and clean examples."
            }
            Error::SignalTimeout { .. } => {
                "The trainer never wrote training_status.txt. Check the trainer command and raise the poll budget."
            }
            Error::ExternalCollaborator(_) => {
                "Inspect the trainer/tester logs. The window falls back to all-negative predictions."
            }
            Error::CollaboratorTimeout { .. } => {
                "Raise trainer.command_timeout_secs or reduce the window size."
            }
            Error::CalibrationDegenerate { .. } => {
                "Operating-point search needs at least one positive and one negative sample."
            }
            Error::Io(_) => {
                "Check disk space, permissions, and that the artifact directory exists. Retry the operation."
            }
            Error::Json(_) => {
                "Invalid JSON in file. Check syntax with 'jq .' or regenerate the artifact."
            }
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidStream(_) => "Invalid Change Stream",
            Error::PreconditionViolation(_) => "Precondition Violated",
            Error::TimestampRegression { .. } => "Stream Out Of Order",
            Error::DuplicateCommit { .. } => "Duplicate Commit",
            Error::InsufficientTrainingData(_) => "Insufficient Training Data",
            Error::SignalTimeout { .. } => "Model Update Signal Missing",
            Error::ExternalCollaborator(_) => "Trainer/Tester Failed",
            Error::CollaboratorTimeout { .. } => "Trainer/Tester Timeout",
            Error::CalibrationDegenerate { .. } => "Degenerate Calibration Sample",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the simulation could have continued.
    pub recoverable: bool,

    /// Suggested action for automation.
    pub suggested_action: SuggestedAction,

    /// Additional structured context (e.g., commit id, timeout).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::TimestampRegression {
                commit_id,
                timestamp,
                last,
            } => {
                context.insert("commit_id".to_string(), serde_json::json!(commit_id));
                context.insert("timestamp".to_string(), serde_json::json!(timestamp));
                context.insert("last_timestamp".to_string(), serde_json::json!(last));
            }
            Error::DuplicateCommit { commit_id } => {
                context.insert("commit_id".to_string(), serde_json::json!(commit_id));
            }
            Error::SignalTimeout { path, waited_secs } => {
                context.insert("path".to_string(), serde_json::json!(path));
                context.insert("waited_secs".to_string(), serde_json::json!(waited_secs));
            }
            Error::CollaboratorTimeout { seconds } => {
                context.insert("timeout_seconds".to_string(), serde_json::json!(seconds));
            }
            Error::CalibrationDegenerate {
                positives,
                negatives,
            } => {
                context.insert("positives".to_string(), serde_json::json!(positives));
                context.insert("negatives".to_string(), serde_json::json!(negatives));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// Output format:
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("test".into()).code(), 10);
        assert_eq!(
            Error::DuplicateCommit {
                commit_id: "abc".into()
            }
            .code(),
            22
        );
        assert_eq!(Error::CollaboratorTimeout { seconds: 30 }.code(), 41);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::PreconditionViolation("x".into()).category(),
            ErrorCategory::Precondition
        );
        assert_eq!(
            Error::InsufficientTrainingData("x".into()).category(),
            ErrorCategory::Training
        );
        assert_eq!(
            Error::ExternalCollaborator("x".into()).category(),
            ErrorCategory::Collaborator
        );
    }

    #[test]
    fn test_recoverability_matches_taxonomy() {
        assert!(Error::InsufficientTrainingData("pool".into()).is_recoverable());
        assert!(Error::ExternalCollaborator("exit 1".into()).is_recoverable());
        assert!(Error::PreconditionViolation("ledger".into()).is_fatal());
        assert!(Error::TimestampRegression {
            commit_id: "c".into(),
            timestamp: 1,
            last: 2
        }
        .is_fatal());
        assert!(Error::SignalTimeout {
            path: "training_status.txt".into(),
            waited_secs: 60
        }
        .is_fatal());
    }

    #[test]
    fn test_suggested_action() {
        assert_eq!(
            Error::InsufficientTrainingData("x".into()).suggested_action(),
            SuggestedAction::Skip
        );
        assert_eq!(
            Error::DuplicateCommit {
                commit_id: "c".into()
            }
            .suggested_action(),
            SuggestedAction::FixInput
        );
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = Error::TimestampRegression {
            commit_id: "c42".into(),
            timestamp: 1500,
            last: 1600,
        };
        let structured = StructuredError::from(&err);

        assert_eq!(structured.code, 21);
        assert_eq!(structured.category, ErrorCategory::Precondition);
        assert!(!structured.recoverable);
        assert_eq!(
            structured.context.get("commit_id"),
            Some(&serde_json::json!("c42"))
        );
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::CalibrationDegenerate {
            positives: 0,
            negatives: 12,
        };
        let json = StructuredError::from(&err).to_json();

        assert!(json.contains(r#""code":50"#));
        assert!(json.contains(r#""category":"calibration""#));
        assert!(json.contains(r#""suggested_action":"skip""#));
    }

    #[test]
    fn test_format_error_human() {
        let err = Error::DuplicateCommit {
            commit_id: "deadbeef".into(),
        };
        let formatted = format_error_human(&err, false);

        assert!(formatted.contains("Duplicate Commit"));
        assert!(formatted.contains("deadbeef"));
        assert!(formatted.contains("Deduplicate"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Precondition.to_string(), "precondition");
        assert_eq!(ErrorCategory::Collaborator.to_string(), "collaborator");
    }
}
