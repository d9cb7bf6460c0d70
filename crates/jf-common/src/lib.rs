//! jitflow common types, identities, and errors.
//!
//! This crate provides foundational types shared across the jf-* crates:
//! - Commit identity and the change record schema of the raw stream
//! - Per-record predictions and the flattened prediction stream
//! - The unified error taxonomy
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod prediction;
pub mod record;

pub use error::{Error, ErrorCategory, Result, StructuredError, SuggestedAction};
pub use id::CommitId;
pub use output::OutputFormat;
pub use prediction::{Prediction, PredictionStream};
pub use record::{ChangeRecord, FixLinkage};

/// Schema version for serialized reports and artifacts.
pub const SCHEMA_VERSION: &str = "1.0.0";
