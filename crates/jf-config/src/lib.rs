//! jitflow configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for the simulation config (`jitflow.json`)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation
//! - Config snapshots embedded in run reports
//! - The real-latency project preset

pub mod preset;
pub mod resolve;
pub mod simulation;
pub mod snapshot;
pub mod validate;

pub use resolve::{resolve_config, ConfigPath, ConfigSource};
pub use simulation::{
    ArtifactsConfig, EvalMetric, EvaluationConfig, SimulationConfig, SplitConfig,
    ThresholdConfig, TrainerConfig, VerificationConfig, VerificationMode, WindowConfig,
};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_config, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
