//! Configuration loading and validation for jf-core.
//!
//! This module handles:
//! - Loading `jitflow.json` with the standard resolution order
//! - Semantic validation via jf-config
//! - The config snapshot embedded in run reports

pub use jf_config::{
    ConfigSnapshot, ConfigSource, SimulationConfig, ValidationError, VerificationMode,
};

use jf_config::{resolve_config, validate_config, ConfigPath};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl From<ConfigError> for jf_common::Error {
    fn from(err: ConfigError) -> Self {
        jf_common::Error::Config(err.to_string())
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: SimulationConfig,
    /// Path the config came from (None for built-in defaults).
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
    pub snapshot: ConfigSnapshot,
}

/// Load configuration with the standard resolution order.
///
/// An explicit `cli_path` that does not exist is an error rather than a
/// silent fall-through to defaults.
pub fn load_config(cli_path: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    if let Some(path) = cli_path {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
    }

    let resolved = resolve_config(cli_path);
    let (config, raw) = match &resolved.path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
                path: path.clone(),
                source,
            })?;
            let config: SimulationConfig =
                serde_json::from_str(&raw).map_err(|source| ConfigError::ParseError {
                    path: path.clone(),
                    source,
                })?;
            (config, Some(raw))
        }
        None => (SimulationConfig::default(), None),
    };

    validate_config(&config)?;
    Ok(finish(config, resolved, raw.as_deref()))
}

/// Wrap an in-memory configuration (used by tests and library callers).
pub fn from_config(config: SimulationConfig) -> Result<ResolvedConfig, ConfigError> {
    validate_config(&config)?;
    Ok(finish(config, ConfigPath::default(), None))
}

fn finish(config: SimulationConfig, resolved: ConfigPath, raw: Option<&str>) -> ResolvedConfig {
    let snapshot = ConfigSnapshot::new(&config, &resolved, raw);
    ResolvedConfig {
        config,
        path: resolved.path,
        source: resolved.source,
        snapshot,
    }
}
