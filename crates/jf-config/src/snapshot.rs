//! Configuration snapshots for run reports and reproducibility.
//!
//! A snapshot captures the exact configuration state at the start of a run,
//! so a report can be traced back to the settings that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::resolve::ConfigPath;
use crate::simulation::SimulationConfig;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// SHA-256 of the config file content, when a file was loaded.
    #[serde(default)]
    pub file_hash: Option<String>,

    /// Path the config was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the configuration.
    pub source: String,

    /// SHA-256 of the effective configuration (defaults applied).
    pub effective_hash: String,

    /// Key configuration values for quick reference.
    pub summary: ConfigSummary,
}

/// Summary of key configuration values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub step: usize,
    pub train_from_scratch: bool,
    pub verification_mode: String,
    pub waiting_time_days: f64,
    pub initial_threshold: f64,
    pub adjust_on_test: bool,
    pub target_quantile: f64,
    pub decay_factor: f64,
    pub eval_metric: String,
}

impl ConfigSnapshot {
    /// Create a new snapshot from loaded configuration.
    pub fn new(config: &SimulationConfig, path: &ConfigPath, raw_json: Option<&str>) -> Self {
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: config.schema_version.clone(),
            file_hash: raw_json.map(hash_content),
            path: path.path.as_ref().map(|p| p.display().to_string()),
            source: path.source.to_string(),
            effective_hash: effective_hash(config),
            summary: ConfigSummary::from(config),
        }
    }

    /// Create a snapshot of the built-in defaults.
    pub fn defaults_only() -> Self {
        Self::new(&SimulationConfig::default(), &ConfigPath::default(), None)
    }

    /// Serialize snapshot to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize snapshot from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check if this snapshot matches another (same effective config).
    pub fn matches(&self, other: &ConfigSnapshot) -> bool {
        self.effective_hash == other.effective_hash
    }

    /// Get a short identifier for this snapshot (first 12 chars of hash).
    pub fn short_id(&self) -> &str {
        &self.effective_hash[..12.min(self.effective_hash.len())]
    }
}

impl From<&SimulationConfig> for ConfigSummary {
    fn from(config: &SimulationConfig) -> Self {
        ConfigSummary {
            step: config.window.step,
            train_from_scratch: config.window.train_from_scratch,
            verification_mode: config.verification.mode.to_string(),
            waiting_time_days: config.verification.waiting_time_days,
            initial_threshold: config.threshold.initial,
            adjust_on_test: config.threshold.adjust_on_test,
            target_quantile: config.threshold.target_quantile,
            decay_factor: config.evaluation.decay_factor,
            eval_metric: config.trainer.eval_metric.to_string(),
        }
    }
}

fn effective_hash(config: &SimulationConfig) -> String {
    match serde_json::to_string(config) {
        Ok(json) => hash_content(&json),
        Err(_) => hash_content("unserializable"),
    }
}

/// Hash content with SHA-256 and return hex string.
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_snapshot() {
        let snapshot = ConfigSnapshot::defaults_only();
        assert_eq!(snapshot.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert!(snapshot.file_hash.is_none());
        assert_eq!(snapshot.source, "builtin default");
        assert_eq!(snapshot.summary.step, 50);
    }

    #[test]
    fn test_snapshot_short_id() {
        assert_eq!(ConfigSnapshot::defaults_only().short_id().len(), 12);
    }

    #[test]
    fn test_snapshot_tracks_effective_config() {
        let s1 = ConfigSnapshot::defaults_only();
        let s2 = ConfigSnapshot::defaults_only();
        assert!(s1.matches(&s2));

        let mut changed = SimulationConfig::default();
        changed.window.step = 7;
        let s3 = ConfigSnapshot::new(&changed, &ConfigPath::default(), None);
        assert!(!s1.matches(&s3));
    }

    #[test]
    fn test_hash_content() {
        let hash = hash_content("test");
        assert_eq!(hash, hash_content("test"));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_snapshot_json_roundtrip() {
        let snapshot = ConfigSnapshot::defaults_only();
        let restored = ConfigSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert!(snapshot.matches(&restored));
    }
}
