//! Simulation configuration types.
//!
//! Every section defaults, so `{}` is a complete configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::validate::{ValidationError, ValidationResult};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Top-level simulation configuration (`jitflow.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub verification: VerificationConfig,

    #[serde(default)]
    pub threshold: ThresholdConfig,

    #[serde(default)]
    pub trainer: TrainerConfig,

    #[serde(default)]
    pub split: SplitConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

fn default_schema_version() -> String {
    crate::CONFIG_SCHEMA_VERSION.to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            window: WindowConfig::default(),
            verification: VerificationConfig::default(),
            threshold: ThresholdConfig::default(),
            trainer: TrainerConfig::default(),
            split: SplitConfig::default(),
            evaluation: EvaluationConfig::default(),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &Path) -> ValidationResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ValidationError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> ValidationResult<Self> {
        serde_json::from_str(json).map_err(|e| ValidationError::ParseError(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Stream slicing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Records per window.
    pub step: usize,

    /// Replay the whole history each window (cumulative) instead of only the
    /// window itself (sliding).
    pub train_from_scratch: bool,

    /// First stream position to simulate.
    pub start: Option<usize>,

    /// One past the last stream position to simulate.
    pub end: Option<usize>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            step: 50,
            train_from_scratch: true,
            start: None,
            end: None,
        }
    }
}

/// Label-latency mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Stream labels are final; clean changes wait out the verification window.
    Simple,
    /// Buggy labels are staged until a fix confirms them.
    Real,
    /// Real for projects in the real-latency preset, simple otherwise.
    #[default]
    Auto,
}

impl std::fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerificationMode::Simple => write!(f, "simple"),
            VerificationMode::Real => write!(f, "real"),
            VerificationMode::Auto => write!(f, "auto"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    pub mode: VerificationMode,

    /// Verification window W, in days.
    pub waiting_time_days: f64,

    /// Overrides the built-in real-latency project list when set.
    pub real_latency_projects: Option<Vec<String>>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::Auto,
            waiting_time_days: 90.0,
            real_latency_projects: None,
        }
    }
}

impl VerificationConfig {
    /// Verification window in seconds.
    pub fn window_seconds(&self) -> i64 {
        (self.waiting_time_days * SECONDS_PER_DAY).round() as i64
    }

    /// Whether `project` runs in real-latency mode.
    pub fn is_real_latency(&self, project: &str) -> bool {
        match self.mode {
            VerificationMode::Simple => false,
            VerificationMode::Real => true,
            VerificationMode::Auto => match &self.real_latency_projects {
                Some(list) => list.iter().any(|p| p == project),
                None => crate::preset::is_real_latency_project(project),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Decision threshold before any calibration.
    pub initial: f64,

    /// Recalibrate from the tail of each test window before testing.
    pub adjust_on_test: bool,

    /// Quantile used by test-time calibration.
    pub target_quantile: f64,

    /// Trailing records used for test-time calibration.
    pub calibration_window: usize,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            initial: 0.5,
            adjust_on_test: false,
            target_quantile: 0.5,
            calibration_window: 100,
        }
    }
}

/// Metric the external trainer selects checkpoints by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalMetric {
    #[default]
    F1,
    Gmean,
}

impl EvalMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalMetric::F1 => "f1",
            EvalMetric::Gmean => "gmean",
        }
    }
}

impl std::fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External trainer/tester command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub program: String,

    /// Argument template; see [`TrainerConfig::PLACEHOLDERS`].
    pub args: Vec<String>,

    /// Model directory; defaults to `<artifacts.dir>/<project>/model`.
    pub model_dir: Option<PathBuf>,

    pub working_dir: Option<PathBuf>,

    pub eval_metric: EvalMetric,

    pub seed: u64,

    /// Hard limit for a single train or test invocation.
    pub command_timeout_secs: u64,

    pub status_poll_interval_ms: u64,

    /// Polls of `training_status.txt` before giving up.
    pub status_max_polls: u32,

    /// Extra `{name}` placeholders substituted into `args`.
    pub params: BTreeMap<String, String>,
}

impl TrainerConfig {
    /// Placeholders always available in `args`.
    pub const PLACEHOLDERS: &'static [&'static str] = &[
        "action",
        "train",
        "valid",
        "test",
        "model_dir",
        "threshold",
        "seed",
        "eval_metric",
    ];
}

impl Default for TrainerConfig {
    fn default() -> Self {
        let args = [
            "run_learner.py",
            "--{action}",
            "--train_data_file",
            "{train}",
            "--eval_data_file",
            "{valid}",
            "--test_data_file",
            "{test}",
            "--output_dir",
            "{model_dir}",
            "--threshold",
            "{threshold}",
            "--seed",
            "{seed}",
            "--eval_metric",
            "{eval_metric}",
        ];
        Self {
            program: "python".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            model_dir: None,
            working_dir: None,
            eval_metric: EvalMetric::F1,
            seed: 33,
            command_timeout_secs: 24 * 60 * 60,
            status_poll_interval_ms: 5_000,
            status_max_polls: 120,
            params: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_fraction: f64,

    /// Allow a validation set without positives.
    pub eval_with_all_negative: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.9,
            eval_with_all_negative: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub decay_factor: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self { decay_factor: 0.99 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,

    /// Persist train/valid/test slices per window, not just predictions.
    pub persist_slices: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("jitflow-artifacts"),
            persist_slices: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_full_default() {
        let config = SimulationConfig::from_json("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.window.step, 50);
        assert_eq!(config.trainer.seed, 33);
        assert_eq!(config.evaluation.decay_factor, 0.99);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config =
            SimulationConfig::from_json(r#"{"window": {"step": 5}, "threshold": {"adjust_on_test": true}}"#)
                .unwrap();
        assert_eq!(config.window.step, 5);
        assert!(config.window.train_from_scratch);
        assert!(config.threshold.adjust_on_test);
        assert_eq!(config.threshold.target_quantile, 0.5);
    }

    #[test]
    fn window_seconds_from_days() {
        let v = VerificationConfig::default();
        assert_eq!(v.window_seconds(), 90 * 86_400);
        let half = VerificationConfig {
            waiting_time_days: 0.5,
            ..Default::default()
        };
        assert_eq!(half.window_seconds(), 43_200);
    }

    #[test]
    fn auto_mode_uses_preset_or_override() {
        let v = VerificationConfig::default();
        assert!(v.is_real_latency("commons-lang"));
        assert!(!v.is_real_latency("jackrabbit"));

        let custom = VerificationConfig {
            real_latency_projects: Some(vec!["mine".into()]),
            ..Default::default()
        };
        assert!(custom.is_real_latency("mine"));
        assert!(!custom.is_real_latency("commons-lang"));

        let forced = VerificationConfig {
            mode: VerificationMode::Simple,
            ..Default::default()
        };
        assert!(!forced.is_real_latency("commons-lang"));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = SimulationConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ValidationError::ParseError(_)));
    }
}
