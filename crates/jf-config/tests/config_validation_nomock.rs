//! No-mock configuration validation + resolution tests.
//!
//! Covers:
//! - Validation of real JSON files written to disk
//! - Resolution order (CLI > env > config dir > defaults)
//! - Snapshot provenance

use jf_config::resolve::{resolve_config, ConfigSource, CONFIG_FILENAME};
use jf_config::validate::{validate_config, ValidationError};
use jf_config::{ConfigSnapshot, SimulationConfig, VerificationMode};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const ENV_KEYS: &[&str] = &["JITFLOW_CONFIG", "JITFLOW_CONFIG_DIR", "XDG_CONFIG_HOME"];

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|k| env::var(k).ok()).collect();
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, val) in self.keys.iter().zip(&self.saved) {
            match val {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write_config(dir: &Path, json: &str) -> std::path::PathBuf {
    fs::create_dir_all(dir).expect("create config dir");
    let path = dir.join(CONFIG_FILENAME);
    fs::write(&path, json).expect("write config");
    path
}

#[test]
fn test_valid_file_loads_and_validates() {
    let temp = TempDir::new().expect("temp dir");
    let path = write_config(
        temp.path(),
        r#"{
            "schema_version": "1.0.0",
            "window": {"step": 25, "train_from_scratch": false},
            "verification": {"mode": "real", "waiting_time_days": 30},
            "evaluation": {"decay_factor": 0.95}
        }"#,
    );
    let config = SimulationConfig::from_file(&path).expect("load config");
    validate_config(&config).expect("valid config");
    assert_eq!(config.window.step, 25);
    assert!(!config.window.train_from_scratch);
    assert_eq!(config.verification.mode, VerificationMode::Real);
    assert_eq!(config.verification.window_seconds(), 30 * 86_400);
}

#[test]
fn test_rejects_bad_decay() {
    let config = SimulationConfig::from_json(r#"{"evaluation": {"decay_factor": 0.0}}"#).unwrap();
    let err = validate_config(&config).expect_err("zero decay must fail");
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "evaluation.decay_factor"));
}

#[test]
fn test_rejects_zero_step() {
    let config = SimulationConfig::from_json(r#"{"window": {"step": 0}}"#).unwrap();
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn test_rejects_inverted_slice() {
    let config = SimulationConfig::from_json(r#"{"window": {"start": 10, "end": 10}}"#).unwrap();
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::SemanticError(_))
    ));
}

#[test]
fn test_rejects_version_mismatch() {
    let config = SimulationConfig::from_json(r#"{"schema_version": "0.9.0"}"#).unwrap();
    assert!(matches!(
        validate_config(&config),
        Err(ValidationError::VersionMismatch { .. })
    ));
}

#[test]
fn test_rejects_unknown_mode() {
    let err = SimulationConfig::from_json(r#"{"verification": {"mode": "psychic"}}"#).unwrap_err();
    assert!(matches!(err, ValidationError::ParseError(_)));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = SimulationConfig::from_file(Path::new("/nonexistent/jitflow.json")).unwrap_err();
    assert!(matches!(err, ValidationError::IoError(_)));
}

#[test]
fn test_resolve_cli_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let cli = write_config(&temp.path().join("cli"), "{}");
        let env_path = write_config(&temp.path().join("env"), "{}");
        env::set_var("JITFLOW_CONFIG", env_path.display().to_string());

        let resolved = resolve_config(Some(&cli));
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert_eq!(resolved.path.unwrap(), cli);
    });
}

#[test]
fn test_resolve_env_over_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let env_path = write_config(&temp.path().join("env"), "{}");
        let dir = temp.path().join("dir");
        write_config(&dir, "{}");
        env::set_var("JITFLOW_CONFIG", env_path.display().to_string());
        env::set_var("JITFLOW_CONFIG_DIR", dir.display().to_string());

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.unwrap(), env_path);
    });
}

#[test]
fn test_resolve_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        env::remove_var("JITFLOW_CONFIG");
        let temp = TempDir::new().expect("temp dir");
        let dir = temp.path().join("dir");
        let path = write_config(&dir, "{}");
        env::set_var("JITFLOW_CONFIG_DIR", dir.display().to_string());

        let resolved = resolve_config(None);
        assert_eq!(resolved.source, ConfigSource::Environment);
        assert_eq!(resolved.path.unwrap(), path);
    });
}

#[test]
fn test_snapshot_hashes_file_content() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(ENV_KEYS);
        let temp = TempDir::new().expect("temp dir");
        let raw = r#"{"window": {"step": 10}}"#;
        let path = write_config(temp.path(), raw);
        let resolved = resolve_config(Some(&path));
        let config = SimulationConfig::from_file(&path).unwrap();

        let snapshot = ConfigSnapshot::new(&config, &resolved, Some(raw));
        assert_eq!(snapshot.file_hash.as_deref().map(str::len), Some(64));
        assert_eq!(snapshot.source, "CLI argument");
        assert_eq!(snapshot.summary.step, 10);
        assert!(!snapshot.matches(&ConfigSnapshot::defaults_only()));
    });
}
