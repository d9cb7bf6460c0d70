//! Configuration validation errors and semantic validation.

use thiserror::Error;

use crate::simulation::SimulationConfig;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

fn invalid(field: &str, message: String) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        message,
    }
}

fn check_unit_interval(field: &str, value: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(field, format!("Must be in [0, 1], got {}", value)));
    }
    Ok(())
}

/// Validate a simulation configuration semantically.
pub fn validate_config(config: &SimulationConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.window.step == 0 {
        return Err(invalid("window.step", "Must be positive, got 0".to_string()));
    }
    if let (Some(start), Some(end)) = (config.window.start, config.window.end) {
        if start >= end {
            return Err(ValidationError::SemanticError(format!(
                "window.start ({}) must be before window.end ({})",
                start, end
            )));
        }
    }

    let days = config.verification.waiting_time_days;
    if !days.is_finite() || days < 0.0 {
        return Err(invalid(
            "verification.waiting_time_days",
            format!("Must be a non-negative number of days, got {}", days),
        ));
    }

    check_unit_interval("threshold.initial", config.threshold.initial)?;
    check_unit_interval("threshold.target_quantile", config.threshold.target_quantile)?;
    if config.threshold.adjust_on_test && config.threshold.calibration_window == 0 {
        return Err(invalid(
            "threshold.calibration_window",
            "Must be positive when adjust_on_test is enabled".to_string(),
        ));
    }

    let fraction = config.split.train_fraction;
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(invalid(
            "split.train_fraction",
            format!("Must be in (0, 1), got {}", fraction),
        ));
    }

    let decay = config.evaluation.decay_factor;
    if !(decay > 0.0 && decay <= 1.0) {
        return Err(invalid(
            "evaluation.decay_factor",
            format!("Must be in (0, 1], got {}", decay),
        ));
    }

    validate_trainer(&config.trainer)?;

    Ok(())
}

fn validate_trainer(trainer: &crate::simulation::TrainerConfig) -> ValidationResult<()> {
    if trainer.program.trim().is_empty() {
        return Err(invalid("trainer.program", "Must not be empty".to_string()));
    }
    if trainer.command_timeout_secs == 0 {
        return Err(invalid(
            "trainer.command_timeout_secs",
            "Must be positive, got 0".to_string(),
        ));
    }
    if trainer.status_max_polls == 0 {
        return Err(invalid(
            "trainer.status_max_polls",
            "Must be positive, got 0".to_string(),
        ));
    }

    for arg in &trainer.args {
        for name in placeholders(arg) {
            let known = crate::simulation::TrainerConfig::PLACEHOLDERS.contains(&name)
                || trainer.params.contains_key(name);
            if !known {
                return Err(invalid(
                    "trainer.args",
                    format!("Unknown placeholder {{{}}} in '{}'", name, arg),
                ));
            }
        }
    }

    Ok(())
}

/// `{name}` placeholders appearing in a template argument.
pub fn placeholders(arg: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = arg;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                names.push(&after[..close]);
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate_config(&SimulationConfig::default()).unwrap();
    }

    #[test]
    fn placeholders_are_extracted() {
        assert_eq!(placeholders("--{action}"), vec!["action"]);
        assert_eq!(placeholders("{train},{valid}"), vec!["train", "valid"]);
        assert!(placeholders("plain").is_empty());
        assert!(placeholders("{unterminated").is_empty());
    }

    #[test]
    fn unknown_placeholder_rejected_unless_param() {
        let mut config = SimulationConfig::default();
        config.trainer.args.push("--l0={l0}".into());
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "trainer.args"));

        config.trainer.params.insert("l0".into(), "10".into());
        validate_config(&config).unwrap();
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ValidationError::ParseError("x".into()).code(), 61);
        assert_eq!(
            ValidationError::InvalidValue {
                field: "f".into(),
                message: "m".into()
            }
            .code(),
            65
        );
    }
}
