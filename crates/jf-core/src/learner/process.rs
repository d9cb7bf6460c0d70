//! External-process learner.
//!
//! Each train or test call writes its slices as JSON under
//! `<model_dir>/data/`, runs the configured command with the argument
//! template filled in, and waits for it under a hard timeout. The child's
//! output goes to `<model_dir>/learner.log`.
//!
//! Training reports whether the model changed through a side file,
//! `training_status.txt`, whose content is `changed` when it did. Testing
//! reads `predictions.json` (and `results.json`, if present) and removes
//! them afterwards.

use super::{Learner, TestOutput, TrainOutcome, TrainRequest};
use crate::artifacts::write_json_atomic;
use crate::logging::event_names;
use crate::verify::LabeledChange;
use jf_common::{ChangeRecord, Error, Prediction, Result};
use jf_config::TrainerConfig;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const STATUS_FILE: &str = "training_status.txt";
pub const PREDICTIONS_FILE: &str = "predictions.json";
pub const RESULTS_FILE: &str = "results.json";
pub const LOG_FILE: &str = "learner.log";
const DATA_DIR: &str = "data";
const STATUS_CHANGED: &str = "changed";

#[derive(Debug, thiserror::Error)]
pub enum LearnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("learner timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("learner exited with code {code}: {log_tail}")]
    Exited { code: i32, log_tail: String },

    #[error("learner produced no {}", .path.display())]
    MissingOutput { path: PathBuf },

    #[error("malformed learner output {}: {reason}", .path.display())]
    MalformedOutput { path: PathBuf, reason: String },

    #[error("{} never appeared after {waited_secs}s", .path.display())]
    StatusTimeout { path: PathBuf, waited_secs: u64 },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<LearnerError> for Error {
    fn from(err: LearnerError) -> Self {
        match err {
            LearnerError::Timeout { seconds } => Error::CollaboratorTimeout { seconds },
            LearnerError::StatusTimeout { path, waited_secs } => Error::SignalTimeout {
                path: path.display().to_string(),
                waited_secs,
            },
            other => Error::ExternalCollaborator(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Train,
    ResumeTraining,
    Test,
}

impl Action {
    fn as_str(&self) -> &'static str {
        match self {
            Action::Train => "do_train",
            Action::ResumeTraining => "do_resume_training",
            Action::Test => "do_test",
        }
    }
}

/// Learner backed by an external training program.
#[derive(Debug, Clone)]
pub struct ProcessLearner {
    config: TrainerConfig,
    model_dir: PathBuf,
    working_dir: PathBuf,
}

impl ProcessLearner {
    /// `default_model_dir` is used unless the config names one.
    pub fn new(config: TrainerConfig, default_model_dir: impl Into<PathBuf>) -> Self {
        let model_dir = config
            .model_dir
            .clone()
            .unwrap_or_else(|| default_model_dir.into());
        let working_dir = config
            .working_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            config,
            model_dir,
            working_dir,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Best checkpoint written by the trainer.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.model_dir
            .join(format!("checkpoint-best-{}", self.config.eval_metric))
            .join("model.bin")
    }

    fn data_path(&self, name: &str) -> PathBuf {
        self.model_dir.join(DATA_DIR).join(format!("{name}.json"))
    }

    fn render_args(&self, action: Action, threshold: f64) -> Vec<String> {
        let mut values: BTreeMap<&str, String> = self
            .config
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        values.insert("action", action.as_str().to_string());
        values.insert("train", self.data_path("train").display().to_string());
        values.insert("valid", self.data_path("valid").display().to_string());
        values.insert("test", self.data_path("test").display().to_string());
        values.insert("model_dir", self.model_dir.display().to_string());
        values.insert("threshold", threshold.to_string());
        values.insert("seed", self.config.seed.to_string());
        values.insert("eval_metric", self.config.eval_metric.to_string());

        self.config
            .args
            .iter()
            .map(|arg| substitute(arg, &values))
            .collect()
    }

    /// Run the command once, killing it past the configured timeout.
    fn run(&self, action: Action, threshold: f64) -> std::result::Result<Duration, LearnerError> {
        std::fs::create_dir_all(&self.model_dir).map_err(|e| io_err(&self.model_dir, e))?;
        let log_path = self.model_dir.join(LOG_FILE);
        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| io_err(&log_path, e))?;
        let log_err = log.try_clone().map_err(|e| io_err(&log_path, e))?;

        let args = self.render_args(action, threshold);
        tracing::info!(
            target: event_names::LEARNER_INVOKED,
            program = %self.config.program,
            action = action.as_str(),
            threshold,
            "invoking learner"
        );

        let start = Instant::now();
        let mut child = Command::new(&self.config.program)
            .args(&args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|e| LearnerError::Spawn {
                program: self.config.program.clone(),
                source: e,
            })?;

        let timeout = Duration::from_secs(self.config.command_timeout_secs);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() > timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(LearnerError::Timeout {
                            seconds: self.config.command_timeout_secs,
                        });
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => return Err(io_err(&log_path, e)),
            }
        };

        if !status.success() {
            return Err(LearnerError::Exited {
                code: status.code().unwrap_or(-1),
                log_tail: log_tail(&log_path, 500),
            });
        }
        Ok(start.elapsed())
    }

    /// Poll for the training status signal.
    fn wait_for_status(&self) -> std::result::Result<bool, LearnerError> {
        let path = self.model_dir.join(STATUS_FILE);
        let interval = Duration::from_millis(self.config.status_poll_interval_ms);
        let max_polls = self.config.status_max_polls;

        for attempt in 0..=max_polls {
            match std::fs::read_to_string(&path) {
                Ok(content) => return Ok(content.trim() == STATUS_CHANGED),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_err(&path, e)),
            }
            if attempt == max_polls {
                break;
            }
            tracing::info!(
                target: event_names::LEARNER_STATUS_WAIT,
                path = %path.display(),
                attempt = attempt + 1,
                max_polls,
                "waiting for training status"
            );
            std::thread::sleep(interval);
        }

        Err(LearnerError::StatusTimeout {
            path,
            waited_secs: (interval * max_polls).as_secs(),
        })
    }

    fn read_predictions(
        &self,
        window: &[ChangeRecord],
    ) -> std::result::Result<Vec<Prediction>, LearnerError> {
        let path = self.model_dir.join(PREDICTIONS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LearnerError::MissingOutput { path });
            }
            Err(e) => return Err(io_err(&path, e)),
        };
        let file: PredictionsFile =
            serde_json::from_str(&content).map_err(|e| LearnerError::MalformedOutput {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if file.pred_label.len() != window.len() || file.pred_prob.len() != window.len() {
            return Err(LearnerError::MalformedOutput {
                path,
                reason: format!(
                    "expected {} predictions, got {} labels and {} scores",
                    window.len(),
                    file.pred_label.len(),
                    file.pred_prob.len()
                ),
            });
        }

        Ok(window
            .iter()
            .zip(file.pred_label.iter().zip(&file.pred_prob))
            .map(|(record, (label, prob))| Prediction::new(record.ground_truth(), flag(label), *prob))
            .collect())
    }

    fn read_results(&self) -> std::result::Result<Option<Value>, LearnerError> {
        let path = self.model_dir.join(RESULTS_FILE);
        match std::fs::read_to_string(&path) {
            Ok(c) => serde_json::from_str(&c)
                .map(Some)
                .map_err(|e| LearnerError::MalformedOutput {
                    path,
                    reason: e.to_string(),
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

impl Learner for ProcessLearner {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainOutcome> {
        remove_if_exists(&self.model_dir.join(STATUS_FILE))?;
        write_json_atomic(&self.data_path("train"), &labeled_records(request.train))?;
        write_json_atomic(&self.data_path("valid"), &labeled_records(request.valid))?;

        let action = if self.has_model() {
            Action::ResumeTraining
        } else {
            Action::Train
        };
        let elapsed = self.run(action, request.threshold)?;
        let changed = self.wait_for_status()?;
        tracing::debug!(
            target: event_names::LEARNER_INVOKED,
            window = request.window,
            action = action.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            model_changed = changed,
            "training finished"
        );
        Ok(TrainOutcome {
            model_changed: changed,
        })
    }

    fn test(&mut self, window: &[ChangeRecord], threshold: f64) -> Result<TestOutput> {
        let predictions_path = self.model_dir.join(PREDICTIONS_FILE);
        let results_path = self.model_dir.join(RESULTS_FILE);
        remove_if_exists(&predictions_path)?;
        remove_if_exists(&results_path)?;
        write_json_atomic(&self.data_path("test"), window)?;

        self.run(Action::Test, threshold)?;
        let predictions = self.read_predictions(window)?;
        let metrics = self.read_results()?;

        remove_if_exists(&predictions_path)?;
        remove_if_exists(&results_path)?;
        Ok(TestOutput {
            predictions,
            metrics,
        })
    }

    fn has_model(&self) -> bool {
        self.checkpoint_path().exists()
    }
}

/// Columns as the learner writes them; labels may be booleans or 0/1.
#[derive(Debug, Deserialize)]
struct PredictionsFile {
    pred_label: Vec<Value>,
    pred_prob: Vec<f64>,
}

fn flag(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0),
        _ => false,
    }
}

fn labeled_records(slice: &[LabeledChange]) -> Vec<ChangeRecord> {
    slice
        .iter()
        .map(|c| {
            let mut record = c.record.clone();
            record.is_buggy = Some(c.label);
            record
        })
        .collect()
}

/// Replace known `{name}` placeholders; unknown ones are left as written.
fn substitute(arg: &str, values: &BTreeMap<&str, String>) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut rest = arg;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn remove_if_exists(path: &Path) -> std::result::Result<(), LearnerError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_err(path, e)),
    }
}

fn log_tail(path: &Path, max_chars: usize) -> String {
    let content = std::fs::read_to_string(path).unwrap_or_default();
    let skip = content.chars().count().saturating_sub(max_chars);
    content.chars().skip(skip).collect::<String>().trim().to_string()
}

fn io_err(path: &Path, source: std::io::Error) -> LearnerError {
    LearnerError::Io {
        path: path.to_path_buf(),
        source,
    }
}
