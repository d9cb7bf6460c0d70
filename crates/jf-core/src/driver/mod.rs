//! Windowed online driver.
//!
//! The stream is cut into consecutive windows of `step` records. Each
//! window is scored first with whatever model exists, and only then fed
//! through the verifier and (maybe) used for training. Window `k` is
//! therefore always scored by a model trained on windows before `k`.
//!
//! The driver is an explicit state machine: [`OnlineDriver::step`] takes a
//! [`SimulationState`] and returns the next one; [`OnlineDriver::run`]
//! loops until the stream is exhausted and builds the [`RunReport`].

mod report;

pub use report::RunReport;

use crate::artifacts::{ArtifactKey, ArtifactKind, ArtifactStore};
use crate::calibrate::{analyze_results, calculate_th_from_test, tail};
use crate::learner::{Learner, TrainRequest};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::prequential::calculate_prequential_mean_and_std;
use crate::split::split_training_pool;
use crate::stream::ChangeStream;
use crate::verify::{self, VerifierMode, VerifierState};
use jf_common::{ChangeRecord, Error, Prediction, PredictionStream, Result};
use jf_config::{ConfigPath, ConfigSnapshot, SimulationConfig};
use serde::{Deserialize, Serialize};

/// What happened to the training step of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainStatus {
    /// Pool lacked one of the two classes.
    SkippedInvalidPool,
    /// Split left nothing to train on.
    SkippedInsufficientData,
    /// Learner failed; pool kept for the next window.
    Failed,
    /// Learner ran; see `model_changed`.
    Trained,
}

/// Per-window record kept in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub index: u64,
    pub start: usize,
    pub end: usize,
    /// Threshold the window was scored with.
    pub threshold: f64,
    /// Scored by a model (false: fallback predictions).
    pub tested: bool,
    pub train_status: TrainStatus,
    pub model_changed: bool,
    /// Pool size when training was considered.
    pub pool_size: usize,
    pub pool_positives: usize,
    pub consumed: usize,
    pub last_timestamp: Option<i64>,
    /// A collaborator failed somewhere in this window.
    pub degraded: bool,
    /// Aggregate metrics reported by the learner for this window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learner_metrics: Option<serde_json::Value>,
}

/// Everything that changes while the simulation runs.
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub verifier: VerifierState,
    pub threshold: f64,
    /// First stream position not yet scored.
    pub cursor: usize,
    pub window: u64,
    pub predictions: PredictionStream,
    pub windows: Vec<WindowSummary>,
    pub degraded_windows: usize,
    pub done: bool,
}

impl SimulationState {
    pub fn new(verifier: VerifierState, threshold: f64, expected_len: usize) -> Self {
        Self {
            verifier,
            threshold,
            cursor: 0,
            window: 0,
            predictions: PredictionStream::with_capacity(expected_len),
            windows: Vec::new(),
            degraded_windows: 0,
            done: false,
        }
    }
}

struct TestedWindow {
    predictions: Vec<Prediction>,
    tested: bool,
    degraded: bool,
    metrics: Option<serde_json::Value>,
}

/// Runs the simulation for one project.
pub struct OnlineDriver<L, S> {
    config: SimulationConfig,
    learner: L,
    store: S,
    ctx: LogContext,
    mode: VerifierMode,
    snapshot: ConfigSnapshot,
}

impl<L: Learner, S: ArtifactStore> OnlineDriver<L, S> {
    pub fn new(config: SimulationConfig, learner: L, store: S, ctx: LogContext) -> Self {
        let mode = VerifierMode::for_project(&config.verification, &ctx.project);
        let snapshot = ConfigSnapshot::new(&config, &ConfigPath::default(), None);
        Self {
            config,
            learner,
            store,
            ctx,
            mode,
            snapshot,
        }
    }

    /// Attach the snapshot of the config as it was loaded.
    pub fn with_snapshot(mut self, snapshot: ConfigSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Override the verification mode picked from the config.
    pub fn with_mode(mut self, mode: VerifierMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> VerifierMode {
        self.mode
    }

    pub fn learner(&self) -> &L {
        &self.learner
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Initial state for `stream`.
    pub fn initial_state(&self, stream: &ChangeStream) -> SimulationState {
        let verifier = VerifierState::new(self.mode, self.config.verification.window_seconds());
        SimulationState::new(verifier, self.config.threshold.initial, stream.len())
    }

    /// Process one window. A finished state is returned unchanged.
    pub fn step(&mut self, stream: &ChangeStream, mut state: SimulationState) -> Result<SimulationState> {
        if state.done {
            return Ok(state);
        }
        if self.config.window.step == 0 {
            return Err(Error::Config("window step must be positive, got 0".to_string()));
        }
        let n = stream.len();
        if state.cursor >= n {
            self.finish(&mut state)?;
            return Ok(state);
        }

        let start = state.cursor;
        let end = (start + self.config.window.step).min(n);
        let index = state.window;
        let test_slice = stream.slice(start..end);
        log_event!(
            self.ctx,
            DEBUG,
            event_names::WINDOW_STARTED,
            Stage::Test,
            format!("window {index} [{start}, {end})"),
            window = index,
            start = start,
            end = end
        );

        // Score before anything learns from this window.
        let scored_with = state.threshold;
        let tested = self.test_window(test_slice, &mut state)?;
        if tested.predictions.len() != test_slice.len() {
            return Err(Error::PreconditionViolation(format!(
                "window {index}: {} predictions for {} records",
                tested.predictions.len(),
                test_slice.len()
            )));
        }
        self.persist(ArtifactKind::TestSlice, index, test_slice);
        self.persist(ArtifactKind::Predictions, index, &tested.predictions);

        // Verify the training slice ending at this window's end.
        let train_slice = if self.config.window.train_from_scratch {
            state.verifier.reset_for_replay();
            stream.slice(0..end)
        } else {
            test_slice
        };
        let last_timestamp = verify::prepare_train_data(train_slice, &mut state.verifier)?;

        let mut summary = WindowSummary {
            index,
            start,
            end,
            threshold: scored_with,
            tested: tested.tested,
            train_status: TrainStatus::SkippedInvalidPool,
            model_changed: false,
            pool_size: state.verifier.pool_len(),
            pool_positives: 0,
            consumed: 0,
            last_timestamp,
            degraded: tested.degraded,
            learner_metrics: tested.metrics,
        };
        self.train_window(&mut state, &mut summary)?;

        state.predictions.extend(tested.predictions);
        if summary.degraded {
            state.degraded_windows += 1;
        }
        state.windows.push(summary);
        state.cursor = end;
        state.window += 1;

        if state.cursor >= n {
            self.finish(&mut state)?;
        }
        Ok(state)
    }

    /// Run every window, then evaluate.
    pub fn run(&mut self, stream: &ChangeStream) -> Result<RunReport> {
        let mode = self.mode.to_string();
        log_event!(
            self.ctx,
            INFO,
            event_names::RUN_STARTED,
            Stage::Init,
            format!("simulating {} changes", stream.len()),
            records = stream.len(),
            step = self.config.window.step,
            mode = mode.as_str()
        );

        let mut state = self.initial_state(stream);
        while !state.done {
            state = self.step(stream, state)?;
        }

        let prequential = calculate_prequential_mean_and_std(
            &state.predictions,
            self.config.evaluation.decay_factor,
        )?;
        // single-class runs have no operating point
        let operating_point = analyze_results(&state.predictions).ok();

        let report = RunReport::new(
            &self.ctx,
            self.mode,
            self.snapshot.clone(),
            state,
            prequential,
            operating_point,
        );
        match serde_json::to_value(&report) {
            Ok(value) => {
                let key = ArtifactKey::new(&self.ctx.project, ArtifactKind::Report, report.windows.len() as u64);
                if let Err(e) = self.store.put(&key, &value) {
                    log_event!(self.ctx, WARN, event_names::ARTIFACT_WRITTEN, Stage::Evaluate, format!("report not persisted: {e}"));
                }
            }
            Err(e) => {
                log_event!(self.ctx, WARN, event_names::ARTIFACT_WRITTEN, Stage::Evaluate, format!("report not encoded: {e}"));
            }
        }

        log_event!(
            self.ctx,
            INFO,
            event_names::RUN_FINISHED,
            Stage::Evaluate,
            "simulation finished",
            windows = report.windows.len(),
            degraded_windows = report.degraded_windows,
            g_mean = report.prequential.g_mean.mean
        );
        Ok(report)
    }

    fn test_window(&mut self, window: &[ChangeRecord], state: &mut SimulationState) -> Result<TestedWindow> {
        if !self.learner.has_model() {
            log_event!(
                self.ctx,
                DEBUG,
                event_names::WINDOW_FALLBACK,
                Stage::Test,
                "no model yet, predicting negative",
                window = state.window
            );
            return Ok(fallback(window, false));
        }

        if self.config.threshold.adjust_on_test {
            self.recalibrate(window, state)?;
        }

        match self.learner.test(window, state.threshold) {
            Ok(out) if out.predictions.len() == window.len() => {
                let predictions = window
                    .iter()
                    .zip(out.predictions)
                    .map(|(record, p)| Prediction::new(record.ground_truth(), p.pred_label, p.pred_prob))
                    .collect();
                log_event!(
                    self.ctx,
                    DEBUG,
                    event_names::WINDOW_TESTED,
                    Stage::Test,
                    "window scored",
                    window = state.window,
                    threshold = state.threshold
                );
                Ok(TestedWindow {
                    predictions,
                    tested: true,
                    degraded: false,
                    metrics: out.metrics,
                })
            }
            Ok(out) => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::WINDOW_FALLBACK,
                    Stage::Test,
                    format!("learner returned {} predictions for {} records", out.predictions.len(), window.len()),
                    window = state.window
                );
                Ok(fallback(window, true))
            }
            Err(e) if e.is_recoverable() => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::WINDOW_FALLBACK,
                    Stage::Test,
                    format!("test failed: {e}"),
                    window = state.window,
                    code = e.code()
                );
                Ok(fallback(window, true))
            }
            Err(e) => Err(e),
        }
    }

    /// Move the threshold to the target quantile of the window's recent scores.
    fn recalibrate(&mut self, window: &[ChangeRecord], state: &mut SimulationState) -> Result<()> {
        let recent = tail(window, self.config.threshold.calibration_window);
        let probs: Vec<f64> = match self.learner.test(recent, state.threshold) {
            Ok(out) => out.predictions.iter().map(|p| p.pred_prob).collect(),
            Err(e) if e.is_recoverable() => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::THRESHOLD_ADJUSTED,
                    Stage::Calibrate,
                    format!("calibration scoring failed, keeping threshold: {e}"),
                    window = state.window
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Some(th) = calculate_th_from_test(&probs, self.config.threshold.target_quantile) {
            log_event!(
                self.ctx,
                INFO,
                event_names::THRESHOLD_ADJUSTED,
                Stage::Calibrate,
                format!("threshold {:.4} -> {:.4}", state.threshold, th),
                window = state.window,
                previous = state.threshold,
                threshold = th
            );
            state.threshold = th;
        }
        Ok(())
    }

    fn train_window(&mut self, state: &mut SimulationState, summary: &mut WindowSummary) -> Result<()> {
        let pool = state.verifier.pool_snapshot();
        summary.pool_positives = pool.iter().filter(|c| c.label).count();

        if !verify::is_valid_training_data(&pool) {
            log_event!(
                self.ctx,
                INFO,
                event_names::WINDOW_TRAIN_SKIPPED,
                Stage::Train,
                "training pool needs both classes",
                window = summary.index,
                pool = pool.len(),
                positives = summary.pool_positives
            );
            summary.train_status = TrainStatus::SkippedInvalidPool;
            return Ok(());
        }

        let split = split_training_pool(&pool, &self.config.split);
        if split.train.is_empty() {
            let err = Error::InsufficientTrainingData(format!("empty training split from a pool of {}", pool.len()));
            log_event!(
                self.ctx,
                INFO,
                event_names::WINDOW_TRAIN_SKIPPED,
                Stage::Train,
                err.to_string(),
                window = summary.index
            );
            summary.train_status = TrainStatus::SkippedInsufficientData;
            return Ok(());
        }
        self.persist(ArtifactKind::TrainSlice, summary.index, &split.train);
        self.persist(ArtifactKind::ValidSlice, summary.index, &split.valid);

        let request = TrainRequest {
            window: summary.index,
            train: &split.train,
            valid: &split.valid,
            threshold: state.threshold,
        };
        match self.learner.train(&request) {
            Ok(outcome) => {
                summary.train_status = TrainStatus::Trained;
                summary.model_changed = outcome.model_changed;
                if outcome.model_changed {
                    summary.consumed = state.verifier.consume_pool();
                }
                log_event!(
                    self.ctx,
                    INFO,
                    event_names::WINDOW_TRAINED,
                    Stage::Train,
                    if outcome.model_changed { "model updated" } else { "model unchanged, keeping pool" },
                    window = summary.index,
                    train = split.train.len(),
                    valid = split.valid.len(),
                    consumed = summary.consumed
                );
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::LEARNER_FAILED,
                    Stage::Train,
                    format!("training skipped: {e}"),
                    window = summary.index,
                    code = e.code()
                );
                summary.train_status = TrainStatus::Failed;
                summary.degraded = true;
                Ok(())
            }
            Err(e) => {
                log_event!(
                    self.ctx,
                    ERROR,
                    event_names::LEARNER_FAILED,
                    Stage::Train,
                    format!("training aborted the run: {e}"),
                    window = summary.index,
                    code = e.code()
                );
                Err(e)
            }
        }
    }

    fn finish(&mut self, state: &mut SimulationState) -> Result<()> {
        verify::drain(&mut state.verifier)?;
        state.done = true;
        Ok(())
    }

    /// Persist a per-window artifact; failures only cost the artifact.
    fn persist<T: Serialize + ?Sized>(&mut self, kind: ArtifactKind, window: u64, value: &T) {
        if !self.config.artifacts.persist_slices {
            return;
        }
        let key = ArtifactKey::new(&self.ctx.project, kind, window);
        let result = serde_json::to_value(value)
            .map_err(|e| e.to_string())
            .and_then(|v| self.store.put(&key, &v).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log_event!(
                self.ctx,
                WARN,
                event_names::ARTIFACT_WRITTEN,
                Stage::Verify,
                format!("{kind} artifact not persisted: {e}"),
                window = window
            );
        }
    }
}

fn fallback(window: &[ChangeRecord], degraded: bool) -> TestedWindow {
    TestedWindow {
        predictions: window
            .iter()
            .map(|r| Prediction::fallback(r.ground_truth()))
            .collect(),
        tested: false,
        degraded,
        metrics: None,
    }
}
