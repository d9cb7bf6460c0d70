//! Run report and its renderings.

use super::{SimulationState, WindowSummary};
use crate::calibrate::OperatingPoint;
use crate::exit_codes::ExitCode;
use crate::logging::LogContext;
use crate::prequential::PrequentialReport;
use crate::verify::{Ledger, VerifierMode};
use chrono::{DateTime, Utc};
use jf_common::{OutputFormat, PredictionStream, SCHEMA_VERSION};
use jf_config::ConfigSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of one simulated project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema_version: String,
    pub run_id: String,
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub verifier_mode: VerifierMode,
    pub config: ConfigSnapshot,
    pub records: usize,
    pub final_threshold: f64,
    pub degraded_windows: usize,
    pub ledger: Ledger,
    pub windows: Vec<WindowSummary>,
    pub prequential: PrequentialReport,
    /// Best G-mean threshold over the whole run, when both classes occur.
    pub operating_point: Option<OperatingPoint>,
    /// One prediction per change, in stream order.
    pub predictions: PredictionStream,
}

impl RunReport {
    pub fn new(
        ctx: &LogContext,
        mode: VerifierMode,
        config: ConfigSnapshot,
        state: SimulationState,
        prequential: PrequentialReport,
        operating_point: Option<OperatingPoint>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: ctx.run_id.clone(),
            project: ctx.project.clone(),
            generated_at: Utc::now(),
            verifier_mode: mode,
            config,
            records: state.predictions.len(),
            final_threshold: state.threshold,
            degraded_windows: state.degraded_windows,
            ledger: state.verifier.ledger(),
            windows: state.windows,
            prequential,
            operating_point,
            predictions: state.predictions,
        }
    }

    /// Clean unless some window ran degraded.
    pub fn exit_code(&self) -> ExitCode {
        if self.degraded_windows > 0 {
            ExitCode::Degraded
        } else {
            ExitCode::Clean
        }
    }

    pub fn trained_windows(&self) -> usize {
        self.windows.iter().filter(|w| w.model_changed).count()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self),
            OutputFormat::Md => Ok(self.to_markdown()),
            OutputFormat::Summary => Ok(self.to_summary()),
        }
    }

    /// One line for terminals and CI logs.
    pub fn to_summary(&self) -> String {
        let auc = self
            .prequential
            .roc_auc
            .map(|a| format!("{a:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "[{}] {}: {} changes, {} windows ({} updated model, {} degraded), g-mean {:.3}±{:.3}, f1 {:.3}, auc {}",
            self.run_id,
            self.project,
            self.records,
            self.windows.len(),
            self.trained_windows(),
            self.degraded_windows,
            self.prequential.g_mean.mean,
            self.prequential.g_mean.std,
            self.prequential.f1.mean,
            auc
        )
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let p = &self.prequential;

        let _ = writeln!(md, "# jitflow run `{}`\n", self.run_id);
        let _ = writeln!(md, "- Project: **{}**", self.project);
        let _ = writeln!(md, "- Verification: {}", self.verifier_mode);
        let _ = writeln!(md, "- Changes: {}", self.records);
        let _ = writeln!(md, "- Windows: {} (degraded: {})", self.windows.len(), self.degraded_windows);
        let _ = writeln!(md, "- Final threshold: {:.4}", self.final_threshold);
        let _ = writeln!(md, "- Config: `{}` ({})\n", self.config.short_id(), self.config.source);

        let _ = writeln!(md, "## Prequential metrics (decay {})\n", p.decay_factor);
        let _ = writeln!(md, "| metric | mean | std |");
        let _ = writeln!(md, "|---|---:|---:|");
        for (name, s) in [
            ("g-mean", p.g_mean),
            ("f1", p.f1),
            ("precision", p.precision),
            ("recall", p.recall),
            ("r0", p.r0),
            ("r1", p.r1),
            ("|r0-r1|", p.r_gap),
        ] {
            let _ = writeln!(md, "| {name} | {:.4} | {:.4} |", s.mean, s.std);
        }
        match p.roc_auc {
            Some(auc) => {
                let _ = writeln!(md, "\nROC-AUC: {auc:.4}");
            }
            None => {
                let _ = writeln!(md, "\nROC-AUC: n/a (single class)");
            }
        }

        if let Some(op) = &self.operating_point {
            let _ = writeln!(md, "\n## Operating point\n");
            let _ = writeln!(
                md,
                "threshold {:.4}, g-mean {:.4}, recall0 {:.4}, recall1 {:.4}, f1_0 {:.4}, f1_1 {:.4}",
                op.threshold, op.g_mean, op.recall0, op.recall1, op.f1_0, op.f1_1
            );
        }

        let _ = writeln!(md, "\n## Windows\n");
        let _ = writeln!(md, "| # | range | threshold | tested | training | pool | consumed |");
        let _ = writeln!(md, "|---:|---|---:|:---:|---|---:|---:|");
        for w in &self.windows {
            let training = match (w.train_status, w.model_changed) {
                (super::TrainStatus::Trained, true) => "updated",
                (super::TrainStatus::Trained, false) => "unchanged",
                (super::TrainStatus::Failed, _) => "failed",
                (super::TrainStatus::SkippedInvalidPool, _) => "skipped (one class)",
                (super::TrainStatus::SkippedInsufficientData, _) => "skipped (no data)",
            };
            let _ = writeln!(
                md,
                "| {} | {}..{} | {:.4} | {} | {} | {} | {} |",
                w.index,
                w.start,
                w.end,
                w.threshold,
                if w.tested { "yes" } else { "no" },
                training,
                w.pool_size,
                w.consumed
            );
        }
        md
    }
}
