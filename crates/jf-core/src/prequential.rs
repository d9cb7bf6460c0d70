//! Prequential (test-then-train) evaluation.
//!
//! Every position of the prediction stream gets decay-weighted running
//! metrics: the weight of position `i` seen from position `j` is
//! `d^(j-i)`. The run is summarized by the mean and population standard
//! deviation of each series, plus one ROC-AUC over the whole stream.

use jf_common::{Error, PredictionStream, Result};
use jf_math::{mean_std, roc_auc, DecayedConfusion};
use serde::{Deserialize, Serialize};

/// Running metrics at one stream position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrequentialPoint {
    pub g_mean: f64,
    pub f1: f64,
    pub precision: f64,
    pub recall: f64,
    pub r0: f64,
    pub r1: f64,
    pub r_gap: f64,
}

impl PrequentialPoint {
    fn from_counts(c: &DecayedConfusion) -> Self {
        Self {
            g_mean: c.g_mean(),
            f1: c.f1(),
            precision: c.precision(),
            recall: c.recall(),
            r0: c.recall_negative(),
            r1: c.recall(),
            r_gap: c.recall_gap(),
        }
    }
}

/// Mean and population standard deviation of one series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub mean: f64,
    pub std: f64,
}

impl SeriesSummary {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.collect();
        let (mean, std) = mean_std(&values);
        Self { mean, std }
    }
}

/// Prequential evaluation of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrequentialReport {
    pub decay_factor: f64,
    pub samples: usize,
    pub g_mean: SeriesSummary,
    pub f1: SeriesSummary,
    pub precision: SeriesSummary,
    pub recall: SeriesSummary,
    pub r0: SeriesSummary,
    pub r1: SeriesSummary,
    pub r_gap: SeriesSummary,
    /// `None` when the stream holds a single class.
    pub roc_auc: Option<f64>,
    /// Per-position series, in stream order.
    pub series: Vec<PrequentialPoint>,
}

impl PrequentialReport {
    /// Final value of each series (the metrics "as of now").
    pub fn last(&self) -> Option<&PrequentialPoint> {
        self.series.last()
    }
}

/// Decay-weighted running metrics over `stream`.
pub fn calculate_prequential_mean_and_std(
    stream: &PredictionStream,
    decay_factor: f64,
) -> Result<PrequentialReport> {
    if !(decay_factor > 0.0 && decay_factor <= 1.0) {
        return Err(Error::Config(format!(
            "decay factor must be in (0, 1], got {decay_factor}"
        )));
    }
    if !stream.is_aligned() {
        return Err(Error::PreconditionViolation(format!(
            "prediction columns differ in length: {} labels, {} predicted, {} scores",
            stream.true_labels.len(),
            stream.pred_labels.len(),
            stream.pred_probs.len()
        )));
    }

    let mut counts = DecayedConfusion::new(decay_factor);
    let series: Vec<PrequentialPoint> = stream
        .iter()
        .map(|p| {
            counts.observe(p.true_label, p.pred_label);
            PrequentialPoint::from_counts(&counts)
        })
        .collect();

    Ok(PrequentialReport {
        decay_factor,
        samples: series.len(),
        g_mean: SeriesSummary::of(series.iter().map(|p| p.g_mean)),
        f1: SeriesSummary::of(series.iter().map(|p| p.f1)),
        precision: SeriesSummary::of(series.iter().map(|p| p.precision)),
        recall: SeriesSummary::of(series.iter().map(|p| p.recall)),
        r0: SeriesSummary::of(series.iter().map(|p| p.r0)),
        r1: SeriesSummary::of(series.iter().map(|p| p.r1)),
        r_gap: SeriesSummary::of(series.iter().map(|p| p.r_gap)),
        roc_auc: roc_auc(&stream.true_labels, &stream.pred_probs),
        series,
    })
}
