//! G-mean operating-point search.

use jf_common::{Error, PredictionStream, Result};
use jf_math::{roc_auc, safe_ratio};
use serde::{Deserialize, Serialize};

/// Best threshold on a labeled sample and the per-class metrics there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    /// Scores strictly above this are predicted buggy.
    pub threshold: f64,
    pub g_mean: f64,
    /// Recall of the clean class (scores `<= threshold`).
    pub recall0: f64,
    /// Recall of the buggy class (scores `> threshold`).
    pub recall1: f64,
    pub precision0: f64,
    pub precision1: f64,
    pub f1_0: f64,
    pub f1_1: f64,
    /// Rank-based ROC-AUC of the whole sample.
    pub roc_auc: Option<f64>,
    pub positives: usize,
    pub negatives: usize,
}

fn f1(precision: f64, recall: f64) -> f64 {
    safe_ratio(2.0 * precision * recall, precision + recall)
}

/// Search every observed score as a candidate threshold.
///
/// Candidates are visited in ascending order and only a strictly better
/// G-mean replaces the incumbent, so among equally good thresholds the
/// smallest one is returned.
pub fn analyze_results(sample: &PredictionStream) -> Result<OperatingPoint> {
    if !sample.is_aligned() {
        return Err(Error::PreconditionViolation(format!(
            "prediction columns differ in length: {} labels, {} scores",
            sample.true_labels.len(),
            sample.pred_probs.len()
        )));
    }
    if let Some(bad) = sample.pred_probs.iter().find(|p| !p.is_finite()) {
        return Err(Error::InvalidStream(format!("non-finite probability {bad}")));
    }

    let positives = sample.true_labels.iter().filter(|l| **l).count();
    let negatives = sample.true_labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(Error::CalibrationDegenerate {
            positives,
            negatives,
        });
    }

    let mut scored: Vec<(f64, bool)> = sample
        .pred_probs
        .iter()
        .copied()
        .zip(sample.true_labels.iter().copied())
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Walk distinct scores; `neg_le`/`pos_le` count samples at or below t.
    let mut best: Option<(f64, f64, usize, usize)> = None;
    let mut neg_le = 0usize;
    let mut pos_le = 0usize;
    let mut i = 0;
    while i < scored.len() {
        let t = scored[i].0;
        while i < scored.len() && scored[i].0 == t {
            if scored[i].1 {
                pos_le += 1;
            } else {
                neg_le += 1;
            }
            i += 1;
        }
        let r0 = neg_le as f64 / negatives as f64;
        let r1 = (positives - pos_le) as f64 / positives as f64;
        let gm = (r0 * r1).sqrt();
        if best.is_none_or(|(_, best_gm, _, _)| gm > best_gm) {
            best = Some((t, gm, neg_le, pos_le));
        }
    }

    let Some((threshold, g_mean, neg_le, pos_le)) = best else {
        return Err(Error::CalibrationDegenerate {
            positives,
            negatives,
        });
    };

    let n = scored.len();
    let recall0 = neg_le as f64 / negatives as f64;
    let recall1 = (positives - pos_le) as f64 / positives as f64;
    let precision0 = safe_ratio(neg_le as f64, (neg_le + pos_le) as f64);
    let precision1 = safe_ratio((positives - pos_le) as f64, (n - neg_le - pos_le) as f64);

    Ok(OperatingPoint {
        threshold,
        g_mean,
        recall0,
        recall1,
        precision0,
        precision1,
        f1_0: f1(precision0, recall0),
        f1_1: f1(precision1, recall1),
        roc_auc: roc_auc(&sample.true_labels, &sample.pred_probs),
        positives,
        negatives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jf_common::Prediction;

    fn stream(pairs: &[(bool, f64)]) -> PredictionStream {
        pairs
            .iter()
            .map(|(l, p)| Prediction::new(*l, *p > 0.5, *p))
            .collect()
    }

    #[test]
    fn separable_sample_reaches_perfect_gmean() {
        let s = stream(&[(false, 0.1), (true, 0.8), (false, 0.3), (true, 0.7), (false, 0.2)]);
        let op = analyze_results(&s).unwrap();
        assert_eq!(op.threshold, 0.3);
        assert_eq!(op.g_mean, 1.0);
        assert_eq!(op.precision0, 1.0);
        assert_eq!(op.precision1, 1.0);
        assert_eq!(op.f1_0, 1.0);
        assert_eq!(op.f1_1, 1.0);
        assert_eq!(op.roc_auc, Some(1.0));
    }

    #[test]
    fn ties_resolve_to_smallest_threshold() {
        // t = 0.2 and t = 0.6 both reach sqrt(0.5)
        let s = stream(&[(false, 0.2), (true, 0.4), (false, 0.6), (true, 0.8)]);
        let op = analyze_results(&s).unwrap();
        assert_eq!(op.threshold, 0.2);
        assert!((op.g_mean - 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn single_class_is_degenerate() {
        let s = stream(&[(false, 0.1), (false, 0.4)]);
        match analyze_results(&s) {
            Err(Error::CalibrationDegenerate { positives, negatives }) => {
                assert_eq!((positives, negatives), (0, 2));
            }
            other => panic!("expected degenerate, got {other:?}"),
        }
    }

    #[test]
    fn misaligned_columns_rejected() {
        let mut s = stream(&[(false, 0.1), (true, 0.9)]);
        s.pred_probs.pop();
        assert!(matches!(
            analyze_results(&s),
            Err(Error::PreconditionViolation(_))
        ));
    }
}
