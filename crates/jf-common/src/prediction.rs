//! Per-record predictions and the flattened prediction stream.

use serde::{Deserialize, Serialize};

/// Tester output for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub true_label: bool,
    pub pred_label: bool,
    pub pred_prob: f64,
}

impl Prediction {
    pub fn new(true_label: bool, pred_label: bool, pred_prob: f64) -> Self {
        Self {
            true_label,
            pred_label,
            pred_prob,
        }
    }

    /// "Always negative, probability 0" used when no model is available.
    pub fn fallback(true_label: bool) -> Self {
        Self::new(true_label, false, 0.0)
    }
}

/// Column-oriented prediction sequence aligned with stream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStream {
    pub true_labels: Vec<bool>,
    pub pred_labels: Vec<bool>,
    pub pred_probs: Vec<f64>,
}

impl PredictionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            true_labels: Vec::with_capacity(n),
            pred_labels: Vec::with_capacity(n),
            pred_probs: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, p: Prediction) {
        self.true_labels.push(p.true_label);
        self.pred_labels.push(p.pred_label);
        self.pred_probs.push(p.pred_prob);
    }

    pub fn extend<I: IntoIterator<Item = Prediction>>(&mut self, iter: I) {
        for p in iter {
            self.push(p);
        }
    }

    pub fn len(&self) -> usize {
        self.true_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_labels.is_empty()
    }

    /// True when all three columns have the same length.
    pub fn is_aligned(&self) -> bool {
        self.true_labels.len() == self.pred_labels.len()
            && self.true_labels.len() == self.pred_probs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Prediction> + '_ {
        self.true_labels
            .iter()
            .zip(&self.pred_labels)
            .zip(&self.pred_probs)
            .map(|((&t, &l), &p)| Prediction::new(t, l, p))
    }
}

impl FromIterator<Prediction> for PredictionStream {
    fn from_iter<I: IntoIterator<Item = Prediction>>(iter: I) -> Self {
        let mut stream = PredictionStream::new();
        stream.extend(iter);
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_negative_with_zero_probability() {
        let p = Prediction::fallback(true);
        assert!(p.true_label);
        assert!(!p.pred_label);
        assert_eq!(p.pred_prob, 0.0);
    }

    #[test]
    fn stream_preserves_order() {
        let stream: PredictionStream = (0..4)
            .map(|i| Prediction::new(i % 2 == 0, i == 3, i as f64 / 10.0))
            .collect();
        assert_eq!(stream.len(), 4);
        assert!(stream.is_aligned());
        let probs: Vec<f64> = stream.iter().map(|p| p.pred_prob).collect();
        assert_eq!(probs, vec![0.0, 0.1, 0.2, 0.3]);
        assert!(stream.pred_labels[3]);
    }
}
