//! Exponentially decayed confusion counts.
//!
//! After observing positions `0..=j`, each count holds the sum of
//! `d^(j-i)` over the positions `i` that fall in its cell.

use serde::{Deserialize, Serialize};

/// `num / den`, or 0 when the denominator is zero.
#[inline]
pub fn safe_ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Decay-weighted 2x2 confusion matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayedConfusion {
    decay: f64,
    pub tp: f64,
    pub fp: f64,
    pub tn: f64,
    pub fn_: f64,
}

impl DecayedConfusion {
    /// `decay` must lie in `(0, 1]`; 1 gives plain cumulative counts.
    pub fn new(decay: f64) -> Self {
        Self {
            decay,
            tp: 0.0,
            fp: 0.0,
            tn: 0.0,
            fn_: 0.0,
        }
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    /// Fade every cell by one step, then add the new observation.
    pub fn observe(&mut self, truth: bool, predicted: bool) {
        self.tp *= self.decay;
        self.fp *= self.decay;
        self.tn *= self.decay;
        self.fn_ *= self.decay;
        match (truth, predicted) {
            (true, true) => self.tp += 1.0,
            (false, true) => self.fp += 1.0,
            (false, false) => self.tn += 1.0,
            (true, false) => self.fn_ += 1.0,
        }
    }

    pub fn precision(&self) -> f64 {
        safe_ratio(self.tp, self.tp + self.fp)
    }

    /// Recall of the positive class (R1).
    pub fn recall(&self) -> f64 {
        safe_ratio(self.tp, self.tp + self.fn_)
    }

    /// Recall of the negative class (R0).
    pub fn recall_negative(&self) -> f64 {
        safe_ratio(self.tn, self.tn + self.fp)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        safe_ratio(2.0 * p * r, p + r)
    }

    pub fn g_mean(&self) -> f64 {
        (self.recall() * self.recall_negative()).sqrt()
    }

    /// |R0 - R1|.
    pub fn recall_gap(&self) -> f64 {
        (self.recall_negative() - self.recall()).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecayed_counts_are_plain_confusion() {
        let mut c = DecayedConfusion::new(1.0);
        for (t, p) in [(true, true), (true, false), (false, false), (false, true)] {
            c.observe(t, p);
        }
        assert_eq!((c.tp, c.fp, c.tn, c.fn_), (1.0, 1.0, 1.0, 1.0));
        assert!((c.g_mean() - 0.5).abs() < 1e-12);
        assert!((c.f1() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decay_weights_older_observations_less() {
        let mut c = DecayedConfusion::new(0.5);
        c.observe(true, true); // weight 0.25 after two more steps
        c.observe(true, false); // 0.5
        c.observe(true, false); // 1.0
        assert!((c.tp - 0.25).abs() < 1e-12);
        assert!((c.fn_ - 1.5).abs() < 1e-12);
        assert!((c.recall() - 0.25 / 1.75).abs() < 1e-12);
    }

    #[test]
    fn zero_denominators_yield_zero() {
        let mut c = DecayedConfusion::new(0.99);
        c.observe(false, false);
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.f1(), 0.0);
        assert_eq!(c.recall_negative(), 1.0);
        assert_eq!(c.g_mean(), 0.0);
        assert_eq!(c.recall_gap(), 1.0);
    }
}
