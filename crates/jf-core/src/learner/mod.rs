//! The learner collaborator.
//!
//! The simulator never learns a model itself. It hands labeled slices to a
//! [`Learner`] and asks it to score test windows. [`ProcessLearner`] drives
//! an external training program; tests use a scripted learner.

mod process;

pub use process::{LearnerError, ProcessLearner};

use crate::verify::LabeledChange;
use jf_common::{ChangeRecord, Prediction, Result};
use serde::{Deserialize, Serialize};

/// One training invocation.
#[derive(Debug, Clone, Copy)]
pub struct TrainRequest<'a> {
    /// Window index, for artifact naming and logs.
    pub window: u64,
    pub train: &'a [LabeledChange],
    pub valid: &'a [LabeledChange],
    pub threshold: f64,
}

/// What a training cycle did to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainOutcome {
    /// Parameters changed; the pool that trained it is consumed.
    pub model_changed: bool,
}

impl TrainOutcome {
    pub fn changed() -> Self {
        Self {
            model_changed: true,
        }
    }

    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Scores for one test window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestOutput {
    /// One per input record, in input order.
    pub predictions: Vec<Prediction>,
    /// Aggregate metrics reported by the learner, if any.
    pub metrics: Option<serde_json::Value>,
}

/// Trainer and tester behind the simulation.
pub trait Learner {
    /// Train on `request`; report whether the model changed.
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainOutcome>;

    /// Score `window` at `threshold`.
    fn test(&mut self, window: &[ChangeRecord], threshold: f64) -> Result<TestOutput>;

    /// Whether a model exists to test with.
    fn has_model(&self) -> bool;
}

impl<L: Learner + ?Sized> Learner for Box<L> {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainOutcome> {
        (**self).train(request)
    }

    fn test(&mut self, window: &[ChangeRecord], threshold: f64) -> Result<TestOutput> {
        (**self).test(window, threshold)
    }

    fn has_model(&self) -> bool {
        (**self).has_model()
    }
}
