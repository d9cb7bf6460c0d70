//! Test utilities for jf-core.
//!
//! - Assertion macros
//! - Change record builders
//! - A scripted in-process learner that records every call

use crate::learner::{Learner, TestOutput, TrainOutcome, TrainRequest};
use crate::stream::ChangeStream;
use jf_common::{ChangeRecord, CommitId, Error, FixLinkage, Prediction, Result};
use std::collections::VecDeque;

// ============================================================================
// Macros
// ============================================================================

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($expr:expr, $msg:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Assert that two floating point numbers are approximately equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_approx_eq!($a, $b, 1e-6_f64)
    };
    ($a:expr, $b:expr, $epsilon:expr) => {{
        let a: f64 = $a;
        let b: f64 = $b;
        let eps: f64 = $epsilon;
        let diff = (a - b).abs();
        if diff > eps {
            panic!(
                "assertion failed: `(left ~= right)` (left: `{}`, right: `{}`, diff: `{}`, epsilon: `{}`)",
                a, b, diff, eps
            );
        }
    }};
}

// ============================================================================
// Record builders
// ============================================================================

pub const DAY: i64 = 86_400;

pub fn clean(id: &str, ts: i64) -> ChangeRecord {
    ChangeRecord::new(id, ts, Some(false))
}

pub fn buggy(id: &str, ts: i64) -> ChangeRecord {
    ChangeRecord::new(id, ts, Some(true))
}

pub fn unlabeled(id: &str, ts: i64) -> ChangeRecord {
    ChangeRecord::new(id, ts, None)
}

/// A buggy change whose first fix lands at `first_fix_date`.
pub fn buggy_fixed_at(id: &str, ts: i64, first_fix_date: i64) -> ChangeRecord {
    buggy(id, ts).with_fix(FixLinkage {
        first_fix_date: Some(first_fix_date),
        fixes: Vec::new(),
    })
}

/// A clean change that fixes the listed commits.
pub fn fixing(id: &str, ts: i64, fixes: &[&str]) -> ChangeRecord {
    clean(id, ts).with_fix(FixLinkage {
        first_fix_date: None,
        fixes: fixes.iter().map(|f| CommitId::from(*f)).collect(),
    })
}

/// `n` changes one day apart, buggy at the given positions.
pub fn stream_of(n: usize, buggy_at: &[usize]) -> ChangeStream {
    let records = (0..n)
        .map(|i| {
            let id = format!("c{i:03}");
            let ts = i as i64 * DAY;
            if buggy_at.contains(&i) {
                buggy(&id, ts)
            } else {
                clean(&id, ts)
            }
        })
        .collect();
    match ChangeStream::from_records(records) {
        Ok(stream) => stream,
        Err(e) => panic!("test stream must be valid: {e}"),
    }
}

// ============================================================================
// Scripted learner
// ============================================================================

/// What the scripted learner does on its next `train` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainScript {
    Changed,
    Unchanged,
    /// Recoverable collaborator failure.
    Fail,
    /// The status signal never appeared.
    SignalTimeout,
}

/// One recorded `train` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainCall {
    pub window: u64,
    pub train_ids: Vec<String>,
    pub valid_ids: Vec<String>,
    pub positives: usize,
    pub threshold: f64,
}

/// One recorded `test` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCall {
    pub ids: Vec<String>,
    pub threshold: f64,
}

/// Deterministic learner: scores 0.8 for truly buggy changes, 0.2 otherwise.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLearner {
    script: VecDeque<TrainScript>,
    fail_tests: bool,
    has_model: bool,
    pub train_calls: Vec<TrainCall>,
    pub test_calls: Vec<TestCall>,
}

impl ScriptedLearner {
    /// Every training run changes the model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcomes for successive `train` calls; `Changed` once exhausted.
    pub fn with_script(script: impl IntoIterator<Item = TrainScript>) -> Self {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every `test` call fails recoverably.
    pub fn failing_tests(mut self) -> Self {
        self.fail_tests = true;
        self
    }
}

impl Learner for ScriptedLearner {
    fn train(&mut self, request: &TrainRequest<'_>) -> Result<TrainOutcome> {
        self.train_calls.push(TrainCall {
            window: request.window,
            train_ids: request.train.iter().map(|c| c.record.commit_id.to_string()).collect(),
            valid_ids: request.valid.iter().map(|c| c.record.commit_id.to_string()).collect(),
            positives: request.train.iter().filter(|c| c.label).count(),
            threshold: request.threshold,
        });
        match self.script.pop_front().unwrap_or(TrainScript::Changed) {
            TrainScript::Changed => {
                self.has_model = true;
                Ok(TrainOutcome::changed())
            }
            TrainScript::Unchanged => Ok(TrainOutcome::unchanged()),
            TrainScript::Fail => Err(Error::ExternalCollaborator("scripted failure".into())),
            TrainScript::SignalTimeout => Err(Error::SignalTimeout {
                path: "training_status.txt".into(),
                waited_secs: 0,
            }),
        }
    }

    fn test(&mut self, window: &[ChangeRecord], threshold: f64) -> Result<TestOutput> {
        self.test_calls.push(TestCall {
            ids: window.iter().map(|r| r.commit_id.to_string()).collect(),
            threshold,
        });
        if self.fail_tests {
            return Err(Error::ExternalCollaborator("scripted test failure".into()));
        }
        let predictions = window
            .iter()
            .map(|r| {
                let prob = if r.ground_truth() { 0.8 } else { 0.2 };
                Prediction::new(r.ground_truth(), prob > threshold, prob)
            })
            .collect();
        Ok(TestOutput {
            predictions,
            metrics: None,
        })
    }

    fn has_model(&self) -> bool {
        self.has_model
    }
}
