//! Label-latency verification.
//!
//! Decides, per change, when its label becomes known to the learner. A
//! window of records is applied strictly in timestamp order; after each
//! record a latency pass moves whatever has become final into the
//! Training Pool.
//!
//! Two modes:
//! - [`VerifierMode::Simple`]: stream labels are trusted. Buggy records go
//!   straight to the pool, everything else waits out the verification
//!   window in the queue.
//! - [`VerifierMode::RealLatency`]: a change only becomes buggy once a fix
//!   links back to it. Suspected changes wait in the Buggy Pool and fall
//!   back to clean when no fix shows up in time.

mod latency;
mod state;

pub use latency::PassStats;
pub use state::{LabeledChange, Ledger, Slot, VerifierMode, VerifierState};

use crate::logging::event_names;
use jf_common::{ChangeRecord, CommitId, Error, Result};

impl VerifierMode {
    /// Pick the mode for `project` from the verification config.
    pub fn for_project(config: &jf_config::VerificationConfig, project: &str) -> Self {
        if config.is_real_latency(project) {
            VerifierMode::RealLatency
        } else {
            VerifierMode::Simple
        }
    }
}

/// Apply `window` to `state` and return the timestamp of its last record.
///
/// Timestamps must be non-decreasing within the window and not older than
/// the state's clock. The whole window is checked before anything is
/// applied, so a rejected window leaves the state untouched.
pub fn prepare_train_data(window: &[ChangeRecord], state: &mut VerifierState) -> Result<Option<i64>> {
    check_order(window, state.clock())?;

    let mut totals = PassStats::default();
    for record in window {
        let stats = apply_record(record, state)?;
        totals.finalized += stats.finalized;
        totals.confirmed += stats.confirmed;
        totals.discarded += stats.discarded;
        totals.late_fixes += stats.late_fixes;
    }

    if !window.is_empty() {
        tracing::debug!(
            target: event_names::VERIFY_FINALIZED,
            mode = %state.mode(),
            records = window.len(),
            finalized = totals.finalized,
            confirmed = totals.confirmed,
            discarded = totals.discarded,
            late_fixes = totals.late_fixes,
            pool = state.pool_len(),
            queue = state.queue_len(),
            buggy = state.buggy_len(),
            "window verified"
        );
    }
    Ok(window.last().map(|r| r.timestamp))
}

fn check_order(window: &[ChangeRecord], clock: Option<i64>) -> Result<()> {
    let mut last = clock;
    for record in window {
        if let Some(prev) = last {
            if record.timestamp < prev {
                return Err(Error::TimestampRegression {
                    commit_id: record.commit_id.to_string(),
                    timestamp: record.timestamp,
                    last: prev,
                });
            }
        }
        last = Some(record.timestamp);
    }
    Ok(())
}

/// Apply one record, then run the latency pass at its timestamp.
fn apply_record(record: &ChangeRecord, state: &mut VerifierState) -> Result<PassStats> {
    if let Some(prev) = state.clock() {
        if record.timestamp < prev {
            return Err(Error::TimestampRegression {
                commit_id: record.commit_id.to_string(),
                timestamp: record.timestamp,
                last: prev,
            });
        }
    }
    let pending = matches!(
        state.slot_of(&record.commit_id),
        Some(Slot::Queued | Slot::Suspected)
    );
    if pending && !record.is_labeled_buggy() {
        return Err(Error::DuplicateCommit {
            commit_id: record.commit_id.to_string(),
        });
    }

    let now = record.timestamp;
    state.clock = Some(now);

    let stats = match state.mode() {
        VerifierMode::Simple => {
            ingest_simple(record, state);
            latency::simple_pass(state, now)
        }
        VerifierMode::RealLatency => {
            if record.is_labeled_buggy() {
                process_buggy_commit(record, state);
            } else {
                ingest_clean(record, state);
            }
            for fixed in record.fixed_commits() {
                confirm_fix(fixed, state);
            }
            latency::real_pass(state, now)
        }
    };

    state.check_ledger()?;
    Ok(stats)
}

fn ingest_simple(record: &ChangeRecord, state: &mut VerifierState) {
    if record.is_labeled_buggy() {
        match state.slot_of(&record.commit_id) {
            None | Some(Slot::Consumed) => state.admit_to_pool(record.clone(), true),
            Some(Slot::Pooled) => state.relabel_pooled(&record.commit_id, true),
            Some(Slot::Queued | Slot::Suspected) => state.finalize(&record.commit_id, true),
        }
    } else {
        ingest_clean(record, state);
    }
}

/// Clean or unknown label: provisionally clean in the queue.
fn ingest_clean(record: &ChangeRecord, state: &mut VerifierState) {
    match state.slot_of(&record.commit_id) {
        // a consumed record seen again is replayed history, verified afresh
        None | Some(Slot::Consumed) => state.admit_to_queue(record.clone(), false),
        // labels only move towards buggy
        Some(Slot::Pooled | Slot::Queued | Slot::Suspected) => {}
    }
}

/// Reconcile a buggy-labeled record against the Commit Index.
///
/// Never inserts a second entry for a commit that is already known, so
/// applying the same record twice leaves the state as applying it once.
/// A pooled entry met again during a replay turns buggy only once its fix
/// is visible at the current clock; a later fix is scheduled instead.
pub fn process_buggy_commit(record: &ChangeRecord, state: &mut VerifierState) {
    let id = &record.commit_id;
    match state.slot_of(id) {
        Some(Slot::Queued) => state.queue_to_buggy(id),
        Some(Slot::Suspected) => {}
        Some(Slot::Pooled) => {
            if state.label_of(id) == Some(true) {
                return;
            }
            let now = state.clock().unwrap_or(record.timestamp);
            match record.first_fix_date() {
                Some(date) if date <= now => state.relabel_pooled(id, true),
                Some(date) => state.schedule_late_fix(id, date),
                None => {}
            }
        }
        None | Some(Slot::Consumed) => state.admit_to_buggy(record.clone()),
    }
}

/// A later fix names `id` as the change it repairs.
pub fn confirm_fix(id: &CommitId, state: &mut VerifierState) {
    apply_fix(state, id);
    tracing::trace!(target: event_names::VERIFY_CONFIRMED, commit = %id.short(), "fix linked");
}

pub(crate) fn apply_fix(state: &mut VerifierState, id: &CommitId) {
    match state.slot_of(id) {
        Some(Slot::Queued | Slot::Suspected) => state.finalize(id, true),
        Some(Slot::Pooled) => state.relabel_pooled(id, true),
        Some(Slot::Consumed) => {
            if state.label_of(id) != Some(true) {
                state.readmit(id, true);
            }
        }
        None => {}
    }
}

/// End of stream: everything still waiting is finalized as clean.
pub fn drain(state: &mut VerifierState) -> Result<PassStats> {
    let stats = latency::drain(state);
    tracing::debug!(
        target: event_names::VERIFY_DRAINED,
        finalized = stats.finalized,
        discarded = stats.discarded,
        pool = state.pool_len(),
        "verifier drained"
    );
    state.check_ledger()?;
    Ok(stats)
}

/// A pool can train a model only with both classes present.
pub fn is_valid_training_data(pool: &[LabeledChange]) -> bool {
    let positives = pool.iter().filter(|c| c.label).count();
    positives > 0 && positives < pool.len()
}
