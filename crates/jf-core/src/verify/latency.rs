//! Latency passes run after every applied record.

use super::state::{Key, VerifierState};
use crate::logging::event_names;
use jf_common::CommitId;

/// Outcome counts of one pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub finalized: usize,
    pub confirmed: usize,
    pub discarded: usize,
    pub late_fixes: usize,
}

impl PassStats {
    pub fn is_empty(&self) -> bool {
        *self == PassStats::default()
    }
}

fn elapsed(key: &Key, window_secs: i64, now: i64) -> bool {
    key.0.saturating_add(window_secs) <= now
}

/// Queue entries leave in timestamp order once their window has elapsed.
fn finalize_elapsed_queue(state: &mut VerifierState, now: i64, stats: &mut PassStats) {
    let due: Vec<CommitId> = state
        .queue
        .iter()
        .take_while(|(key, _)| elapsed(key, state.window_secs, now))
        .map(|(_, id)| id.clone())
        .collect();
    for id in due {
        let label = state.index.get(&id).map(|e| e.label).unwrap_or(false);
        state.finalize(&id, label);
        tracing::trace!(target: event_names::VERIFY_FINALIZED, commit = %id.short(), label, "queue entry finalized");
        stats.finalized += 1;
    }
}

pub(crate) fn simple_pass(state: &mut VerifierState, now: i64) -> PassStats {
    let mut stats = PassStats::default();
    finalize_elapsed_queue(state, now, &mut stats);
    stats
}

pub(crate) fn real_pass(state: &mut VerifierState, now: i64) -> PassStats {
    let mut stats = PassStats::default();

    // 1. fix already visible for a suspected commit
    let confirmed: Vec<CommitId> = state
        .buggy
        .values()
        .filter(|id| {
            state
                .index
                .get(*id)
                .and_then(|e| e.record.first_fix_date())
                .is_some_and(|d| d <= now)
        })
        .cloned()
        .collect();
    for id in confirmed {
        state.finalize(&id, true);
        tracing::trace!(target: event_names::VERIFY_CONFIRMED, commit = %id.short(), "suspected commit confirmed");
        stats.confirmed += 1;
    }

    // 2. scheduled late fixes
    let due: Vec<Key> = state
        .late_fixes
        .keys()
        .take_while(|key| key.0 <= now)
        .copied()
        .collect();
    for key in due {
        if let Some(id) = state.late_fixes.remove(&key) {
            super::apply_fix(state, &id);
            tracing::trace!(target: event_names::VERIFY_CONFIRMED, commit = %id.short(), "late fix applied");
            stats.late_fixes += 1;
        }
    }

    // 3. suspected commits whose window elapsed without a fix
    let expired: Vec<CommitId> = state
        .buggy
        .iter()
        .take_while(|(key, _)| elapsed(key, state.window_secs, now))
        .map(|(_, id)| id.clone())
        .collect();
    for id in expired {
        let fix_date = state.index.get(&id).and_then(|e| e.record.first_fix_date());
        state.finalize(&id, false);
        if let Some(date) = fix_date.filter(|d| *d > now) {
            state.schedule_late_fix(&id, date);
        }
        tracing::trace!(target: event_names::VERIFY_DISCARDED, commit = %id.short(), "suspected commit expired unconfirmed");
        stats.discarded += 1;
    }

    // 4. provisionally clean commits
    finalize_elapsed_queue(state, now, &mut stats);
    stats
}

/// Finalize everything still pending as clean. Used at end of stream.
pub(crate) fn drain(state: &mut VerifierState) -> PassStats {
    let mut stats = PassStats::default();
    let pending: Vec<(CommitId, bool)> = state
        .queue
        .values()
        .map(|id| (id.clone(), false))
        .chain(state.buggy.values().map(|id| (id.clone(), true)))
        .collect();
    for (id, suspected) in pending {
        state.finalize(&id, false);
        if suspected {
            stats.discarded += 1;
        } else {
            stats.finalized += 1;
        }
    }
    state.late_fixes.clear();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::state::VerifierMode;
    use jf_common::{ChangeRecord, FixLinkage};

    fn rec(id: &str, ts: i64) -> ChangeRecord {
        ChangeRecord::new(id, ts, Some(false))
    }

    #[test]
    fn queue_leaves_only_after_window() {
        let mut state = VerifierState::new(VerifierMode::Simple, 10);
        state.admit_to_queue(rec("a", 0), false);
        state.admit_to_queue(rec("b", 5), false);
        assert!(simple_pass(&mut state, 9).is_empty());
        assert_eq!(simple_pass(&mut state, 10).finalized, 1);
        assert_eq!(state.queued_ids(), vec![CommitId::from("b")]);
    }

    #[test]
    fn expired_suspect_schedules_late_fix() {
        let mut state = VerifierState::new(VerifierMode::RealLatency, 10);
        let late = rec("a", 0).with_fix(FixLinkage {
            first_fix_date: Some(50),
            fixes: vec![],
        });
        state.admit_to_buggy(late);

        let stats = real_pass(&mut state, 10);
        assert_eq!(stats.discarded, 1);
        assert_eq!(state.label_of(&CommitId::from("a")), Some(false));
        assert_eq!(state.late_fix_len(), 1);

        let stats = real_pass(&mut state, 50);
        assert_eq!(stats.late_fixes, 1);
        assert_eq!(state.label_of(&CommitId::from("a")), Some(true));
        state.check_ledger().unwrap();
    }

    #[test]
    fn visible_fix_promotes_immediately() {
        let mut state = VerifierState::new(VerifierMode::RealLatency, 100);
        let suspect = rec("a", 0).with_fix(FixLinkage {
            first_fix_date: Some(3),
            fixes: vec![],
        });
        state.admit_to_buggy(suspect);
        assert!(real_pass(&mut state, 2).is_empty());
        assert_eq!(real_pass(&mut state, 3).confirmed, 1);
        assert!(state.pool_snapshot()[0].label);
    }

    #[test]
    fn drain_finalizes_everything_clean() {
        let mut state = VerifierState::new(VerifierMode::RealLatency, 100);
        state.admit_to_queue(rec("a", 0), false);
        state.admit_to_buggy(rec("b", 1));
        let stats = drain(&mut state);
        assert_eq!(stats.finalized + stats.discarded, 2);
        assert!(state.pool_snapshot().iter().all(|c| !c.label));
        state.check_ledger().unwrap();
    }
}
