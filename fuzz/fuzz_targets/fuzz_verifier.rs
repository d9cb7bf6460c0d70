//! Fuzz target for the label-latency verifier.
//!
//! Arbitrary record sequences may be rejected, but every accepted window
//! must leave the conservation ledger balanced.

#![no_main]

use arbitrary::Arbitrary;
use jf_common::{ChangeRecord, CommitId, FixLinkage};
use jf_core::verify::{self, VerifierMode, VerifierState};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    real: bool,
    window_hours: u16,
    step: u8,
    cumulative: bool,
    changes: Vec<Change>,
}

#[derive(Debug, Arbitrary)]
struct Change {
    id: u8,
    gap_hours: u16,
    label: Option<bool>,
    fix_after_hours: Option<u16>,
    fixes: Option<u8>,
}

fn record(c: &Change, ts: i64) -> ChangeRecord {
    let fix = FixLinkage {
        first_fix_date: c.fix_after_hours.map(|h| ts + i64::from(h) * 3_600),
        fixes: c.fixes.map(|f| CommitId::from(format!("c{f}"))).into_iter().collect(),
    };
    ChangeRecord::new(format!("c{}", c.id), ts, c.label).with_fix(fix)
}

fuzz_target!(|input: Input| {
    let mode = if input.real {
        VerifierMode::RealLatency
    } else {
        VerifierMode::Simple
    };
    let mut ts = 0i64;
    let records: Vec<ChangeRecord> = input
        .changes
        .iter()
        .take(256)
        .map(|c| {
            ts += i64::from(c.gap_hours) * 3_600;
            record(c, ts)
        })
        .collect();

    let step = usize::from(input.step.max(1));
    let mut state = VerifierState::new(mode, i64::from(input.window_hours) * 3_600);
    let mut end = 0;
    while end < records.len() {
        let start = end;
        end = (end + step).min(records.len());
        let window = if input.cumulative {
            state.reset_for_replay();
            &records[..end]
        } else {
            &records[start..end]
        };
        if verify::prepare_train_data(window, &mut state).is_err() {
            return;
        }
        assert!(state.check_ledger().is_ok());
        state.consume_pool();
    }
    if verify::drain(&mut state).is_ok() {
        assert!(state.check_ledger().is_ok());
    }
});
