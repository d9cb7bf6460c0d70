//! Fuzz target for single change-record decoding.
//!
//! Timestamps and labels arrive as ints, floats, or strings; decoding must
//! reject bad shapes with an error, never a panic.

#![no_main]

use jf_common::ChangeRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(record) = serde_json::from_slice::<ChangeRecord>(data) {
        let _ = record.ground_truth();
        let _ = record.first_fix_date();
        let _ = record.fixed_commits().len();
    }
});
