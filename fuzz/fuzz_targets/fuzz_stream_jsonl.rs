//! Fuzz target for JSON-lines stream loading, including order checks.

#![no_main]

use jf_core::stream::{ChangeStream, StreamFilter};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let filter = StreamFilter {
        project: None,
        start: Some(1),
        end: Some(64),
    };
    if let Ok(stream) = ChangeStream::parse_jsonl(data, &filter) {
        let _ = stream.ground_truth();
    }
});
