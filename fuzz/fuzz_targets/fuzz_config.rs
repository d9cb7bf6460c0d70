//! Fuzz target for jitflow.json parsing and semantic validation.

#![no_main]

use jf_config::{validate_config, SimulationConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<SimulationConfig>(data) {
        let _ = validate_config(&config);
        let _ = config.verification.window_seconds();
    }
});
