//! jitflow core library
//!
//! Online just-in-time defect prediction, simulated the way it would run in
//! production: labels arrive late, the model is retrained window by window,
//! and every change is scored before anything learns from it.
//!
//! - Stream loading and the label-latency verifier
//! - Training split, learner collaborator, artifact store
//! - Threshold calibration and prequential evaluation
//! - The windowed online driver and its report
//! - Logging, exit codes, and configuration glue for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod artifacts;
pub mod calibrate;
pub mod config;
pub mod driver;
pub mod exit_codes;
pub mod learner;
pub mod logging;
pub mod prequential;
pub mod split;
pub mod stream;
pub mod verify;

// Re-export test utilities for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
