//! Structured logging foundation for jf-core.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for batch experiment runs
//!
//! # Usage
//!
//! ```ignore
//! use jf_core::logging::{init_logging, LogConfig, LogContext, Stage, event_names};
//!
//! let config = LogConfig::from_env(None, None);
//! init_logging(&config);
//!
//! let ctx = LogContext::new(generate_run_id(), "commons-lang");
//! log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "Starting simulation");
//! ```
//!
//! stdout is reserved for command payloads (JSON/MD output); all log output
//! goes to stderr.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. A second call
/// is ignored.
pub fn init_logging(config: &LogConfig) {
    // Event names are used as targets, so the filter is a bare level
    let filter = EnvFilter::new(config.level.as_directive());

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_ansi(use_ansi);

            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init();
        }
        LogFormat::Jsonl => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .try_init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // first 12 hex chars
    format!("run-{}", &uuid.simple().to_string()[..12])
}

/// Structured event logging with the run's correlation ids.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::WINDOW_TRAINED, Stage::Train, "Model updated",
///     window = 3u64, pool = 120u64);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(
            target: $event,
            run_id = %$ctx.run_id,
            project = %$ctx.project,
            stage = %$stage,
            $($key = $val,)*
            message = %$msg,
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(
            target: $event,
            run_id = %$ctx.run_id,
            project = %$ctx.project,
            stage = %$stage,
            $($key = $val,)*
            message = %$msg,
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(
            target: $event,
            run_id = %$ctx.run_id,
            project = %$ctx.project,
            stage = %$stage,
            $($key = $val,)*
            message = %$msg,
        )
    };
    ($ctx:expr, ERROR, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::error!(
            target: $event,
            run_id = %$ctx.run_id,
            project = %$ctx.project,
            stage = %$stage,
            $($key = $val,)*
            message = %$msg,
        )
    };
}
