//! Custom tracing layer for JSONL output.
//!
//! This layer produces machine-parseable JSONL logs on stderr while
//! keeping stdout clean for command payloads.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Correlation data carried by spans.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    project: Option<String>,
    stage: Option<String>,
    window: Option<u64>,
}

/// A visitor that extracts field values from tracing events.
struct JsonFieldVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            fields: serde_json::Map::new(),
            message: None,
        }
    }
}

impl tracing::field::Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(
                field.name().to_string(),
                serde_json::Value::String(value.to_string()),
            );
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(value.into()),
        );
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(
            field.name().to_string(),
            serde_json::Value::Number(value.into()),
        );
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.fields
                .insert(field.name().to_string(), serde_json::Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), serde_json::Value::Bool(value));
    }
}

/// A visitor for extracting span context.
#[derive(Default)]
struct SpanContextVisitor {
    context: SpanContext,
}

impl tracing::field::Visit for SpanContextVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "run_id" => self.context.run_id = Some(value.to_string()),
            "project" => self.context.project = Some(value.to_string()),
            "stage" => self.context.stage = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // Display-formatted span fields (`%value`) arrive here
        let s = format!("{:?}", value);
        match field.name() {
            "run_id" => self.context.run_id = Some(s),
            "project" => self.context.project = Some(s),
            "stage" => self.context.stage = Some(s),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "window" {
            self.context.window = Some(value);
        }
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        if field.name() == "window" && value >= 0 {
            self.context.window = Some(value as u64);
        }
    }
}

/// JSONL tracing layer that outputs to stderr.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    /// Create a new JSONL layer writing to stderr.
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Create a new JSONL layer with a custom writer.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = SpanContextVisitor::default();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(visitor.context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        // Innermost span wins for each key
        let mut merged = SpanContext::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if merged.run_id.is_none() {
                        merged.run_id.clone_from(&span_ctx.run_id);
                    }
                    if merged.project.is_none() {
                        merged.project.clone_from(&span_ctx.project);
                    }
                    if merged.stage.is_none() {
                        merged.stage.clone_from(&span_ctx.stage);
                    }
                    if merged.window.is_none() {
                        merged.window = span_ctx.window;
                    }
                }
            }
        }

        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut obj = serde_json::Map::new();

        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );

        // Fields recorded directly on the event override span context
        for key in ["run_id", "project", "stage", "window"] {
            if let Some(v) = visitor.fields.remove(key) {
                obj.insert(key.to_string(), v);
            }
        }
        if let Some(id) = merged.run_id {
            obj.entry("run_id").or_insert(serde_json::json!(id));
        }
        if let Some(p) = merged.project {
            obj.entry("project").or_insert(serde_json::json!(p));
        }
        if let Some(s) = merged.stage {
            obj.entry("stage").or_insert(serde_json::json!(s));
        }
        if let Some(w) = merged.window {
            obj.entry("window").or_insert(serde_json::json!(w));
        }
        if let Some(msg) = visitor.message {
            obj.insert("message".to_string(), serde_json::json!(msg));
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<serde_json::Value> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);

        let output = buffer.lock().unwrap();
        String::from_utf8_lossy(&output)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_jsonl_layer_output() {
        let lines = capture(|| {
            tracing::info!(target: "test.event", message = "test message");
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "info");
        assert_eq!(lines[0]["event"], "test.event");
        assert_eq!(lines[0]["message"], "test message");
        assert!(lines[0]["ts"].is_string());
    }

    #[test]
    fn layer_records_extra_fields() {
        let lines = capture(|| {
            tracing::warn!(target: "test.fields", count = 42, active = true, message = "hi");
        });
        assert_eq!(lines[0]["level"], "warn");
        assert_eq!(lines[0]["fields"]["count"], 42);
        assert_eq!(lines[0]["fields"]["active"], true);
    }

    #[test]
    fn layer_inherits_span_context() {
        let lines = capture(|| {
            let run = tracing::info_span!("run", run_id = "run-1", project = "gora");
            let _r = run.enter();
            let window = tracing::info_span!("window", window = 3u64, stage = "train");
            let _w = window.enter();
            tracing::info!(target: "window.trained", message = "done");
        });
        assert_eq!(lines[0]["run_id"], "run-1");
        assert_eq!(lines[0]["project"], "gora");
        assert_eq!(lines[0]["window"], 3);
        assert_eq!(lines[0]["stage"], "train");
    }

    #[test]
    fn event_fields_override_span_context() {
        let lines = capture(|| {
            let span = tracing::info_span!("window", stage = "test");
            let _s = span.enter();
            tracing::info!(target: "x.y", stage = "verify", message = "m");
        });
        assert_eq!(lines[0]["stage"], "verify");
        assert!(lines[0].get("fields").is_none());
    }
}
