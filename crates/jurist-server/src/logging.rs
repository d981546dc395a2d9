use std::{collections::VecDeque, fmt::Write as _, sync::Arc};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{field::Field, Level};

pub(crate) const LOG_RING_CAPACITY: usize = 500;

/// Mirrors log events into the `/api/logs` SSE stream and its replay ring.
pub(crate) struct BroadcastLayer {
    /// Live feed for connected `/api/logs` clients; sends with no
    /// subscribers are dropped.
    pub tx: broadcast::Sender<String>,
    /// The last `LOG_RING_CAPACITY` lines, replayed to each new client.
    pub ring: Arc<std::sync::Mutex<VecDeque<String>>>,
}

/// One line of the log stream as clients see it.
#[derive(Serialize)]
struct LogLine<'a> {
    ts: i64,
    level: &'static str,
    message: &'a str,
    category: &'static str,
}

/// Collects the `message` field of an event.
#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }

    // `format_args!` messages arrive here and print without quotes.
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.0, "{value:?}");
        }
    }
}

/// Label shown to log clients; trace events are not forwarded.
fn level_label(level: &Level) -> Option<&'static str> {
    match *level {
        Level::ERROR => Some("err"),
        Level::WARN => Some("warn"),
        Level::INFO => Some("info"),
        Level::DEBUG => Some("debug"),
        Level::TRACE => None,
    }
}

/// Research pipeline, provider adapters, or everything else.
pub(crate) fn category(target: &str) -> &'static str {
    if target.starts_with("jurist_core::research") || target.starts_with("jurist_core::precedents") {
        "research"
    } else if target.starts_with("jurist_agent") {
        "provider"
    } else {
        "system"
    }
}

impl BroadcastLayer {
    fn publish(&self, line: String) {
        let _ = self.tx.send(line.clone());
        let mut ring = self.ring.lock().unwrap_or_else(|e| e.into_inner());
        if ring.len() == LOG_RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(line);
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for BroadcastLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let meta = event.metadata();
        let Some(level) = level_label(meta.level()) else {
            return;
        };
        let mut message = Message::default();
        event.record(&mut message);

        let line = LogLine {
            ts: chrono::Utc::now().timestamp(),
            level,
            message: &message.0,
            category: category(meta.target()),
        };
        if let Ok(json) = serde_json::to_string(&line) {
            self.publish(json);
        }
    }
}
