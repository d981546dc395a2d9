use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::{Activity, ActivityKind, ActivityStatus, ResearchEvent};

/// Fire-and-forget progress reporting for one run.
///
/// Pushes typed events into the run's channel. A closed channel (observer
/// went away) is logged once and otherwise ignored; it never fails the run.
pub struct ActivityTracker {
    tx: mpsc::UnboundedSender<ResearchEvent>,
    completed_steps: AtomicU32,
    closed_logged: AtomicBool,
}

impl ActivityTracker {
    pub fn new(tx: mpsc::UnboundedSender<ResearchEvent>) -> Self {
        Self {
            tx,
            completed_steps: AtomicU32::new(0),
            closed_logged: AtomicBool::new(false),
        }
    }

    pub fn add(&self, kind: ActivityKind, status: ActivityStatus, message: impl Into<String>) {
        if status == ActivityStatus::Complete {
            self.completed_steps.fetch_add(1, Ordering::Relaxed);
        }
        let message = message.into();
        debug!(kind = ?kind, status = ?status, "{message}");
        self.emit(ResearchEvent::Activity(Activity {
            kind,
            status,
            message,
            timestamp: Utc::now(),
        }));
    }

    /// Push a non-activity event (report, summary, error).
    pub fn emit(&self, event: ResearchEvent) {
        if self.tx.send(event).is_err() && !self.closed_logged.swap(true, Ordering::Relaxed) {
            warn!("research event stream closed; continuing without observers");
        }
    }

    pub fn completed_steps(&self) -> u32 {
        self.completed_steps.load(Ordering::Relaxed)
    }
}
