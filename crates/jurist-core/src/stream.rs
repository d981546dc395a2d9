use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::types::ResearchEvent;

const MAX_HISTORY_LINES: usize = 10_000;

struct RunStream {
    tx: broadcast::Sender<String>,
    history: VecDeque<String>,
    ended: bool,
}

/// Per-run event stream manager.
///
/// Background runs push their serialized events here. Clients subscribe to
/// get history replay + live tail for any run, including runs that have
/// already finished.
pub struct ResearchStreamManager {
    streams: Mutex<HashMap<Uuid, RunStream>>,
}

impl ResearchStreamManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            streams: Mutex::new(HashMap::new()),
        })
    }

    /// Begin streaming for a run (resets any prior state).
    pub async fn start(&self, run_id: Uuid) {
        let (tx, _) = broadcast::channel(512);
        let mut map = self.streams.lock().await;
        map.insert(run_id, RunStream {
            tx,
            history: VecDeque::new(),
            ended: false,
        });
    }

    /// Push an event; a summary or error also ends the stream.
    pub async fn push_event(&self, run_id: Uuid, event: &ResearchEvent) {
        self.push_line(run_id, event.to_json()).await;
        if event.is_terminal() {
            self.end_run(run_id).await;
        }
    }

    /// Push a JSON line to the run's stream. Ignored once the run has ended.
    pub async fn push_line(&self, run_id: Uuid, line: String) {
        let mut map = self.streams.lock().await;
        if let Some(s) = map.get_mut(&run_id) {
            if s.ended {
                return;
            }
            let _ = s.tx.send(line.clone());
            s.history.push_back(line);
            if s.history.len() > MAX_HISTORY_LINES {
                s.history.pop_front();
            }
        }
    }

    /// Mark a run stream as ended (keeps history, drops live subscribers).
    pub async fn end_run(&self, run_id: Uuid) {
        let mut map = self.streams.lock().await;
        if let Some(s) = map.get_mut(&run_id) {
            s.ended = true;
            let (tx, _) = broadcast::channel(1);
            s.tx = tx;
        }
    }

    pub async fn remove(&self, run_id: Uuid) {
        self.streams.lock().await.remove(&run_id);
    }

    /// Subscribe to a run's stream.
    /// Returns (history_snapshot, live_receiver).
    /// If the stream has ended or doesn't exist, receiver is None.
    pub async fn subscribe(
        &self,
        run_id: Uuid,
    ) -> (Vec<String>, Option<broadcast::Receiver<String>>) {
        let map = self.streams.lock().await;
        match map.get(&run_id) {
            Some(s) => {
                let history: Vec<String> = s.history.iter().cloned().collect();
                let rx = if !s.ended { Some(s.tx.subscribe()) } else { None };
                (history, rx)
            }
            None => (Vec::new(), None),
        }
    }
}
