use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jurist_core::types::RunSummary;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

struct RunEntry {
    topic: String,
    status: RunStatus,
    started_at: DateTime<Utc>,
    summary: Option<RunSummary>,
    error: Option<String>,
    cancel: CancellationToken,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub id: Uuid,
    pub topic: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Background runs started over HTTP. Finished runs beyond `max_retained`
/// are forgotten oldest-first; running ones are never pruned.
pub struct RunRegistry {
    runs: Mutex<HashMap<Uuid, RunEntry>>,
    max_retained: usize,
}

impl RunRegistry {
    pub fn new(max_retained: usize) -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            max_retained,
        }
    }

    /// Register a new running run. Returns the ids pruned to make room.
    pub async fn insert(&self, id: Uuid, topic: String, cancel: CancellationToken) -> Vec<Uuid> {
        let mut runs = self.runs.lock().await;
        runs.insert(id, RunEntry {
            topic,
            status: RunStatus::Running,
            started_at: Utc::now(),
            summary: None,
            error: None,
            cancel,
        });

        let mut finished: Vec<(DateTime<Utc>, Uuid)> = runs
            .iter()
            .filter(|(_, r)| r.status != RunStatus::Running)
            .map(|(id, r)| (r.started_at, *id))
            .collect();
        if finished.len() <= self.max_retained {
            return Vec::new();
        }
        finished.sort();
        let excess = finished.len() - self.max_retained;
        let pruned: Vec<Uuid> = finished.into_iter().take(excess).map(|(_, id)| id).collect();
        for id in &pruned {
            runs.remove(id);
        }
        pruned
    }

    pub async fn finish(&self, id: Uuid, status: RunStatus, summary: Option<RunSummary>, error: Option<String>) {
        if let Some(r) = self.runs.lock().await.get_mut(&id) {
            r.status = status;
            r.summary = summary;
            r.error = error;
        }
    }

    /// Cancel a run. `None` when the id is unknown, otherwise whether it was
    /// still running.
    pub async fn cancel(&self, id: Uuid) -> Option<bool> {
        let runs = self.runs.lock().await;
        let r = runs.get(&id)?;
        let running = r.status == RunStatus::Running;
        if running {
            r.cancel.cancel();
        }
        Some(running)
    }

    pub async fn get(&self, id: Uuid) -> Option<RunView> {
        self.runs.lock().await.get(&id).map(|r| view(id, r))
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<RunView> {
        let runs = self.runs.lock().await;
        let mut views: Vec<RunView> = runs.iter().map(|(id, r)| view(*id, r)).collect();
        views.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        views
    }
}

fn view(id: Uuid, r: &RunEntry) -> RunView {
    RunView {
        id,
        topic: r.topic.clone(),
        status: r.status,
        started_at: r.started_at,
        summary: r.summary.clone(),
        error: r.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_only_affects_running_runs() {
        let registry = RunRegistry::new(4);
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        registry.insert(id, "bail".into(), token.clone()).await;

        assert_eq!(registry.cancel(id).await, Some(true));
        assert!(token.is_cancelled());

        registry.finish(id, RunStatus::Cancelled, None, Some("cancelled".into())).await;
        assert_eq!(registry.cancel(id).await, Some(false));
        assert_eq!(registry.cancel(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn finished_runs_are_pruned_oldest_first() {
        let registry = RunRegistry::new(1);
        let old = Uuid::new_v4();
        let newer = Uuid::new_v4();
        registry.insert(old, "old".into(), CancellationToken::new()).await;
        registry.finish(old, RunStatus::Completed, None, None).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.insert(newer, "newer".into(), CancellationToken::new()).await;
        registry.finish(newer, RunStatus::Failed, None, Some("x".into())).await;

        let running = Uuid::new_v4();
        let pruned = registry.insert(running, "running".into(), CancellationToken::new()).await;
        assert_eq!(pruned, vec![old]);
        assert!(registry.get(old).await.is_none());
        assert!(registry.get(newer).await.is_some());
        assert_eq!(registry.get(running).await.unwrap().status, RunStatus::Running);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let registry = RunRegistry::new(8);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        registry.insert(a, "a".into(), CancellationToken::new()).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        registry.insert(b, "b".into(), CancellationToken::new()).await;
        let ids: Vec<Uuid> = registry.list().await.into_iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![b, a]);
    }
}
