// Per-run stream manager: history replay, live tail, end-of-run behaviour.

use chrono::Utc;
use jurist_core::{
    stream::ResearchStreamManager,
    types::{Activity, ActivityKind, ActivityStatus, ResearchEvent, RunSummary},
};
use uuid::Uuid;

fn activity(message: &str) -> ResearchEvent {
    ResearchEvent::Activity(Activity {
        kind: ActivityKind::Search,
        status: ActivityStatus::Pending,
        message: message.to_string(),
        timestamp: Utc::now(),
    })
}

// =============================================================================
// History replay
// =============================================================================

#[tokio::test]
async fn pushed_events_are_replayed_in_order() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;

    manager.push_event(id, &activity("first")).await;
    manager.push_event(id, &activity("second")).await;

    let (history, rx) = manager.subscribe(id).await;
    assert_eq!(history.len(), 2);
    assert!(history[0].contains("first"));
    assert!(history[1].contains("second"));
    assert!(rx.is_some(), "running stream must offer a live receiver");

    let v: serde_json::Value = serde_json::from_str(&history[0]).unwrap();
    assert_eq!(v["type"], "activity");
    assert_eq!(v["content"]["type"], "search");
}

#[tokio::test]
async fn unknown_run_has_no_history_and_no_receiver() {
    let manager = ResearchStreamManager::new();
    let (history, rx) = manager.subscribe(Uuid::new_v4()).await;
    assert!(history.is_empty());
    assert!(rx.is_none());
}

#[tokio::test]
async fn push_to_unknown_run_is_a_noop() {
    let manager = ResearchStreamManager::new();
    manager.push_event(Uuid::new_v4(), &activity("lost")).await;
}

// =============================================================================
// Live tail
// =============================================================================

#[tokio::test]
async fn subscribers_receive_live_events() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;

    let (_, rx) = manager.subscribe(id).await;
    let mut rx = rx.unwrap();
    manager
        .push_event(id, &ResearchEvent::Error { message: "boom".into() })
        .await;

    let line = rx.recv().await.unwrap();
    assert!(line.contains(r#""type":"error""#));
    assert!(line.contains("boom"));
}

// =============================================================================
// End of run
// =============================================================================

#[tokio::test]
async fn ended_run_keeps_history_without_receiver() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;
    manager.push_event(id, &activity("done")).await;
    manager.end_run(id).await;

    manager.push_event(id, &activity("late")).await;

    let (history, rx) = manager.subscribe(id).await;
    assert_eq!(history.len(), 1);
    assert!(rx.is_none());
}

#[tokio::test]
async fn ending_closes_live_receivers() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;
    let (_, rx) = manager.subscribe(id).await;
    let mut rx = rx.unwrap();

    manager.end_run(id).await;
    assert!(rx.recv().await.is_err(), "receiver must close when the run ends");
}

#[tokio::test]
async fn summary_ends_the_stream() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;
    let (_, rx) = manager.subscribe(id).await;
    let mut rx = rx.unwrap();

    manager.push_event(id, &activity("searching")).await;
    let summary = RunSummary {
        success: true,
        iterations_completed: 1,
        findings_count: 2,
        tokens_used: 40,
        completed_steps: 3,
        sources: vec![],
    };
    manager.push_event(id, &ResearchEvent::Summary(summary)).await;
    manager.push_event(id, &activity("after summary")).await;

    assert!(rx.recv().await.unwrap().contains("searching"));
    assert!(rx.recv().await.unwrap().contains(r#""type":"summary""#));
    assert!(rx.recv().await.is_err(), "no live events after the summary");

    let (history, live) = manager.subscribe(id).await;
    assert_eq!(history.len(), 2);
    assert!(live.is_none());
}

#[tokio::test]
async fn removed_run_is_forgotten() {
    let manager = ResearchStreamManager::new();
    let id = Uuid::new_v4();
    manager.start(id).await;
    manager.push_event(id, &activity("x")).await;
    manager.remove(id).await;

    let (history, _) = manager.subscribe(id).await;
    assert!(history.is_empty());
}
