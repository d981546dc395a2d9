use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use jurist_core::{error::ResearchError, types::ResearchRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::{wrappers::UnboundedReceiverStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{runs::RunStatus, AppState};

// ── Error helpers ─────────────────────────────────────────────────────────

pub(crate) fn internal(e: impl std::fmt::Display) -> StatusCode {
    tracing::error!("internal error: {e}");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "success": false, "error": message }))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "error": "run not found" }))).into_response()
}

// ── Request body types ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct TopicBody {
    #[serde(default)]
    pub topic: String,
}

#[derive(Deserialize)]
pub(crate) struct PrecedentBody {
    #[serde(default)]
    pub query: String,
}

// ── Router ────────────────────────────────────────────────────────────────

pub(crate) fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(health))
        // Research
        .route("/api/research", post(research_stream))
        .route("/api/research/questions", post(clarifying_questions))
        .route("/api/research/runs", get(list_runs).post(create_run))
        .route("/api/research/runs/:id", get(get_run).delete(cancel_run))
        .route("/api/research/runs/:id/events", get(sse_run_events))
        // Precedents
        .route("/api/precedents", post(search_precedents))
        // SSE logs
        .route("/api/logs", get(sse_logs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn sse_response(
    stream: impl Stream<Item = String> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = stream.map(|data| Ok::<_, Infallible>(Event::default().data(data)));
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(std::time::Duration::from_secs(15))
            .text("ping"),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_s": state.start_time.elapsed().as_secs(),
    }))
}

/// Run research inline, streaming its events. The run is cancelled when
/// the client goes away.
async fn research_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Response {
    if request.topic.trim().is_empty() {
        return bad_request("Research topic is required");
    }
    info!(topic = %request.topic.trim(), "streaming research requested");

    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let researcher = Arc::clone(&state.researcher);
    tokio::spawn(async move {
        if let Err(ResearchError::Cancelled) = researcher.run(request, tx, cancel).await {
            info!("streaming research cancelled by client disconnect");
        }
    });

    let events = UnboundedReceiverStream::new(rx).map(move |event| {
        let _guard = &guard;
        event.to_json()
    });
    sse_response(events).into_response()
}

async fn create_run(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Response {
    if request.topic.trim().is_empty() {
        return bad_request("Research topic is required");
    }
    let id = Uuid::new_v4();
    let topic = request.topic.trim().to_string();
    let cancel = CancellationToken::new();

    state.streams.start(id).await;
    for pruned in state.runs.insert(id, topic.clone(), cancel.clone()).await {
        state.streams.remove(pruned).await;
    }
    info!(run_id = %id, topic = %topic, "background research started");

    let st = Arc::clone(&state);
    tokio::spawn(async move {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let forward = async {
            while let Some(event) = rx.recv().await {
                st.streams.push_event(id, &event).await;
            }
        };
        let (result, ()) = tokio::join!(st.researcher.run(request, tx, cancel), forward);

        match result {
            Ok(outcome) => {
                st.runs.finish(id, RunStatus::Completed, Some(outcome.summary), None).await;
            }
            Err(ResearchError::Cancelled) => {
                st.runs
                    .finish(id, RunStatus::Cancelled, None, Some(ResearchError::Cancelled.to_string()))
                    .await;
            }
            Err(e) => {
                warn!(run_id = %id, "background research failed: {e}");
                st.runs.finish(id, RunStatus::Failed, None, Some(e.to_string())).await;
            }
        }
        st.streams.end_run(id).await;
    });

    (StatusCode::CREATED, Json(json!({ "id": id }))).into_response()
}

async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!(state.runs.list().await))
}

async fn get_run(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.runs.get(id).await {
        Some(run) => Json(run).into_response(),
        None => not_found(),
    }
}

async fn cancel_run(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.runs.cancel(id).await {
        Some(cancelled) => {
            info!(run_id = %id, cancelled, "cancel requested");
            Json(json!({ "id": id, "cancelled": cancelled })).into_response()
        }
        None => not_found(),
    }
}

// Run event SSE: history replay then live tail

async fn sse_run_events(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    if state.runs.get(id).await.is_none() {
        return not_found();
    }
    let (history, live_rx) = state.streams.subscribe(id).await;
    sse_response(replay_then_tail(history, live_rx)).into_response()
}

async fn clarifying_questions(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TopicBody>,
) -> Response {
    let topic = body.topic.trim();
    if topic.is_empty() {
        return bad_request("Research topic is required");
    }
    let questions = state
        .researcher
        .planner()
        .clarifying_questions(topic)
        .await
        .unwrap_or_else(|e| {
            warn!(topic, "clarifying questions failed: {e}");
            Vec::new()
        });
    Json(json!({ "questions": questions })).into_response()
}

async fn search_precedents(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PrecedentBody>,
) -> Response {
    let query = body.query.trim();
    if query.is_empty() {
        return bad_request("Search query is required");
    }
    match state.precedents.search(query).await {
        Ok(precedents) => Json(json!({ "success": true, "precedents": precedents })).into_response(),
        Err(e) => (
            internal(&e),
            Json(json!({
                "success": false,
                "error": "Failed to search precedents",
                "message": e.to_string(),
            })),
        )
            .into_response(),
    }
}

// SSE logs: replays ring buffer history then streams live events

async fn sse_logs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Subscribe before snapshotting ring to avoid race
    let live_rx = state.log_tx.subscribe();
    let history: Vec<String> = state
        .log_ring
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .cloned()
        .collect();
    sse_response(replay_then_tail(history, Some(live_rx)))
}

/// Yield `history`, then whatever arrives on `live_rx` until it closes.
/// Lagged receivers skip ahead rather than ending the stream.
fn replay_then_tail(
    history: Vec<String>,
    live_rx: Option<broadcast::Receiver<String>>,
) -> UnboundedReceiverStream<String> {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        for line in history {
            if tx.send(line).is_err() {
                return;
            }
        }
        let Some(mut live_rx) = live_rx else { return };
        loop {
            match live_rx.recv().await {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        return;
                    }
                }
                // Logging here would feed the log stream it is tailing.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    });
    UnboundedReceiverStream::new(rx)
}
