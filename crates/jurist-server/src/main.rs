mod logging;
mod routes;
mod runs;

use std::{collections::VecDeque, sync::Arc, time::Instant};

use jurist_agent::{AnthropicBackend, ExaSearch, OllamaBackend};
use jurist_core::{
    agent::{CompletionProvider, SearchProvider},
    config::Config,
    precedents::PrecedentSearch,
    research::Researcher,
    stream::ResearchStreamManager,
};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{logging::BroadcastLayer, runs::RunRegistry};

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub researcher: Arc<Researcher>,
    pub precedents: PrecedentSearch,
    pub streams: Arc<ResearchStreamManager>,
    pub runs: RunRegistry,
    pub start_time: Instant,
    pub log_tx: broadcast::Sender<String>,
    pub log_ring: Arc<std::sync::Mutex<VecDeque<String>>>,
}

impl AppState {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        search: Arc<dyn SearchProvider>,
        config: &Config,
        log_tx: broadcast::Sender<String>,
        log_ring: Arc<std::sync::Mutex<VecDeque<String>>>,
    ) -> Self {
        Self {
            researcher: Arc::new(Researcher::new(
                Arc::clone(&completion),
                Arc::clone(&search),
                config.research.clone(),
            )),
            precedents: PrecedentSearch::new(completion, search, config.research.clone()),
            streams: ResearchStreamManager::new(),
            runs: RunRegistry::new(config.max_retained_runs),
            start_time: Instant::now(),
            log_tx,
            log_ring,
        }
    }
}

fn completion_backend(config: &Config) -> Arc<dyn CompletionProvider> {
    match config.backend.as_str() {
        "ollama" => {
            info!(url = %config.ollama_url, model = %config.ollama_model, "using ollama backend");
            Arc::new(OllamaBackend::new(&config.ollama_url, &config.ollama_model))
        }
        other => {
            if other != "anthropic" {
                warn!("unknown BACKEND {other:?}, using anthropic");
            }
            if config.anthropic_api_key.is_empty() {
                warn!("ANTHROPIC_API_KEY is not set; completions will fail");
            }
            info!(model = %config.model, "using anthropic backend");
            Arc::new(AnthropicBackend::new(&config.anthropic_api_key, &config.model))
        }
    }
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let (log_tx, _log_rx) = broadcast::channel::<String>(256);
    let log_ring = Arc::new(std::sync::Mutex::new(VecDeque::new()));
    let json_logs = config.log_format == "json";

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jurist_server=info,jurist_core=info,jurist_agent=info,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .with(BroadcastLayer {
            tx: log_tx.clone(),
            ring: Arc::clone(&log_ring),
        })
        .init();

    let completion = completion_backend(&config);
    if config.exa_api_key.is_empty() {
        warn!("EXA_API_KEY is not set; searches will fail");
    }
    let search: Arc<dyn SearchProvider> = Arc::new(ExaSearch::new(&config.exa_api_key));

    let state = Arc::new(AppState::new(completion, search, &config, log_tx, log_ring));
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.web_bind, config.web_port);
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
