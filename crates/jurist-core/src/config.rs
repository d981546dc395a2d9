use std::collections::HashMap;
use std::time::Duration;

use anyhow::Result;

/// Bounds and tuning for one research run. Passed to the orchestrator at
/// construction; `Default` matches the documented env defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub max_iterations: u32,
    pub max_search_results: usize,
    pub max_content_chars: usize,
    /// Total attempts per completion call (min 1).
    pub max_retry_attempts: u32,
    pub request_timeout: Duration,
    pub search_type: String,
    /// Confidence needed for a sufficient verdict at iteration 1.
    pub sufficiency_threshold: f64,
    /// Threshold reduction for every iteration after the first.
    pub leniency_step: f64,
    pub max_followup_queries: usize,
    pub completion_max_tokens: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 4,
            max_search_results: 8,
            max_content_chars: 40_000,
            max_retry_attempts: 3,
            request_timeout: Duration::from_secs(120),
            search_type: "auto".into(),
            sufficiency_threshold: 0.8,
            leniency_step: 0.1,
            max_followup_queries: 3,
            completion_max_tokens: 4096,
        }
    }
}

impl ResearchConfig {
    pub fn attempts(&self) -> u32 {
        self.max_retry_attempts.max(1)
    }

    /// Confidence a model must report at `iteration` (1-based) for the
    /// verdict to count as sufficient. Never increases with iteration.
    pub fn sufficiency_threshold_at(&self, iteration: u32) -> f64 {
        let steps = iteration.saturating_sub(1) as f64;
        (self.sufficiency_threshold - self.leniency_step.max(0.0) * steps).clamp(0.0, 1.0)
    }
}

/// Full application configuration.
/// Secrets (API keys) and everything else come from env first, then `.env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub research: ResearchConfig,

    // Completion backend
    /// "anthropic" (default) or "ollama".
    pub backend: String,
    pub model: String,
    pub anthropic_api_key: String,
    pub ollama_url: String,
    pub ollama_model: String,

    // Search
    pub exa_api_key: String,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    /// Finished background runs kept for status/replay.
    pub max_retained_runs: usize,
    /// "json" for JSON log lines, anything else for human-readable.
    pub log_format: String,
}

pub fn parse_dotenv(path: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let Ok(contents) = std::fs::read_to_string(path) else {
        return map;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim().trim_matches('"');
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn get_str(key: &str, vars: &HashMap<String, String>, default: &str) -> String {
    vars.get(key).cloned().unwrap_or_else(|| default.to_string())
}

fn get_parsed<T: std::str::FromStr>(key: &str, vars: &HashMap<String, String>, default: T) -> T {
    vars.get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut vars = parse_dotenv(".env");
        // Process env wins over .env
        vars.extend(std::env::vars());
        Ok(Self::from_vars(&vars))
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let d = ResearchConfig::default();
        let research = ResearchConfig {
            max_iterations: get_parsed("MAX_ITERATIONS", vars, d.max_iterations),
            max_search_results: get_parsed("MAX_SEARCH_RESULTS", vars, d.max_search_results),
            max_content_chars: get_parsed("MAX_CONTENT_CHARS", vars, d.max_content_chars),
            max_retry_attempts: get_parsed("MAX_RETRY_ATTEMPTS", vars, d.max_retry_attempts),
            request_timeout: Duration::from_secs(get_parsed(
                "REQUEST_TIMEOUT_S",
                vars,
                d.request_timeout.as_secs(),
            )),
            search_type: get_str("SEARCH_TYPE", vars, &d.search_type),
            sufficiency_threshold: get_parsed("SUFFICIENCY_THRESHOLD", vars, d.sufficiency_threshold),
            leniency_step: get_parsed("LENIENCY_STEP", vars, d.leniency_step),
            max_followup_queries: get_parsed("MAX_FOLLOWUP_QUERIES", vars, d.max_followup_queries),
            completion_max_tokens: get_parsed("COMPLETION_MAX_TOKENS", vars, d.completion_max_tokens),
        };

        Config {
            research,
            backend: get_str("BACKEND", vars, "anthropic"),
            model: get_str("MODEL", vars, "claude-sonnet-4-6"),
            anthropic_api_key: get_str("ANTHROPIC_API_KEY", vars, ""),
            ollama_url: get_str("OLLAMA_URL", vars, "http://localhost:11434"),
            ollama_model: get_str("OLLAMA_MODEL", vars, "llama3.1"),
            exa_api_key: get_str("EXA_API_KEY", vars, ""),
            web_bind: get_str("WEB_BIND", vars, "127.0.0.1"),
            web_port: get_parsed("WEB_PORT", vars, 3131),
            max_retained_runs: get_parsed("MAX_RETAINED_RUNS", vars, 64),
            log_format: get_str("LOG_FORMAT", vars, "pretty"),
        }
    }
}
