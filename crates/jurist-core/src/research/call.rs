use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    agent::{CompletionProvider, CompletionRequest},
    config::ResearchConfig,
    error::{CallError, ProviderError, ResearchError},
};

/// Outcome of a retried completion call. Tokens count every attempt,
/// including failed ones.
pub(crate) struct Attempted<T> {
    pub result: Result<T, CallError>,
    pub tokens_used: u64,
}

pub(crate) async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, CallError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(r) => r.map_err(CallError::from),
        Err(_) => Err(CallError::Timeout(timeout)),
    }
}

/// Run `fut` unless `cancel` fires first. Dropping `fut` releases whatever
/// requests it had in flight.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, ResearchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ResearchError::Cancelled),
        v = fut => Ok(v),
    }
}

/// Call the completion provider and parse its answer, retrying transport
/// failures, timeouts and unparseable output up to the configured attempts.
pub(crate) async fn complete_with_retry<T>(
    provider: &dyn CompletionProvider,
    config: &ResearchConfig,
    request: CompletionRequest,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Attempted<T> {
    let attempts = config.attempts();
    let mut tokens_used = 0u64;
    let mut last_err = CallError::Malformed("no attempt made".into());

    for attempt in 1..=attempts {
        match with_timeout(config.request_timeout, provider.complete(request.clone())).await {
            Ok(completion) => {
                tokens_used = tokens_used.saturating_add(completion.tokens_used);
                match parse(&completion.text) {
                    Ok(v) => return Attempted { result: Ok(v), tokens_used },
                    Err(msg) => {
                        warn!(
                            purpose = request.purpose.as_str(),
                            provider = provider.name(),
                            attempt,
                            "unparseable completion: {msg}"
                        );
                        last_err = CallError::Malformed(msg);
                    }
                }
            }
            Err(e) => {
                warn!(
                    purpose = request.purpose.as_str(),
                    provider = provider.name(),
                    attempt,
                    "completion failed: {e}"
                );
                last_err = e;
                if attempt < attempts {
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
            }
        }
    }

    Attempted { result: Err(last_err), tokens_used }
}

/// Strip a surrounding markdown code fence, if any.
pub(crate) fn strip_fences(text: &str) -> &str {
    let t = text.trim();
    if !t.starts_with("```") {
        return t;
    }
    let nl = match t.find('\n') {
        Some(i) => i,
        None => return t,
    };
    let inner = &t[nl + 1..];
    if inner.ends_with("```") {
        inner[..inner.len() - 3].trim_end()
    } else {
        inner
    }
}

/// Parse a JSON object out of model output, tolerating code fences and
/// prose around the object.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let t = strip_fences(text);
    match serde_json::from_str(t) {
        Ok(v) => Ok(v),
        Err(first) => {
            let (Some(start), Some(end)) = (t.find('{'), t.rfind('}')) else {
                return Err(format!("no JSON object in output: {first}"));
            };
            if end <= start {
                return Err(format!("no JSON object in output: {first}"));
            }
            serde_json::from_str(&t[start..=end]).map_err(|e| e.to_string())
        }
    }
}

/// Trim, drop blanks and duplicates (first occurrence wins), keep `max`.
pub(crate) fn normalize_queries(queries: Vec<String>, max: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for q in queries {
        let q = q.trim().to_string();
        if !q.is_empty() && !out.contains(&q) {
            out.push(q);
        }
        if out.len() >= max {
            break;
        }
    }
    out
}
