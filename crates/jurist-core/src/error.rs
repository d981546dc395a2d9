use std::time::Duration;

use thiserror::Error;

/// Failure reported by an external completion or search provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode provider response: {0}")]
    Decode(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Failure of one network-bound pipeline call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("malformed model output: {0}")]
    Malformed(String),
}

/// Errors that end a run without a report.
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("invalid research request: {0}")]
    InvalidRequest(String),

    #[error("research run cancelled")]
    Cancelled,
}
