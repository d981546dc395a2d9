use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{config::ResearchConfig, error::ProviderError};

/// Which pipeline stage a completion serves. Backends use it for logging;
/// test doubles script their answers by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPurpose {
    Planning,
    Extraction,
    Analysis,
    Report,
    Clarification,
    Precedent,
}

impl CompletionPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Extraction => "extraction",
            Self::Analysis => "analysis",
            Self::Report => "report",
            Self::Clarification => "clarification",
            Self::Precedent => "precedent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub purpose: CompletionPurpose,
    pub system: String,
    pub prompt: String,
    /// Structured-output mode: the answer must be a single JSON object.
    pub json_output: bool,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u64,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOptions {
    pub num_results: usize,
    pub search_type: String,
    /// Upper bound on page text requested per result.
    pub max_content_chars: usize,
}

impl SearchOptions {
    pub fn from_config(config: &ResearchConfig) -> Self {
        Self {
            num_results: config.max_search_results,
            search_type: config.search_type.clone(),
            max_content_chars: config.max_content_chars,
        }
    }
}

/// A search hit as providers return it; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSearchHit {
    pub title: Option<String>,
    pub url: Option<String>,
    pub text: Option<String>,
    pub content: Option<String>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawSearchHit>, ProviderError>;
}
