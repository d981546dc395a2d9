// Precedent lookup: search failures, analysis failures and empty results.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jurist_core::{
    agent::{Completion, CompletionProvider, CompletionRequest, RawSearchHit, SearchOptions, SearchProvider},
    config::ResearchConfig,
    error::{CallError, ProviderError},
    precedents::PrecedentSearch,
};

// =============================================================================
// Providers
// =============================================================================

/// Returns `answer`, or fails with a request error when it is `None`.
struct FixedCompletion {
    answer: Option<String>,
    calls: AtomicU32,
}

impl FixedCompletion {
    fn answering(text: &str) -> Arc<Self> {
        Arc::new(Self { answer: Some(text.into()), calls: AtomicU32::new(0) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { answer: None, calls: AtomicU32::new(0) })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for FixedCompletion {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.answer {
            Some(text) => Ok(Completion { text: text.clone(), tokens_used: 5 }),
            None => Err(ProviderError::Status { status: 529, body: "overloaded".into() }),
        }
    }
}

/// Returns `hits`, or fails with a status error when it is `None`.
struct FixedSearch {
    hits: Option<Vec<RawSearchHit>>,
}

#[async_trait]
impl SearchProvider for FixedSearch {
    fn name(&self) -> &str {
        "fixed-search"
    }

    async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<Vec<RawSearchHit>, ProviderError> {
        self.hits
            .clone()
            .ok_or_else(|| ProviderError::Status { status: 401, body: "bad key".into() })
    }
}

fn arnesh_kumar() -> Vec<RawSearchHit> {
    vec![RawSearchHit {
        title: Some("Arnesh Kumar v. State of Bihar".into()),
        url: Some("https://indiankanoon.org/doc/2982624".into()),
        text: Some("Guidelines on arrest under Section 41 CrPC.".into()),
        content: None,
    }]
}

fn config() -> ResearchConfig {
    ResearchConfig { request_timeout: Duration::from_secs(5), max_retry_attempts: 1, ..Default::default() }
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn results_come_with_analysis() {
    let completion = FixedCompletion::answering("Arnesh Kumar restricts automatic arrests.");
    let search = Arc::new(FixedSearch { hits: Some(arnesh_kumar()) });
    let report = PrecedentSearch::new(completion.clone(), search, config())
        .search("arrest guidelines 498A")
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.analysis, "Arnesh Kumar restricts automatic arrests.");
    assert_eq!(completion.calls(), 1);
}

#[tokio::test]
async fn search_failure_is_an_error() {
    let completion = FixedCompletion::answering("unused");
    let search = Arc::new(FixedSearch { hits: None });
    let err = PrecedentSearch::new(completion.clone(), search, config())
        .search("arrest guidelines 498A")
        .await
        .unwrap_err();

    assert!(matches!(err, CallError::Provider(ProviderError::Status { status: 401, .. })));
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn analysis_failure_keeps_results() {
    let completion = FixedCompletion::failing();
    let search = Arc::new(FixedSearch { hits: Some(arnesh_kumar()) });
    let report = PrecedentSearch::new(completion, search, config())
        .search("arrest guidelines 498A")
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].title, "Arnesh Kumar v. State of Bihar");
    assert!(report.analysis.starts_with("Analysis unavailable"), "{}", report.analysis);
}

#[tokio::test]
async fn empty_results_skip_analysis() {
    let completion = FixedCompletion::answering("unused");
    let search = Arc::new(FixedSearch { hits: Some(Vec::new()) });
    let report = PrecedentSearch::new(completion.clone(), search, config())
        .search("an obscure question")
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.analysis, "No precedents were found for this query.");
    assert_eq!(completion.calls(), 0);
}
