use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::call::with_timeout;
use crate::{
    activity::ActivityTracker,
    agent::{RawSearchHit, SearchOptions, SearchProvider},
    config::ResearchConfig,
    error::CallError,
    types::{ActivityKind, ActivityStatus, SearchResult},
};

pub struct SearchStage {
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
}

impl SearchStage {
    pub fn new(search: Arc<dyn SearchProvider>, config: ResearchConfig) -> Self {
        Self { search, config }
    }

    /// Search one query. At most `max_search_results` results, each with
    /// content truncated to `max_content_chars`.
    pub async fn search(
        &self,
        query: &str,
        tracker: &ActivityTracker,
    ) -> Result<Vec<SearchResult>, CallError> {
        tracker.add(
            ActivityKind::Search,
            ActivityStatus::Pending,
            format!("Searching for: {query}"),
        );
        let options = SearchOptions::from_config(&self.config);
        match with_timeout(self.config.request_timeout, self.search.search(query, &options)).await {
            Ok(hits) => {
                let results = normalize_hits(hits, &self.config);
                info!(query, provider = self.search.name(), results = results.len(), "search complete");
                tracker.add(
                    ActivityKind::Search,
                    ActivityStatus::Complete,
                    format!("Found {} results for: {query}", results.len()),
                );
                Ok(results)
            }
            Err(e) => {
                warn!(query, provider = self.search.name(), "search failed: {e}");
                tracker.add(
                    ActivityKind::Search,
                    ActivityStatus::Error,
                    format!("Search failed for: {query}: {e}"),
                );
                Err(e)
            }
        }
    }

    /// Search every query concurrently. A failing query contributes nothing
    /// and never affects its siblings. Results are flattened in query order.
    pub async fn search_all(&self, queries: &[String], tracker: &ActivityTracker) -> Vec<SearchResult> {
        let outcomes = join_all(queries.iter().map(|q| self.search(q, tracker))).await;
        outcomes
            .into_iter()
            .filter_map(Result::ok)
            .flatten()
            .collect()
    }
}

/// Provider hits → search results. Hits without a URL are dropped; title
/// falls back to the URL and content to `text`.
pub fn normalize_hits(hits: Vec<RawSearchHit>, config: &ResearchConfig) -> Vec<SearchResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let url = hit.url.filter(|u| !u.trim().is_empty())?;
            let content = hit
                .content
                .filter(|c| !c.trim().is_empty())
                .or(hit.text)
                .unwrap_or_default();
            Some(SearchResult {
                title: hit.title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| url.clone()),
                content: truncate_chars(&content, config.max_content_chars),
                url,
            })
        })
        .take(config.max_search_results)
        .collect()
}

pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
