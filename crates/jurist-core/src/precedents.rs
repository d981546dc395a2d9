use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    agent::{CompletionProvider, CompletionPurpose, CompletionRequest, SearchOptions, SearchProvider},
    config::ResearchConfig,
    error::CallError,
    prompts,
    research::{call, search::normalize_hits},
    types::SearchResult,
};

/// Characters of each result passed to the analysis prompt.
const RESULT_EXCERPT_CHARS: usize = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecedentReport {
    pub results: Vec<SearchResult>,
    pub analysis: String,
}

/// One-shot case-law lookup: a single search plus a per-case analysis.
pub struct PrecedentSearch {
    completion: Arc<dyn CompletionProvider>,
    search: Arc<dyn SearchProvider>,
    config: ResearchConfig,
}

impl PrecedentSearch {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Self {
        Self { completion, search, config }
    }

    /// A failed search is an error. A failed analysis still returns the
    /// results, with the analysis explaining what went wrong.
    pub async fn search(&self, query: &str) -> Result<PrecedentReport, CallError> {
        let query = query.trim();
        let search_query = precedent_query(query);
        let options = SearchOptions::from_config(&self.config);
        let hits = call::with_timeout(self.config.request_timeout, self.search.search(&search_query, &options))
            .await
            .inspect_err(|e| warn!(query, provider = self.search.name(), "precedent search failed: {e}"))?;
        let results = normalize_hits(hits, &self.config);
        info!(query, results = results.len(), "precedent search complete");

        if results.is_empty() {
            return Ok(PrecedentReport {
                results,
                analysis: "No precedents were found for this query.".into(),
            });
        }

        let request = CompletionRequest {
            purpose: CompletionPurpose::Precedent,
            system: prompts::PRECEDENT_SYSTEM.to_string(),
            prompt: prompts::precedent_prompt(query, &render_results(&results)),
            json_output: false,
            max_tokens: self.config.completion_max_tokens,
        };
        let attempted = call::complete_with_retry(self.completion.as_ref(), &self.config, request, |text| {
            let t = text.trim();
            if t.is_empty() {
                Err("empty analysis".to_string())
            } else {
                Ok(t.to_string())
            }
        })
        .await;

        let analysis = attempted.result.unwrap_or_else(|e| {
            warn!(query, "precedent analysis failed: {e}");
            format!("Analysis unavailable ({e}); the search results are listed without commentary.")
        });
        Ok(PrecedentReport { results, analysis })
    }
}

pub fn precedent_query(query: &str) -> String {
    format!("legal precedent {query} case law jurisdiction court ruling")
}

fn render_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "{}. {}\nURL: {}\n{}",
                i + 1,
                r.title,
                r.url,
                crate::research::search::truncate_chars(&r.content, RESULT_EXCERPT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_is_wrapped_in_legal_terms() {
        assert_eq!(
            precedent_query("anticipatory bail"),
            "legal precedent anticipatory bail case law jurisdiction court ruling"
        );
    }

    #[test]
    fn render_numbers_results() {
        let rendered = render_results(&[
            SearchResult { title: "A".into(), url: "https://a.in".into(), content: "x".into() },
            SearchResult { title: "B".into(), url: "https://b.in".into(), content: "y".into() },
        ]);
        assert!(rendered.starts_with("1. A\nURL: https://a.in\nx"));
        assert!(rendered.contains("2. B"));
    }
}
