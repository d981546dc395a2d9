use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::call::complete_with_retry;
use crate::{
    activity::ActivityTracker,
    agent::{CompletionProvider, CompletionPurpose, CompletionRequest},
    config::ResearchConfig,
    prompts,
    state::ResearchState,
    types::{ActivityKind, ActivityStatus, Finding, SearchResult},
};

/// The model's answer when a page has nothing relevant to the topic.
const NOTHING_RELEVANT: &str = "NONE";

pub struct FindingExtractor {
    completion: Arc<dyn CompletionProvider>,
    config: ResearchConfig,
}

impl FindingExtractor {
    pub fn new(completion: Arc<dyn CompletionProvider>, config: ResearchConfig) -> Self {
        Self { completion, config }
    }

    /// Summarize each not-yet-seen result into a finding. URLs already
    /// processed in this run are skipped without a model call. Findings are
    /// returned in result order; failed or irrelevant results yield none.
    pub async fn extract(
        &self,
        results: Vec<SearchResult>,
        state: &mut ResearchState,
        tracker: &ActivityTracker,
    ) -> Vec<Finding> {
        let fresh: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| {
                let new = state.claim_url(&r.url);
                if !new {
                    debug!(url = %r.url, "skipping already processed url");
                }
                new
            })
            .collect();

        let topic = state.topic.clone();
        let outcomes = join_all(fresh.iter().map(|r| self.extract_one(&topic, r, tracker))).await;

        let mut findings = Vec::new();
        for (finding, tokens) in outcomes {
            state.add_tokens(tokens);
            findings.extend(finding);
        }
        findings
    }

    async fn extract_one(
        &self,
        topic: &str,
        result: &SearchResult,
        tracker: &ActivityTracker,
    ) -> (Option<Finding>, u64) {
        let request = CompletionRequest {
            purpose: CompletionPurpose::Extraction,
            system: prompts::EXTRACTION_SYSTEM.to_string(),
            prompt: prompts::extraction_prompt(topic, &result.url, &result.content),
            json_output: false,
            max_tokens: self.config.completion_max_tokens,
        };
        let attempted = complete_with_retry(self.completion.as_ref(), &self.config, request, |text| {
            let summary = text.trim();
            if summary.is_empty() {
                Err("empty extraction".to_string())
            } else {
                Ok(summary.to_string())
            }
        })
        .await;

        let finding = match attempted.result {
            Ok(summary) if summary.trim_end_matches('.').eq_ignore_ascii_case(NOTHING_RELEVANT) => {
                debug!(url = %result.url, "nothing relevant");
                None
            }
            Ok(summary) => {
                tracker.add(
                    ActivityKind::Extract,
                    ActivityStatus::Complete,
                    format!("Extracted information from {}", result.url),
                );
                Some(Finding { summary, source: result.url.clone() })
            }
            Err(e) => {
                warn!(url = %result.url, "extraction failed: {e}");
                tracker.add(
                    ActivityKind::Extract,
                    ActivityStatus::Error,
                    format!("Failed to extract information from {}: {e}", result.url),
                );
                None
            }
        };
        (finding, attempted.tokens_used)
    }
}
