use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::call::{complete_with_retry, normalize_queries, parse_json};
use crate::{
    activity::ActivityTracker,
    agent::{CompletionProvider, CompletionPurpose, CompletionRequest},
    config::ResearchConfig,
    prompts,
    state::ResearchState,
    types::{ActivityKind, ActivityStatus, AnalysisResult},
};

/// Raw analyzer verdict as the model writes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResponse {
    pub sufficient: bool,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default, alias = "searchQueries", alias = "nextQueries")]
    pub queries: Vec<String>,
}

pub struct SufficiencyAnalyzer {
    completion: Arc<dyn CompletionProvider>,
    config: ResearchConfig,
}

impl SufficiencyAnalyzer {
    pub fn new(completion: Arc<dyn CompletionProvider>, config: ResearchConfig) -> Self {
        Self { completion, config }
    }

    /// Decide whether the findings so far are enough for a report. The
    /// iteration number loosens the bar as the run nears its ceiling.
    /// An unusable model answer counts as "insufficient, nothing to search".
    pub async fn analyze(
        &self,
        state: &mut ResearchState,
        current_queries: &[String],
        iteration: u32,
        tracker: &ActivityTracker,
    ) -> AnalysisResult {
        let content = state.findings_text();
        let prompt = prompts::analysis_prompt(
            &state.topic,
            &state.clarifications_text,
            &content,
            &state.query_history,
            iteration,
            self.config.max_iterations,
            state.findings.len(),
        );
        let request = CompletionRequest {
            purpose: CompletionPurpose::Analysis,
            system: prompts::analysis_system(),
            prompt,
            json_output: true,
            max_tokens: self.config.completion_max_tokens,
        };
        let attempted = complete_with_retry(
            self.completion.as_ref(),
            &self.config,
            request,
            parse_json::<AnalysisResponse>,
        )
        .await;
        state.add_tokens(attempted.tokens_used);

        match attempted.result {
            Ok(response) => {
                let result = apply_leniency(response, iteration, &self.config);
                info!(
                    topic = %state.topic,
                    iteration,
                    queries = current_queries.len(),
                    sufficient = result.sufficient,
                    followups = result.queries.len(),
                    "sufficiency analysis"
                );
                result
            }
            Err(e) => {
                warn!(topic = %state.topic, iteration, "sufficiency analysis failed: {e}");
                tracker.add(
                    ActivityKind::Analyze,
                    ActivityStatus::Error,
                    format!("Could not analyze research progress: {e}"),
                );
                AnalysisResult::default()
            }
        }
    }
}

/// Turn the model's verdict into the run's decision. A reported confidence
/// at or above the iteration's threshold counts as sufficient even if the
/// model said otherwise. Sufficient verdicts carry no follow-up queries.
pub fn apply_leniency(response: AnalysisResponse, iteration: u32, config: &ResearchConfig) -> AnalysisResult {
    let threshold = config.sufficiency_threshold_at(iteration);
    let confident = response.confidence.is_some_and(|c| c >= threshold);
    let sufficient = response.sufficient || confident;
    let queries = if sufficient {
        Vec::new()
    } else {
        normalize_queries(response.queries, config.max_followup_queries)
    };
    AnalysisResult { sufficient, gaps: response.gaps, queries }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(sufficient: bool, confidence: Option<f64>) -> AnalysisResponse {
        AnalysisResponse {
            sufficient,
            confidence,
            gaps: vec!["state amendments".into()],
            queries: vec!["a".into(), "b".into(), "a".into(), "c".into(), "d".into()],
        }
    }

    #[test]
    fn insufficient_keeps_capped_queries() {
        let r = apply_leniency(response(false, None), 1, &ResearchConfig::default());
        assert!(!r.sufficient);
        assert_eq!(r.queries, vec!["a", "b", "c"]);
        assert_eq!(r.gaps, vec!["state amendments"]);
    }

    #[test]
    fn sufficient_drops_queries() {
        let r = apply_leniency(response(true, None), 1, &ResearchConfig::default());
        assert!(r.sufficient);
        assert!(r.queries.is_empty());
    }

    #[test]
    fn same_confidence_passes_later_not_earlier() {
        let config = ResearchConfig::default();
        let early = apply_leniency(response(false, Some(0.65)), 1, &config);
        let late = apply_leniency(response(false, Some(0.65)), config.max_iterations - 1, &config);
        assert!(!early.sufficient);
        assert!(late.sufficient);
    }

    #[test]
    fn leniency_is_monotonic_in_iteration() {
        let config = ResearchConfig::default();
        for c in [0.0, 0.5, 0.65, 0.75, 0.8, 1.0] {
            let mut prev = false;
            for i in 1..=config.max_iterations {
                let now = apply_leniency(response(false, Some(c)), i, &config).sufficient;
                assert!(now || !prev, "confidence {c} regressed at iteration {i}");
                prev = now;
            }
        }
    }

    #[test]
    fn parses_aliases_and_missing_fields() {
        let r: AnalysisResponse =
            parse_json(r#"{"sufficient": false, "searchQueries": ["x"]}"#).unwrap();
        assert_eq!(r.queries, vec!["x"]);
        assert!(r.gaps.is_empty());
        assert!(r.confidence.is_none());
    }
}
