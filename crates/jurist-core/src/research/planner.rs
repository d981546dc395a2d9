use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::call::{complete_with_retry, normalize_queries, parse_json};
use crate::{
    activity::ActivityTracker,
    agent::{CompletionProvider, CompletionPurpose, CompletionRequest},
    config::ResearchConfig,
    error::CallError,
    prompts,
    state::ResearchState,
    types::{ActivityKind, ActivityStatus},
};

const INITIAL_QUERY_COUNT: usize = 3;
const MAX_CLARIFYING_QUESTIONS: usize = 5;

#[derive(Deserialize)]
struct QueryPlan {
    #[serde(alias = "searchQueries")]
    queries: Vec<String>,
}

#[derive(Deserialize)]
struct QuestionList {
    questions: Vec<String>,
}

/// Turns a topic and its clarifications into search queries, and a bare
/// topic into clarifying questions.
pub struct QueryPlanner {
    completion: Arc<dyn CompletionProvider>,
    config: ResearchConfig,
}

impl QueryPlanner {
    pub fn new(completion: Arc<dyn CompletionProvider>, config: ResearchConfig) -> Self {
        Self { completion, config }
    }

    /// Initial query set for a run. Empty when planning fails after retries.
    pub async fn generate_queries(
        &self,
        state: &mut ResearchState,
        tracker: &ActivityTracker,
    ) -> Vec<String> {
        tracker.add(ActivityKind::Planning, ActivityStatus::Pending, "Planning research queries");

        let request = CompletionRequest {
            purpose: CompletionPurpose::Planning,
            system: prompts::planning_system(),
            prompt: prompts::planning_prompt(&state.topic, &state.clarifications_text),
            json_output: true,
            max_tokens: self.config.completion_max_tokens,
        };
        let attempted = complete_with_retry(self.completion.as_ref(), &self.config, request, |text| {
            let plan: QueryPlan = parse_json(text)?;
            Ok(normalize_queries(plan.queries, INITIAL_QUERY_COUNT))
        })
        .await;
        state.add_tokens(attempted.tokens_used);

        match attempted.result {
            Ok(queries) => {
                info!(topic = %state.topic, count = queries.len(), "planned search queries");
                tracker.add(
                    ActivityKind::Planning,
                    ActivityStatus::Complete,
                    format!("Planned {} search queries", queries.len()),
                );
                queries
            }
            Err(e) => {
                warn!(topic = %state.topic, "query planning failed: {e}");
                tracker.add(
                    ActivityKind::Planning,
                    ActivityStatus::Error,
                    format!("Could not plan search queries: {e}"),
                );
                Vec::new()
            }
        }
    }

    pub async fn clarifying_questions(&self, topic: &str) -> Result<Vec<String>, CallError> {
        let request = CompletionRequest {
            purpose: CompletionPurpose::Clarification,
            system: prompts::CLARIFICATION_SYSTEM.to_string(),
            prompt: prompts::clarification_prompt(topic.trim()),
            json_output: true,
            max_tokens: self.config.completion_max_tokens,
        };
        complete_with_retry(self.completion.as_ref(), &self.config, request, |text| {
            let list: QuestionList = parse_json(text)?;
            Ok(normalize_queries(list.questions, MAX_CLARIFYING_QUESTIONS))
        })
        .await
        .result
    }
}
