use std::sync::Arc;

use tracing::{info, warn};

use super::call::complete_with_retry;
use crate::{
    activity::ActivityTracker,
    agent::{CompletionProvider, CompletionPurpose, CompletionRequest},
    config::ResearchConfig,
    prompts,
    state::ResearchState,
    types::{ActivityKind, ActivityStatus, Report, ReportStatus},
};

pub struct ReportWriter {
    completion: Arc<dyn CompletionProvider>,
    config: ResearchConfig,
}

impl ReportWriter {
    pub fn new(completion: Arc<dyn CompletionProvider>, config: ResearchConfig) -> Self {
        Self { completion, config }
    }

    /// Always yields a report. Zero findings produce a `no_findings` report
    /// without a model call; a failed synthesis produces a fallback naming
    /// the topic, the failure and every collected source.
    pub async fn generate(&self, state: &mut ResearchState, tracker: &ActivityTracker) -> Report {
        tracker.add(ActivityKind::Generate, ActivityStatus::Pending, "Generating comprehensive report");

        if state.findings.is_empty() {
            info!(topic = %state.topic, "no findings; writing empty report");
            tracker.add(
                ActivityKind::Generate,
                ActivityStatus::Complete,
                "No information was found for this topic",
            );
            return no_findings_report(&state.topic);
        }

        let request = CompletionRequest {
            purpose: CompletionPurpose::Report,
            system: prompts::report_system(),
            prompt: prompts::report_prompt(&state.topic, &state.clarifications_text, &state.findings_text()),
            json_output: false,
            max_tokens: self.config.completion_max_tokens,
        };
        let attempted = complete_with_retry(self.completion.as_ref(), &self.config, request, |text| {
            let body = extract_report(text);
            if body.is_empty() {
                Err("empty report".to_string())
            } else {
                Ok(body.to_string())
            }
        })
        .await;
        state.add_tokens(attempted.tokens_used);

        match attempted.result {
            Ok(content) => {
                info!(topic = %state.topic, chars = content.len(), "report generated");
                tracker.add(ActivityKind::Generate, ActivityStatus::Complete, "Report generated");
                Report { topic: state.topic.clone(), content, status: ReportStatus::Complete }
            }
            Err(e) => {
                warn!(topic = %state.topic, "report synthesis failed: {e}");
                tracker.add(
                    ActivityKind::Generate,
                    ActivityStatus::Error,
                    format!("Report synthesis failed: {e}"),
                );
                fallback_report(state, &e.to_string())
            }
        }
    }
}

/// Body inside `<report>` tags when present, else the whole trimmed answer.
pub fn extract_report(text: &str) -> &str {
    let t = text.trim();
    let Some(start) = t.find("<report>") else {
        return t;
    };
    let body = &t[start + "<report>".len()..];
    match body.find("</report>") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

fn no_findings_report(topic: &str) -> Report {
    Report {
        topic: topic.to_string(),
        content: format!(
            "# {topic}\n\nNo relevant information was found for this topic. \
             Try rephrasing the topic or adding clarifications."
        ),
        status: ReportStatus::NoFindings,
    }
}

fn fallback_report(state: &ResearchState, error: &str) -> Report {
    let mut content = format!(
        "# {}\n\nReport synthesis failed: {error}\n\n\
         {} findings were collected from the sources below.\n\n## Sources\n",
        state.topic,
        state.findings.len()
    );
    for source in state.sources() {
        content.push_str(&format!("- [{}]({})\n", source.title, source.url));
    }
    Report { topic: state.topic.clone(), content, status: ReportStatus::SynthesisFailed }
}
