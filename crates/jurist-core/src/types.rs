use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Research Request ─────────────────────────────────────────────────────

/// One answered clarifying question attached to a research request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clarification {
    pub question: String,
    pub answer: String,
}

/// Trigger for one research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub topic: String,
    /// Older clients send the misspelled `clerifications` key.
    #[serde(default, alias = "clerifications")]
    pub clarifications: Vec<Clarification>,
}

impl ResearchRequest {
    pub fn new(topic: impl Into<String>, clarifications: Vec<Clarification>) -> Self {
        Self {
            topic: topic.into(),
            clarifications,
        }
    }

    /// Render clarifications the way every prompt embeds them.
    pub fn clarifications_text(&self) -> String {
        self.clarifications
            .iter()
            .map(|c| format!("Q: {}\nA: {}", c.question.trim(), c.answer.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

// ── Search / Findings ────────────────────────────────────────────────────

/// A normalized search hit, consumed by the extractor and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// A summary extracted from one search result, attributed to its URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Finding {
    pub summary: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
}

impl Source {
    /// Title derived from the host part of the URL, or the URL itself.
    pub fn from_url(url: &str) -> Self {
        let title = url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split('/').next())
            .filter(|host| !host.is_empty())
            .unwrap_or(url)
            .to_string();
        Self {
            url: url.to_string(),
            title,
        }
    }
}

/// Verdict of one sufficiency check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub sufficient: bool,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub queries: Vec<String>,
}

// ── Activities ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Initialize,
    Planning,
    Iteration,
    Search,
    Extract,
    Progress,
    Analyze,
    Complete,
    Generate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Complete,
    Error,
}

/// A progress event surfaced to observers of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub status: ActivityStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

// ── Report / Summary ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Synthesized from findings by the completion provider.
    Complete,
    /// No findings were collected; the report says so instead of guessing.
    NoFindings,
    /// Synthesis failed; minimal report with topic and sources.
    SynthesisFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub topic: String,
    pub content: String,
    pub status: ReportStatus,
}

/// Final JSON summary of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub success: bool,
    pub iterations_completed: u32,
    pub findings_count: usize,
    pub tokens_used: u64,
    pub completed_steps: u32,
    pub sources: Vec<Source>,
}

// ── Stream Events ────────────────────────────────────────────────────────

/// Everything a run pushes to its observers, in order.
/// Serialized as `{"type": ..., "content": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "snake_case")]
pub enum ResearchEvent {
    Activity(Activity),
    Report(Report),
    Summary(RunSummary),
    Error { message: String },
}

impl ResearchEvent {
    /// Summary and error close a run's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summary(_) | Self::Error { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","content":{{"message":"unserializable event: {e}"}}}}"#)
        })
    }
}
