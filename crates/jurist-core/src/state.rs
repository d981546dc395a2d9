use std::collections::HashSet;

use crate::types::{Finding, ResearchRequest, Source};

/// Mutable record for one research run. Owned by a single run and dropped
/// when it ends; never shared between runs.
#[derive(Debug, Clone, Default)]
pub struct ResearchState {
    pub topic: String,
    pub clarifications_text: String,
    /// Iterations started so far; never exceeds the configured maximum.
    pub iteration: u32,
    pub completed_steps: u32,
    pub tokens_used: u64,
    /// Append-only, in discovery order.
    pub findings: Vec<Finding>,
    pub processed_urls: HashSet<String>,
    pub processed_queries: HashSet<String>,
    /// `processed_queries` in the order they were issued.
    pub query_history: Vec<String>,
}

impl ResearchState {
    pub fn new(request: &ResearchRequest) -> Self {
        Self {
            topic: request.topic.trim().to_string(),
            clarifications_text: request.clarifications_text(),
            ..Default::default()
        }
    }

    /// Keep only queries never issued before in this run (and unique within
    /// `queries`), recording the survivors as processed.
    pub fn claim_queries(&mut self, queries: Vec<String>) -> Vec<String> {
        let claimed: Vec<String> = queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .filter(|q| self.processed_queries.insert(q.clone()))
            .collect();
        self.query_history.extend(claimed.iter().cloned());
        claimed
    }

    /// Returns true the first time a URL is seen in this run.
    pub fn claim_url(&mut self, url: &str) -> bool {
        self.processed_urls.insert(url.to_string())
    }

    pub fn add_findings(&mut self, findings: Vec<Finding>) {
        self.findings.extend(findings);
    }

    pub fn add_tokens(&mut self, tokens: u64) {
        self.tokens_used = self.tokens_used.saturating_add(tokens);
    }

    /// Distinct sources of all findings, in discovery order.
    pub fn sources(&self) -> Vec<Source> {
        let mut seen = HashSet::new();
        self.findings
            .iter()
            .filter(|f| seen.insert(f.source.as_str()))
            .map(|f| Source::from_url(&f.source))
            .collect()
    }

    /// Findings rendered as prompt content.
    pub fn findings_text(&self) -> String {
        self.findings
            .iter()
            .map(|f| format!("[Source: {}]\n{}", f.source, f.summary))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Clarification;

    fn state() -> ResearchState {
        ResearchState::new(&ResearchRequest::new(
            "  Anticipatory bail  ",
            vec![Clarification { question: "Which state?".into(), answer: "Delhi".into() }],
        ))
    }

    #[test]
    fn new_trims_topic_and_renders_clarifications() {
        let s = state();
        assert_eq!(s.topic, "Anticipatory bail");
        assert_eq!(s.clarifications_text, "Q: Which state?\nA: Delhi");
    }

    #[test]
    fn claim_queries_dedups_across_calls_and_within() {
        let mut s = state();
        let first = s.claim_queries(vec!["a".into(), "b".into(), "a".into(), "  ".into()]);
        assert_eq!(first, vec!["a", "b"]);
        let second = s.claim_queries(vec!["b".into(), " c ".into()]);
        assert_eq!(second, vec!["c"]);
        assert_eq!(s.processed_queries.len(), 3);
        assert_eq!(s.query_history, vec!["a", "b", "c"]);
    }

    #[test]
    fn claim_url_only_once() {
        let mut s = state();
        assert!(s.claim_url("https://x.in/1"));
        assert!(!s.claim_url("https://x.in/1"));
    }

    #[test]
    fn sources_are_distinct_in_order() {
        let mut s = state();
        s.add_findings(vec![
            Finding { summary: "a".into(), source: "https://b.in/1".into() },
            Finding { summary: "b".into(), source: "https://a.in/2".into() },
            Finding { summary: "c".into(), source: "https://b.in/1".into() },
        ]);
        let urls: Vec<String> = s.sources().into_iter().map(|s| s.url).collect();
        assert_eq!(urls, vec!["https://b.in/1", "https://a.in/2"]);
    }

    #[test]
    fn findings_text_has_sources() {
        let mut s = state();
        s.add_findings(vec![Finding { summary: "Section 480".into(), source: "https://x.in".into() }]);
        assert_eq!(s.findings_text(), "[Source: https://x.in]\nSection 480");
    }
}
