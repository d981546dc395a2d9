//! Iterative deep research: plan → search → extract → analyze, repeated
//! until the findings are sufficient or the iteration ceiling is hit, then
//! a report.

pub(crate) mod call;
pub mod analyze;
pub mod extract;
pub mod planner;
pub mod report;
pub mod search;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use self::call::cancellable;
pub use self::{
    analyze::SufficiencyAnalyzer, extract::FindingExtractor, planner::QueryPlanner,
    report::ReportWriter, search::SearchStage,
};
use crate::{
    activity::ActivityTracker,
    agent::{CompletionProvider, SearchProvider},
    config::ResearchConfig,
    error::ResearchError,
    state::ResearchState,
    types::{ActivityKind, ActivityStatus, Report, ReportStatus, ResearchEvent, ResearchRequest, RunSummary},
};

/// What a finished run hands back besides its event stream.
#[derive(Debug, Clone)]
pub struct ResearchOutcome {
    pub summary: RunSummary,
    pub report: Report,
    pub state: ResearchState,
}

pub struct Researcher {
    planner: QueryPlanner,
    searcher: SearchStage,
    extractor: FindingExtractor,
    analyzer: SufficiencyAnalyzer,
    reporter: ReportWriter,
    config: ResearchConfig,
}

impl Researcher {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        search: Arc<dyn SearchProvider>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            planner: QueryPlanner::new(Arc::clone(&completion), config.clone()),
            searcher: SearchStage::new(search, config.clone()),
            extractor: FindingExtractor::new(Arc::clone(&completion), config.clone()),
            analyzer: SufficiencyAnalyzer::new(Arc::clone(&completion), config.clone()),
            reporter: ReportWriter::new(completion, config.clone()),
            config,
        }
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    /// Run one research request to completion.
    ///
    /// Every activity, then the report, then the summary are pushed to
    /// `events`; a failed run pushes a single error event instead. Once
    /// `cancel` fires the run stops at its next await and no report is
    /// produced.
    pub async fn run(
        &self,
        request: ResearchRequest,
        events: mpsc::UnboundedSender<ResearchEvent>,
        cancel: CancellationToken,
    ) -> Result<ResearchOutcome, ResearchError> {
        let tracker = ActivityTracker::new(events);
        match self.run_inner(request, &tracker, &cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!("research run ended without a report: {e}");
                tracker.emit(ResearchEvent::Error { message: e.to_string() });
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        request: ResearchRequest,
        tracker: &ActivityTracker,
        cancel: &CancellationToken,
    ) -> Result<ResearchOutcome, ResearchError> {
        if request.topic.trim().is_empty() {
            return Err(ResearchError::InvalidRequest("topic is required".into()));
        }
        let mut state = ResearchState::new(&request);
        info!(topic = %state.topic, clarifications = request.clarifications.len(), "research started");
        tracker.add(
            ActivityKind::Initialize,
            ActivityStatus::Complete,
            format!("Starting research on: {}", state.topic),
        );

        let initial = cancellable(cancel, self.planner.generate_queries(&mut state, tracker)).await?;
        let mut queries = state.claim_queries(initial);
        if queries.is_empty() {
            warn!(topic = %state.topic, "no initial queries; skipping search");
        }

        let mut sufficient = false;
        while !queries.is_empty() && state.iteration < self.config.max_iterations {
            state.iteration += 1;
            let iteration = state.iteration;
            info!(topic = %state.topic, iteration, queries = queries.len(), "iteration started");
            tracker.add(
                ActivityKind::Iteration,
                ActivityStatus::Pending,
                format!("Starting iteration {iteration} with {} queries", queries.len()),
            );

            let results = cancellable(cancel, self.searcher.search_all(&queries, tracker)).await?;
            let new_findings =
                cancellable(cancel, self.extractor.extract(results, &mut state, tracker)).await?;
            let count = new_findings.len();
            state.add_findings(new_findings);
            tracker.add(
                ActivityKind::Progress,
                ActivityStatus::Complete,
                format!("Found {count} new findings in iteration {iteration}"),
            );

            tracker.add(ActivityKind::Analyze, ActivityStatus::Pending, "Analyzing research progress");
            let analysis = cancellable(
                cancel,
                self.analyzer.analyze(&mut state, &queries, iteration, tracker),
            )
            .await?;
            state.completed_steps = tracker.completed_steps();

            if analysis.sufficient {
                sufficient = true;
                tracker.add(
                    ActivityKind::Complete,
                    ActivityStatus::Complete,
                    format!("Research sufficient after {iteration} iterations"),
                );
                break;
            }
            queries = state.claim_queries(analysis.queries);
            if queries.is_empty() {
                info!(topic = %state.topic, iteration, "no new queries to search");
            }
        }
        if !sufficient && state.iteration > 0 {
            info!(topic = %state.topic, iterations = state.iteration, "stopping without a sufficient verdict");
        }

        let report = cancellable(cancel, self.reporter.generate(&mut state, tracker)).await?;
        state.completed_steps = tracker.completed_steps();

        let summary = RunSummary {
            success: report.status == ReportStatus::Complete,
            iterations_completed: state.iteration,
            findings_count: state.findings.len(),
            tokens_used: state.tokens_used,
            completed_steps: state.completed_steps,
            sources: state.sources(),
        };
        info!(
            topic = %state.topic,
            iterations = summary.iterations_completed,
            findings = summary.findings_count,
            tokens = summary.tokens_used,
            "research finished"
        );
        tracker.emit(ResearchEvent::Report(report.clone()));
        tracker.emit(ResearchEvent::Summary(summary.clone()));

        Ok(ResearchOutcome { summary, report, state })
    }
}
