//! The research orchestrator: the per-session state machine driving
//! Planning → Searching → ContentExtraction → Analysis →
//! SufficiencyEvaluation in a loop, then ReportGeneration.

pub mod session;

pub use session::Session;

use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agents::{
    AnalysisAgent, AnalysisOptions, AnalysisResult, ContentEnrichmentAgent, ContentEnrichmentOptions,
    ContentEnrichmentResult, GeneratedReport, QueryPlannerAgent, ReportGeneratorAgent, ReportGeneratorOptions,
    SearchCoordinatorAgent, SearchCoordinatorOptions, SearchExecutionResult, SearchProviderFactory,
};
use crate::error::{ResearchError, ResearchErrorKind, SessionError};
use crate::traits::{ContentExtractor, TextGenerationService};
use crate::types::progress::{ProgressEventKind, ProgressPayload, ResearchProgress};
use crate::types::query::ExpandedQuery;
use crate::types::request::ResearchRequest;
use crate::types::result::ResearchResult;
use crate::types::state::{ResearchPhase, ResearchState};
use crate::types::thinking::{ThinkingStep, ThinkingStepType};

/// Non-Low-priority gaps feeding a single later iteration's follow-up
/// search batch are capped at 3.
const MAX_FOLLOW_UP_QUERIES_PER_ITERATION: usize = 3;

/// Configuration for one orchestrator run: the per-agent option bundles
/// plus the orchestrator-level knobs.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub search: SearchCoordinatorOptions,
    pub enrichment: ContentEnrichmentOptions,
    pub analysis: AnalysisOptions,
    pub report: ReportGeneratorOptions,
    pub max_search_retries_per_iteration: u32,
    pub retry_delay_on_no_results: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            search: SearchCoordinatorOptions::default(),
            enrichment: ContentEnrichmentOptions::default(),
            analysis: AnalysisOptions::default(),
            report: ReportGeneratorOptions::default(),
            max_search_retries_per_iteration: 2,
            retry_delay_on_no_results: Duration::from_secs(2),
        }
    }
}

/// Whether the iteration loop ran to completion or broke early because of
/// cancellation or a budget overrun.
enum IterationOutcome {
    Completed,
    Aborted,
}

/// Drives one research session end to end. Holds no session state itself —
/// `ResearchState` is created fresh per call and owned by the caller
/// (`research`/`research_stream`) or by a `Session` (`start_interactive`).
pub struct ResearchOrchestrator<'a> {
    llm: &'a dyn TextGenerationService,
    factory: &'a SearchProviderFactory,
    extractor: &'a dyn ContentExtractor,
}

impl<'a> ResearchOrchestrator<'a> {
    pub fn new(
        llm: &'a dyn TextGenerationService,
        factory: &'a SearchProviderFactory,
        extractor: &'a dyn ContentExtractor,
    ) -> Self {
        Self { llm, factory, extractor }
    }

    /// **research(request) → ResearchResult**: complete blocking execution.
    pub async fn research(&self, request: ResearchRequest, options: &OrchestratorOptions) -> ResearchResult {
        let cancellation = CancellationToken::new();
        self.research_with_cancellation(request, options, &cancellation).await
    }

    /// Same as `research`, but driven by a caller-supplied cancellation
    /// token, so cancellation can be triggered from outside this call.
    pub async fn research_with_cancellation(
        &self,
        request: ResearchRequest,
        options: &OrchestratorOptions,
        cancellation: &CancellationToken,
    ) -> ResearchResult {
        let mut state = ResearchState::new(request);

        if state.request.is_empty_query() {
            state.current_phase = ResearchPhase::Failed;
            state.record_error(ResearchError::unknown("request query must not be empty"));
            return ResearchResult::partial_from_failure(&state);
        }

        match self.run_iterations(&mut state, options, cancellation).await {
            IterationOutcome::Aborted => ResearchResult::partial_from_failure(&state),
            IterationOutcome::Completed => {
                state.current_phase = ResearchPhase::ReportGeneration;
                let report = self.run_report(&mut state, options).await;
                state.generated_sections = report.sections;
                state.current_phase = ResearchPhase::Completed;
                ResearchResult::from_state(&state, report.body, report.citations)
            }
        }
    }

    /// **research_stream(request) → lazy sequence of ResearchProgress**.
    /// Events are emitted in the exact order phases run; cancellation emits
    /// a final `Failed` event and stops.
    pub fn research_stream<'s>(
        &'s self,
        request: ResearchRequest,
        options: &'s OrchestratorOptions,
    ) -> impl Stream<Item = ResearchProgress> + 's {
        stream! {
            let mut state = ResearchState::new(request);
            let max_iterations = state.effective_max_iterations();

            if state.request.is_empty_query() {
                state.current_phase = ResearchPhase::Failed;
                state.record_error(ResearchError::unknown("request query must not be empty"));
                yield ResearchProgress::new(ProgressEventKind::Failed, 0, max_iterations).with_payload(
                    ProgressPayload::Failed { kind: ResearchErrorKind::Unknown, message: "request query must not be empty".to_string() },
                );
                return;
            }

            let cancellation = CancellationToken::new();
            yield ResearchProgress::new(ProgressEventKind::Started, 0, max_iterations);

            for iteration in 1..=max_iterations {
                if cancellation.is_cancelled() {
                    state.current_phase = ResearchPhase::Failed;
                    state.record_error(ResearchError::unknown("session cancelled"));
                    yield ResearchProgress::new(ProgressEventKind::Failed, state.current_iteration, max_iterations)
                        .with_payload(ProgressPayload::Failed { kind: ResearchErrorKind::Unknown, message: "session cancelled".to_string() });
                    return;
                }

                state.current_iteration = iteration;
                state.current_phase = ResearchPhase::Planning;
                let queries = self.run_planning(&mut state).await;
                yield ResearchProgress::new(ProgressEventKind::PlanGenerated, iteration, max_iterations)
                    .with_payload(ProgressPayload::PlanGenerated { queries: queries.clone() });

                state.current_phase = ResearchPhase::Searching;
                yield ResearchProgress::new(ProgressEventKind::SearchStarted, iteration, max_iterations);
                let execution = self.run_search(&mut state, queries, options, &cancellation).await;
                for result in &execution.results {
                    yield ResearchProgress::new(ProgressEventKind::SearchCompleted, iteration, max_iterations)
                        .with_payload(ProgressPayload::SearchCompleted { result: result.clone() });
                }
                for (query, error) in &execution.failures {
                    state.record_error(ResearchError::search_provider(format!("{query}: {error}")));
                }

                state.current_phase = ResearchPhase::ContentExtraction;
                yield ResearchProgress::new(ProgressEventKind::ContentExtractionStarted, iteration, max_iterations);
                self.run_enrichment(&mut state, &execution, options, &cancellation).await;
                yield ResearchProgress::new(ProgressEventKind::ContentExtracted, iteration, max_iterations)
                    .with_payload(ProgressPayload::ContentExtracted { sources_collected: state.collected_sources.len() });

                state.current_phase = ResearchPhase::Analysis;
                yield ResearchProgress::new(ProgressEventKind::AnalysisStarted, iteration, max_iterations);
                state.current_phase = ResearchPhase::SufficiencyEvaluation;
                let analysis = self.run_analysis(&mut state, options).await;
                yield ResearchProgress::new(ProgressEventKind::AnalysisCompleted, iteration, max_iterations).with_payload(
                    ProgressPayload::AnalysisCompleted {
                        findings_count: analysis.findings.len(),
                        gaps_count: analysis.gaps.len(),
                        sufficiency: analysis.sufficiency.clone(),
                    },
                );

                yield ResearchProgress::new(ProgressEventKind::IterationCompleted, iteration, max_iterations);

                if !analysis.needs_more_research {
                    break;
                }
            }

            state.current_phase = ResearchPhase::ReportGeneration;
            yield ResearchProgress::new(ProgressEventKind::ReportGenerationStarted, state.current_iteration, max_iterations);
            let report = self.run_report(&mut state, options).await;
            for section in &report.sections {
                yield ResearchProgress::new(ProgressEventKind::ReportSection, state.current_iteration, max_iterations)
                    .with_payload(ProgressPayload::ReportSection { section: section.clone() });
            }
            state.generated_sections = report.sections;
            state.current_phase = ResearchPhase::Completed;
            yield ResearchProgress::new(ProgressEventKind::Completed, state.current_iteration, max_iterations);
        }
    }

    /// **start_interactive(request) → Session**: a session handle whose
    /// operations drive one iteration (or the final report) at a time.
    pub fn start_interactive(
        &'a self,
        request: ResearchRequest,
        options: OrchestratorOptions,
    ) -> Result<Session<'a>, SessionError> {
        Session::new(self, request, options)
    }

    /// Runs the Planning→SufficiencyEvaluation loop, stopping early on
    /// cancellation, a budget overrun, or a sufficient analysis result.
    /// `state.current_iteration` never exceeds `effective_max_iterations`
    /// because the loop range is bounded by it directly.
    async fn run_iterations(
        &self,
        state: &mut ResearchState,
        options: &OrchestratorOptions,
        cancellation: &CancellationToken,
    ) -> IterationOutcome {
        let max_iterations = state.effective_max_iterations();

        for iteration in 1..=max_iterations {
            if cancellation.is_cancelled() {
                state.current_phase = ResearchPhase::Failed;
                state.record_error(ResearchError::unknown("session cancelled"));
                return IterationOutcome::Aborted;
            }

            if let Some(budget) = state.request.max_budget {
                if state.accumulated_cost >= budget {
                    state.current_phase = ResearchPhase::Failed;
                    state.record_error(ResearchError::budget_exceeded("accumulated cost reached max_budget"));
                    return IterationOutcome::Aborted;
                }
            }

            state.current_iteration = iteration;
            state.current_phase = ResearchPhase::Planning;
            let queries = self.run_planning(state).await;

            state.current_phase = ResearchPhase::Searching;
            let execution = self.run_search(state, queries, options, cancellation).await;
            for (query, error) in &execution.failures {
                state.record_error(ResearchError::search_provider(format!("{query}: {error}")));
            }

            state.current_phase = ResearchPhase::ContentExtraction;
            self.run_enrichment(state, &execution, options, cancellation).await;

            state.current_phase = ResearchPhase::Analysis;
            state.current_phase = ResearchPhase::SufficiencyEvaluation;
            let analysis = self.run_analysis(state, options).await;

            if !analysis.needs_more_research {
                break;
            }
        }

        IterationOutcome::Completed
    }

    /// **Planning phase**: iteration 1 runs the full Query
    /// Planner; later iterations synthesize follow-up queries from
    /// non-Low-priority gaps, capped at 3, then clear the consumed gaps.
    pub(crate) async fn run_planning(&self, state: &mut ResearchState) -> Vec<ExpandedQuery> {
        let planner = QueryPlannerAgent::new(self.llm);

        if state.current_iteration <= 1 {
            let plan = planner.plan(state).await;
            for query in &plan.queries {
                state.mark_query_executed(query);
            }
            for perspective in &plan.perspectives {
                if !state.research_angles.contains(&perspective.name) {
                    state.research_angles.push(perspective.name.clone());
                }
            }
            plan.queries
        } else {
            let mut follow_up = planner.generate_follow_up(state, true).await;
            follow_up.truncate(MAX_FOLLOW_UP_QUERIES_PER_ITERATION);
            for query in &follow_up {
                state.mark_query_executed(query);
            }
            state.identified_gaps.clear();
            follow_up
        }
    }

    /// **Search phase**: search the iteration's query
    /// batch, capped at `max_sources_per_iteration`; if zero sources were
    /// collected, sleep and retry up to `max_search_retries_per_iteration`.
    pub(crate) async fn run_search(
        &self,
        state: &mut ResearchState,
        queries: Vec<ExpandedQuery>,
        options: &OrchestratorOptions,
        cancellation: &CancellationToken,
    ) -> SearchExecutionResult {
        let capped: Vec<ExpandedQuery> = queries.into_iter().take(state.request.max_sources_per_iteration).collect();
        let coordinator = SearchCoordinatorAgent::new(self.factory);

        let mut attempt = 0;
        loop {
            let execution = coordinator.execute_searches(&capped, &options.search, cancellation).await;

            if execution.unique_sources_collected > 0 || attempt >= options.max_search_retries_per_iteration {
                if execution.unique_sources_collected == 0 {
                    state.record_thinking_step(ThinkingStep::new(
                        ThinkingStepType::Searching,
                        "search retries exhausted",
                        format!("no sources collected after {} attempt(s); continuing with an empty batch", attempt + 1),
                    ));
                }
                return execution;
            }

            state.record_thinking_step(ThinkingStep::new(
                ThinkingStepType::Searching,
                "retrying search",
                format!("zero sources collected on attempt {}; retrying after delay", attempt + 1),
            ));
            warn!(attempt, "search phase collected zero sources, retrying");
            attempt += 1;
            tokio::time::sleep(options.retry_delay_on_no_results).await;
        }
    }

    /// **Content enrichment phase**: fetch and score the
    /// iteration's search results, deduplicating against already-collected
    /// sources by URL.
    pub(crate) async fn run_enrichment(
        &self,
        state: &mut ResearchState,
        execution: &SearchExecutionResult,
        options: &OrchestratorOptions,
        cancellation: &CancellationToken,
    ) -> ContentEnrichmentResult {
        let agent = ContentEnrichmentAgent::new(self.extractor);
        agent.enrich_from_state(state, &execution.results, &options.enrichment, cancellation).await
    }

    /// **Analysis phase**: extract findings, identify gaps
    /// and evaluate sufficiency; `state` is updated in place.
    pub(crate) async fn run_analysis(&self, state: &mut ResearchState, options: &OrchestratorOptions) -> AnalysisResult {
        let agent = AnalysisAgent::new(self.llm);
        agent.analyze_from_state(state, &options.analysis).await
    }

    /// **Report phase**: generate the outline, sections and
    /// citations for the final result.
    pub(crate) async fn run_report(&self, state: &mut ResearchState, options: &OrchestratorOptions) -> GeneratedReport {
        let agent = ReportGeneratorAgent::new(self.llm);
        agent.generate(state, &options.report).await
    }
}
