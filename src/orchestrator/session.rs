//! `Session`: the handle returned by `start_interactive`.
//!
//! Unlike `research`/`research_stream`, which own a `ResearchState` for the
//! duration of a single call, a `Session` lets a caller drive one iteration
//! at a time, inject queries between iterations, and snapshot state for
//! external persistence. Once `finalize()` or `dispose()` has run, every
//! further mutating operation fails with `SessionError::Disposed`.

use tokio_util::sync::CancellationToken;

use crate::agents::GeneratedReport;
use crate::error::{ResearchError, SessionError};
use crate::types::query::ExpandedQuery;
use crate::types::request::ResearchRequest;
use crate::types::result::ResearchResult;
use crate::types::state::{ResearchPhase, ResearchState};

use super::{OrchestratorOptions, ResearchOrchestrator};

/// A point-in-time snapshot of session state, suitable for external
/// persistence between calls to `continue_()`.
#[derive(Debug, Clone)]
pub struct SessionCheckpoint {
    pub state: ResearchState,
}

/// An interactive research session: one iteration, or the final report, at
/// a time. Holds the `ResearchState` the orchestrator created at entry.
pub struct Session<'a> {
    orchestrator: &'a ResearchOrchestrator<'a>,
    options: OrchestratorOptions,
    state: ResearchState,
    cancellation: CancellationToken,
    disposed: bool,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        orchestrator: &'a ResearchOrchestrator<'a>,
        request: ResearchRequest,
        options: OrchestratorOptions,
    ) -> Result<Self, SessionError> {
        if request.is_empty_query() {
            return Err(SessionError::EmptyQuery);
        }

        Ok(Self {
            orchestrator,
            options,
            state: ResearchState::new(request),
            cancellation: CancellationToken::new(),
            disposed: false,
        })
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.disposed {
            return Err(SessionError::Disposed);
        }
        Ok(())
    }

    /// Read-only view of the session's current state.
    pub fn state(&self) -> &ResearchState {
        &self.state
    }

    /// `add_query(text)`: append a query to the executed-queries ledger
    /// ahead of the next Planning phase, so it is treated as already
    /// explored and is not re-proposed by the planner.
    pub fn add_query(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_active()?;
        let normalized = crate::types::query::normalize_query_text(&text.into());
        if !self.state.has_executed_normalized(&normalized) {
            self.state.executed_queries.push(normalized);
        }
        Ok(())
    }

    /// `continue_()`: run one more Planning→SufficiencyEvaluation iteration.
    /// Returns `Ok(true)` if the session still wants more research (the
    /// caller may call `continue_()` again), `Ok(false)` once sufficiency
    /// was reached or the iteration ceiling was hit.
    pub async fn continue_(&mut self) -> Result<bool, SessionError> {
        self.ensure_active()?;

        let max_iterations = self.state.effective_max_iterations();
        if self.state.current_iteration >= max_iterations {
            return Ok(false);
        }

        if let Some(budget) = self.state.request.max_budget {
            if self.state.accumulated_cost >= budget {
                self.state.current_phase = ResearchPhase::Failed;
                self.state
                    .record_error(ResearchError::budget_exceeded("accumulated cost reached max_budget"));
                return Ok(false);
            }
        }

        if self.cancellation.is_cancelled() {
            self.state.current_phase = ResearchPhase::Failed;
            self.state.record_error(ResearchError::unknown("session cancelled"));
            return Ok(false);
        }

        self.state.current_iteration += 1;
        self.state.current_phase = ResearchPhase::Planning;
        let queries: Vec<ExpandedQuery> = self.orchestrator.run_planning(&mut self.state).await;

        self.state.current_phase = ResearchPhase::Searching;
        let execution = self
            .orchestrator
            .run_search(&mut self.state, queries, &self.options, &self.cancellation)
            .await;
        for (query, error) in &execution.failures {
            self.state
                .record_error(ResearchError::search_provider(format!("{query}: {error}")));
        }

        self.state.current_phase = ResearchPhase::ContentExtraction;
        self.orchestrator
            .run_enrichment(&mut self.state, &execution, &self.options, &self.cancellation)
            .await;

        self.state.current_phase = ResearchPhase::Analysis;
        self.state.current_phase = ResearchPhase::SufficiencyEvaluation;
        let analysis = self.orchestrator.run_analysis(&mut self.state, &self.options).await;

        Ok(analysis.needs_more_research && self.state.current_iteration < max_iterations)
    }

    /// `finalize()`: force report generation and end the session. Further
    /// mutating operations fail afterward.
    pub async fn finalize(&mut self) -> Result<ResearchResult, SessionError> {
        self.ensure_active()?;

        self.state.current_phase = ResearchPhase::ReportGeneration;
        let GeneratedReport { body, citations, sections } =
            self.orchestrator.run_report(&mut self.state, &self.options).await;
        self.state.generated_sections = sections;
        self.state.current_phase = ResearchPhase::Completed;
        self.disposed = true;

        Ok(ResearchResult::from_state(&self.state, body, citations))
    }

    /// `checkpoint()`: a snapshot of state for external persistence.
    pub fn checkpoint(&self) -> Result<SessionCheckpoint, SessionError> {
        self.ensure_active()?;
        Ok(SessionCheckpoint { state: self.state.clone() })
    }

    /// `dispose()`: release the session without generating a report.
    /// Idempotent — calling it twice is not an error.
    pub fn dispose(&mut self) {
        self.cancellation.cancel();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::SearchProviderFactory;
    use crate::testing::{MockContentExtractor, MockSearchProvider, MockTextGenerator};
    use crate::types::request::{ResearchDepth, ResearchRequest};
    use crate::types::search::SearchSource;
    use std::sync::Arc;

    fn build<'a>(
        llm: &'a MockTextGenerator,
        factory: &'a SearchProviderFactory,
        extractor: &'a MockContentExtractor,
    ) -> ResearchOrchestrator<'a> {
        ResearchOrchestrator::new(llm, factory, extractor)
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_blocks_further_mutation() {
        let llm = MockTextGenerator::new();
        let factory = SearchProviderFactory::new();
        let extractor = MockContentExtractor::new();
        let orchestrator = build(&llm, &factory, &extractor);

        let request = ResearchRequest::new("q", ResearchDepth::Quick);
        let mut session = orchestrator.start_interactive(request, OrchestratorOptions::default()).unwrap();

        session.dispose();
        session.dispose();

        assert!(session.is_disposed());
        assert_eq!(session.add_query("more"), Err(SessionError::Disposed));
        assert_eq!(session.checkpoint().err(), Some(SessionError::Disposed));
    }

    #[tokio::test]
    async fn empty_query_is_rejected_at_construction() {
        let llm = MockTextGenerator::new();
        let factory = SearchProviderFactory::new();
        let extractor = MockContentExtractor::new();
        let orchestrator = build(&llm, &factory, &extractor);

        let request = ResearchRequest::new("   ", ResearchDepth::Quick);
        let result = orchestrator.start_interactive(request, OrchestratorOptions::default());
        assert_eq!(result.err(), Some(SessionError::EmptyQuery));
    }

    #[tokio::test]
    async fn finalize_ends_session_and_further_mutation_fails() {
        let llm = MockTextGenerator::new()
            .with_response(r#"{"sub_questions":[{"question":"hello","priority":1}]}"#)
            .with_response(r#"{"perspectives":[]}"#)
            .with_response(r#"{"queries":[{"query":"hello","priority":1,"search_type":"web"}]}"#)
            .with_response(r#"{"findings":[]}"#)
            .with_response(r#"{"gaps":[]}"#)
            .with_response(r#"{"coverage":0.9,"quality":0.9}"#)
            .with_response(r#"{"title":"Report","sections":[]}"#);
        let provider = MockSearchProvider::new("tavily")
            .with_sources("hello", vec![SearchSource::new("https://example.com", "Example")]);
        let factory = SearchProviderFactory::new().register(Arc::new(provider));
        let extractor = MockContentExtractor::new().with_content("https://example.com", "Hello there.");
        let orchestrator = build(&llm, &factory, &extractor);

        let request = ResearchRequest::new("hello", ResearchDepth::Quick).with_max_iterations(1);
        let mut session = orchestrator.start_interactive(request, OrchestratorOptions::default()).unwrap();

        session.continue_().await.unwrap();
        let result = session.finalize().await.unwrap();

        assert!(!result.is_partial);
        assert_eq!(session.finalize().await.err(), Some(SessionError::Disposed));
    }
}
