//! `ResearchResult`: the final, public outcome of a research session.
//!
//! This type has a richer shape (`cited_sources`/`uncited_sources`/
//! `thinking_process`) than a plain flat source list. This crate adopts the
//! richer shape and exposes a legacy flat `sources` view derived from it
//! (see DESIGN.md, Open Question #3).

use serde::{Deserialize, Serialize};

use crate::types::finding::{Finding, InformationGap};
use crate::types::report::Citation;
use crate::types::source::SourceDocument;
use crate::types::state::{ResearchPhase, ResearchState};
use crate::types::thinking::ThinkingStep;

/// The final outcome of a research session: report body, citations and the
/// bookkeeping needed to audit how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub session_id: uuid::Uuid,
    pub query: String,
    pub report: String,
    pub citations: Vec<Citation>,
    pub cited_sources: Vec<SourceDocument>,
    pub uncited_sources: Vec<SourceDocument>,
    pub findings: Vec<Finding>,
    pub gaps: Vec<InformationGap>,
    pub thinking_process: Vec<ThinkingStep>,
    pub iterations_run: u32,
    pub current_phase: ResearchPhase,
    pub is_partial: bool,
    pub errors: Vec<crate::error::ResearchError>,
}

impl ResearchResult {
    /// Legacy flat view over every collected source, cited or not — kept for
    /// backwards compatibility with callers that predate citation tracking.
    pub fn sources(&self) -> Vec<&SourceDocument> {
        self.cited_sources.iter().chain(self.uncited_sources.iter()).collect()
    }

    /// Build a result from a terminal `ResearchState`, partitioning sources
    /// by citation and stamping `is_partial` from the current phase.
    pub fn from_state(state: &ResearchState, report: String, citations: Vec<Citation>) -> Self {
        let (cited, uncited) = state.partition_cited(&citations);
        let is_partial = state.current_phase == ResearchPhase::Failed;

        Self {
            session_id: state.session_id,
            query: state.request.query.clone(),
            report,
            citations,
            cited_sources: cited.into_iter().cloned().collect(),
            uncited_sources: uncited.into_iter().cloned().collect(),
            findings: state.findings.clone(),
            gaps: state.identified_gaps.clone(),
            thinking_process: state.thinking_steps.clone(),
            iterations_run: state.current_iteration,
            current_phase: state.current_phase,
            is_partial,
            errors: state.errors.clone(),
        }
    }

    /// Build a partial result directly from a failed state, with no report
    /// body and all collected sources exposed as uncited for transparency.
    pub fn partial_from_failure(state: &ResearchState) -> Self {
        Self {
            session_id: state.session_id,
            query: state.request.query.clone(),
            report: String::new(),
            citations: Vec::new(),
            cited_sources: Vec::new(),
            uncited_sources: state.collected_sources.clone(),
            findings: state.findings.clone(),
            gaps: state.identified_gaps.clone(),
            thinking_process: state.thinking_steps.clone(),
            iterations_run: state.current_iteration,
            current_phase: ResearchPhase::Failed,
            is_partial: true,
            errors: state.errors.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::{ResearchDepth, ResearchRequest};

    #[test]
    fn sources_view_combines_cited_and_uncited() {
        let state = ResearchState::new(ResearchRequest::new("q", ResearchDepth::Quick));
        let mut state = state;
        state
            .collected_sources
            .push(SourceDocument::new("https://a.com", "body", "tavily"));
        let result = ResearchResult::from_state(&state, "# report".to_string(), vec![]);
        assert_eq!(result.sources().len(), 1);
        assert!(result.uncited_sources.len() == 1);
        assert!(result.cited_sources.is_empty());
    }

    #[test]
    fn partial_from_failure_keeps_all_sources_uncited() {
        let mut state = ResearchState::new(ResearchRequest::new("q", ResearchDepth::Quick));
        state
            .collected_sources
            .push(SourceDocument::new("https://a.com", "body", "tavily"));
        state.current_phase = ResearchPhase::Failed;

        let result = ResearchResult::partial_from_failure(&state);
        assert!(result.is_partial);
        assert!(result.citations.is_empty());
        assert!(result.cited_sources.is_empty());
        assert_eq!(result.uncited_sources.len(), 1);
    }
}
