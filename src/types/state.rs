//! `ResearchState`: the mutable, single-owner state of one research session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ResearchError;
use crate::types::finding::{Finding, InformationGap};
use crate::types::query::ExpandedQuery;
use crate::types::report::{Citation, ReportOutline, ReportSection};
use crate::types::request::ResearchRequest;
use crate::types::search::SearchResult;
use crate::types::source::SourceDocument;
use crate::types::sufficiency::SufficiencyScore;
use crate::types::thinking::ThinkingStep;

/// The current stage of a research session's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchPhase {
    Initial,
    Planning,
    Searching,
    ContentExtraction,
    Analysis,
    SufficiencyEvaluation,
    ReportGeneration,
    Completed,
    Failed,
}

/// Mutable, per-session state. Created at orchestrator entry, mutated only
/// by the agent currently running, destroyed with the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    pub session_id: Uuid,
    pub request: ResearchRequest,
    pub started_at: DateTime<Utc>,
    pub current_phase: ResearchPhase,
    pub current_iteration: u32,
    pub research_angles: Vec<String>,
    pub executed_queries: Vec<String>,
    pub search_results: Vec<SearchResult>,
    pub collected_sources: Vec<SourceDocument>,
    pub findings: Vec<Finding>,
    pub identified_gaps: Vec<InformationGap>,
    pub generated_sections: Vec<ReportSection>,
    pub outline: Option<ReportOutline>,
    pub last_sufficiency_score: Option<SufficiencyScore>,
    pub accumulated_token_usage: u64,
    pub accumulated_cost: f64,
    pub errors: Vec<ResearchError>,
    pub thinking_steps: Vec<ThinkingStep>,
}

impl ResearchState {
    pub fn new(request: ResearchRequest) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            request,
            started_at: Utc::now(),
            current_phase: ResearchPhase::Initial,
            current_iteration: 0,
            research_angles: Vec::new(),
            executed_queries: Vec::new(),
            search_results: Vec::new(),
            collected_sources: Vec::new(),
            findings: Vec::new(),
            identified_gaps: Vec::new(),
            generated_sections: Vec::new(),
            outline: None,
            last_sufficiency_score: None,
            accumulated_token_usage: 0,
            accumulated_cost: 0.0,
            errors: Vec::new(),
            thinking_steps: Vec::new(),
        }
    }

    /// `min(request.max_iterations, depth_cap)` — the ceiling `current_iteration`
    /// must never exceed.
    pub fn effective_max_iterations(&self) -> u32 {
        self.request.effective_max_iterations()
    }

    /// Append a source document unless its URL (case-insensitive) is already
    /// present — maintains the collected-sources dedup invariant.
    pub fn add_source_if_new(&mut self, document: SourceDocument) -> bool {
        let normalized = document.normalized_url();
        if self
            .collected_sources
            .iter()
            .any(|s| s.normalized_url() == normalized)
        {
            return false;
        }
        self.collected_sources.push(document);
        true
    }

    /// Append a query to the executed-queries ledger using normalized text,
    /// returning whether it was newly added.
    pub fn mark_query_executed(&mut self, query: &ExpandedQuery) -> bool {
        let normalized = query.normalized_text();
        if self.executed_queries.iter().any(|q| *q == normalized) {
            return false;
        }
        self.executed_queries.push(normalized);
        true
    }

    pub fn has_executed_normalized(&self, normalized_query: &str) -> bool {
        self.executed_queries.iter().any(|q| q == normalized_query)
    }

    pub fn record_error(&mut self, error: ResearchError) {
        self.errors.push(error);
    }

    pub fn record_thinking_step(&mut self, step: ThinkingStep) {
        self.thinking_steps.push(step);
    }

    /// Partition `collected_sources` into (cited, uncited) given a citation
    /// list. Cited and uncited sources always partition `collected_sources`.
    pub fn partition_cited<'a>(
        &'a self,
        citations: &[Citation],
    ) -> (Vec<&'a SourceDocument>, Vec<&'a SourceDocument>) {
        let cited_ids: std::collections::HashSet<&str> =
            citations.iter().map(|c| c.source_id.as_str()).collect();
        self.collected_sources
            .iter()
            .partition(|s| cited_ids.contains(s.id.as_str()))
    }

    /// Resolve a finding's `source_id` to its `SourceDocument` — used to
    /// enforce that every finding references a collected source.
    pub fn resolve_source(&self, source_id: &str) -> Option<&SourceDocument> {
        self.collected_sources.iter().find(|s| s.id.as_str() == source_id)
    }
}
