//! Wire-visible progress events emitted by `research_stream`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ResearchErrorKind;
use crate::types::query::ExpandedQuery;
use crate::types::report::ReportSection;
use crate::types::search::SearchResult;
use crate::types::sufficiency::SufficiencyScore;

/// The payload carried by a `ResearchProgress` event; exactly one variant is
/// populated per event type, the rest are absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressPayload {
    PlanGenerated { queries: Vec<ExpandedQuery> },
    SearchCompleted { result: SearchResult },
    ContentExtracted { sources_collected: usize },
    AnalysisCompleted { findings_count: usize, gaps_count: usize, sufficiency: SufficiencyScore },
    ReportSection { section: ReportSection },
    Failed { kind: ResearchErrorKind, message: String },
    None,
}

/// The kind of a progress event, used to discriminate `ProgressPayload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEventKind {
    Started,
    PlanGenerated,
    SearchStarted,
    SearchCompleted,
    ContentExtractionStarted,
    ContentExtracted,
    AnalysisStarted,
    AnalysisCompleted,
    IterationCompleted,
    ReportGenerationStarted,
    ReportSection,
    Completed,
    Failed,
}

/// A single, totally-ordered progress event within a session's stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub kind: ProgressEventKind,
    pub current_iteration: u32,
    pub max_iterations: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: ProgressPayload,
}

impl ResearchProgress {
    pub fn new(kind: ProgressEventKind, current_iteration: u32, max_iterations: u32) -> Self {
        Self {
            kind,
            current_iteration,
            max_iterations,
            timestamp: Utc::now(),
            payload: ProgressPayload::None,
        }
    }

    pub fn with_payload(mut self, payload: ProgressPayload) -> Self {
        self.payload = payload;
        self
    }
}
