//! Autonomous deep research orchestration engine.
//!
//! Given a user question, this crate iteratively plans search queries,
//! coordinates web searches across registered providers, extracts and
//! chunks page content, analyzes evidence with an LLM, evaluates whether
//! accumulated research is sufficient, and synthesizes a structured,
//! citation-bearing report — all behind a bounded iteration loop with
//! progress streaming.
//!
//! Concrete LLM backends, search providers, HTTP clients and HTML parsers
//! are out of scope: this crate consumes them through the traits in
//! [`traits`] and leaves integration to the caller.

pub mod agents;
pub mod error;
pub mod orchestrator;
pub mod traits;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agents::{
    AnalysisAgent, AnalysisOptions, ChunkingOptions, ContentChunker, ContentEnrichmentAgent,
    ContentEnrichmentOptions, ContentProcessor, ContentProcessorOptions, QueryPlannerAgent,
    RateLimitedSearchProvider, ReportGeneratorAgent, ReportGeneratorOptions, SearchCoordinatorAgent,
    SearchCoordinatorOptions, SearchProviderFactory,
};
pub use error::{ResearchError, ResearchErrorKind, SessionError};
pub use orchestrator::{OrchestratorOptions, ResearchOrchestrator, Session};
pub use traits::{ContentExtractor, EmbeddingGenerator, MessageGenerator, SearchProvider, TextGenerationService};
pub use types::content::{ContentChunk, ExtractedContent};
pub use types::finding::{Finding, GapPriority, InformationGap};
pub use types::progress::{ProgressEventKind, ProgressPayload, ResearchProgress};
pub use types::query::{ExpandedQuery, ResearchPerspective, SearchType, SubQuestion};
pub use types::report::{Citation, CitationStyle, OutlineSection, ReportOutline, ReportSection};
pub use types::request::{OutputFormat, ResearchDepth, ResearchRequest};
pub use types::result::ResearchResult;
pub use types::search::{SearchQuery, SearchResult, SearchSource};
pub use types::source::SourceDocument;
pub use types::state::{ResearchPhase, ResearchState};
pub use types::sufficiency::SufficiencyScore;
pub use types::thinking::{ThinkingStep, ThinkingStepType};
