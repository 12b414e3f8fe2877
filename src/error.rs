//! Typed errors for the research engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Each stage has its own error
//! enum; `ResearchError` is the taxonomy surfaced to `ResearchState.errors`
//! and is the only error type that crosses the orchestrator boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while coordinating searches.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    #[error("no default search provider configured")]
    NoDefaultProvider,

    #[error("request timed out")]
    Timeout,

    #[error("rate limited, wait exceeded cap")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("network error: {0}")]
    NetworkError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("cancelled")]
    Cancelled,

    #[error("unknown search error: {0}")]
    Unknown(String),
}

/// Errors that can occur while extracting or chunking content.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction timed out: {url}")]
    Timeout { url: String },

    #[error("access denied: {url}")]
    AccessDenied { url: String },

    #[error("no content: {url}")]
    NoContent { url: String },

    #[error("parse error: {url}: {reason}")]
    ParseError { url: String, reason: String },

    #[error("network error: {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unknown extraction error: {url}")]
    Unknown { url: String },
}

/// Errors surfaced by the analysis agent's LLM calls.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("invalid JSON response: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Errors surfaced by the report generator.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("no sections generated")]
    NoSections,
}

/// The error taxonomy a session accumulates in `ResearchState.errors`.
///
/// This is the only error shape that crosses the orchestrator boundary: every
/// agent either returns a well-formed result or degrades to a fallback and
/// records one of these. The public `research*` APIs never throw for domain
/// errors, only for programmer errors (e.g. an empty request).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ResearchErrorKind {
    SearchProviderError,
    ContentExtractionError,
    LlmError,
    BudgetExceeded,
    TimeoutExceeded,
    InsufficientSources,
    Unknown,
}

/// A single recorded error, attached to `ResearchState.errors`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResearchError {
    pub kind: ResearchErrorKind,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ResearchError {
    pub fn new(kind: ResearchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn search_provider(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::SearchProviderError, message)
    }

    pub fn content_extraction(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::ContentExtractionError, message)
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::LlmError, message)
    }

    pub fn budget_exceeded(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::BudgetExceeded, message)
    }

    pub fn timeout_exceeded(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::TimeoutExceeded, message)
    }

    pub fn insufficient_sources(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::InsufficientSources, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ResearchErrorKind::Unknown, message)
    }
}

/// Errors raised by the public session API (`start_interactive`).
///
/// These are programmer errors at the session-handle boundary (e.g. mutating
/// a disposed session), distinct from the domain `ResearchError` records that
/// accumulate inside `ResearchState`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has been disposed")]
    Disposed,

    #[error("request query must not be empty")]
    EmptyQuery,
}

/// Result type alias for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Result type alias for extraction operations.
pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for analysis operations.
pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;

/// Result type alias for report operations.
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Result type alias for session operations.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
