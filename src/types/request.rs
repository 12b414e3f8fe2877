//! The immutable input to a research session.

use serde::{Deserialize, Serialize};

/// Coarse budget tag controlling iteration count and expansion widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchDepth {
    Quick,
    Standard,
    Comprehensive,
}

impl ResearchDepth {
    /// Maximum iterations the orchestrator will ever run at this depth,
    /// regardless of `ResearchRequest.max_iterations`.
    pub fn iteration_cap(self) -> u32 {
        match self {
            ResearchDepth::Quick => 2,
            ResearchDepth::Standard => 5,
            ResearchDepth::Comprehensive => 10,
        }
    }

    /// (max_sub_questions, max_perspectives, max_expanded_queries).
    pub fn expansion_limits(self) -> (usize, usize, usize) {
        match self {
            ResearchDepth::Quick => (5, 3, 8),
            ResearchDepth::Standard => (8, 4, 12),
            ResearchDepth::Comprehensive => (12, 6, 18),
        }
    }
}

/// Output rendering format for the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Markdown,
    Html,
    Pdf,
    Json,
}

/// The immutable input to a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
    pub depth: ResearchDepth,
    pub output_format: OutputFormat,
    pub language: String,
    pub max_iterations: u32,
    pub max_sources_per_iteration: usize,
    pub max_budget: Option<f64>,
    pub preferred_providers: Vec<String>,
    pub include_academic: bool,
    pub include_news: bool,
    pub include_domains: Vec<String>,
    pub exclude_domains: Vec<String>,
}

impl ResearchRequest {
    /// Create a request with sensible defaults for the given query and depth.
    pub fn new(query: impl Into<String>, depth: ResearchDepth) -> Self {
        Self {
            query: query.into(),
            depth,
            output_format: OutputFormat::Markdown,
            language: "en".to_string(),
            max_iterations: depth.iteration_cap(),
            max_sources_per_iteration: 10,
            max_budget: None,
            preferred_providers: Vec::new(),
            include_academic: false,
            include_news: false,
            include_domains: Vec::new(),
            exclude_domains: Vec::new(),
        }
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_sources_per_iteration(mut self, max: usize) -> Self {
        self.max_sources_per_iteration = max;
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.max_budget = Some(budget);
        self
    }

    pub fn with_academic(mut self) -> Self {
        self.include_academic = true;
        self
    }

    pub fn with_news(mut self) -> Self {
        self.include_news = true;
        self
    }

    /// `min(request.max_iterations, depth_cap)`.
    pub fn effective_max_iterations(&self) -> u32 {
        self.max_iterations.min(self.depth.iteration_cap())
    }

    pub fn is_empty_query(&self) -> bool {
        self.query.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_max_iterations_is_capped_by_depth() {
        let req = ResearchRequest::new("x", ResearchDepth::Quick).with_max_iterations(100);
        assert_eq!(req.effective_max_iterations(), 2);
    }

    #[test]
    fn effective_max_iterations_respects_lower_request_cap() {
        let req = ResearchRequest::new("x", ResearchDepth::Comprehensive).with_max_iterations(3);
        assert_eq!(req.effective_max_iterations(), 3);
    }

    #[test]
    fn expansion_limits_scale_with_depth() {
        assert_eq!(ResearchDepth::Quick.expansion_limits(), (5, 3, 8));
        assert_eq!(ResearchDepth::Standard.expansion_limits(), (8, 4, 12));
        assert_eq!(ResearchDepth::Comprehensive.expansion_limits(), (12, 6, 18));
    }
}
