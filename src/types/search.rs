//! Search execution types: queries sent to providers and the results they return.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::query::SearchType;
use crate::types::request::ResearchDepth;

/// A query ready to be executed against a search provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub search_type: SearchType,
    pub depth: ResearchDepth,
    pub max_results: usize,
    pub include_content: bool,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            search_type,
            depth: ResearchDepth::Standard,
            max_results: 10,
            include_content: true,
        }
    }

    /// Build from an `ExpandedQuery`: priority <= 1 maps to Comprehensive
    /// (deep) depth, else Standard (basic); default cap of 10 results,
    /// content included.
    pub fn from_expanded(expanded: &crate::types::query::ExpandedQuery) -> Self {
        let depth = if expanded.priority <= 1 {
            ResearchDepth::Comprehensive
        } else {
            ResearchDepth::Standard
        };
        Self {
            query: expanded.query.clone(),
            search_type: expanded.search_type,
            depth,
            max_results: 10,
            include_content: true,
        }
    }
}

/// A single search hit returned by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSource {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub raw_content: Option<String>,
    pub relevance_score: f32,
    pub published_date: Option<DateTime<Utc>>,
}

impl SearchSource {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: String::new(),
            raw_content: None,
            relevance_score: 0.5,
            published_date: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    pub fn with_raw_content(mut self, content: impl Into<String>) -> Self {
        self.raw_content = Some(content.into());
        self
    }

    pub fn with_relevance(mut self, score: f32) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    /// Case-insensitive URL used for cross-session deduplication.
    pub fn normalized_url(&self) -> String {
        self.url.to_lowercase()
    }
}

/// The outcome of executing one `SearchQuery` against one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub provider_id: String,
    pub searched_at: DateTime<Utc>,
    pub sources: Vec<SearchSource>,
}

impl SearchResult {
    pub fn new(query: SearchQuery, provider_id: impl Into<String>, sources: Vec<SearchSource>) -> Self {
        Self {
            query,
            provider_id: provider_id.into(),
            searched_at: Utc::now(),
            sources,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::query::ExpandedQuery;

    #[test]
    fn high_priority_expanded_query_maps_to_deep_search() {
        let expanded = ExpandedQuery::new("q", 1, SearchType::Web);
        let search = SearchQuery::from_expanded(&expanded);
        assert_eq!(search.depth, ResearchDepth::Comprehensive);
    }

    #[test]
    fn low_priority_expanded_query_maps_to_basic_search() {
        let expanded = ExpandedQuery::new("q", 3, SearchType::Web);
        let search = SearchQuery::from_expanded(&expanded);
        assert_eq!(search.depth, ResearchDepth::Standard);
    }

    #[test]
    fn normalized_url_lowercases() {
        let s = SearchSource::new("HTTP://Example.com/A", "t");
        assert_eq!(s.normalized_url(), "http://example.com/a");
    }
}
