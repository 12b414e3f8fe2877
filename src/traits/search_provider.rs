//! The `SearchProvider` port and its capability bitset.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::search::{SearchQuery, SearchResult as SearchOutcome};

/// What a provider is able to do, queried by the Search Provider Factory
/// when routing an `ExpandedQuery`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderCapabilities {
    bits: u8,
}

const WEB: u8 = 1 << 0;
const NEWS: u8 = 1 << 1;
const ACADEMIC: u8 = 1 << 2;
const RAW_CONTENT: u8 = 1 << 3;

impl ProviderCapabilities {
    pub const NONE: Self = Self { bits: 0 };

    pub fn web() -> Self {
        Self { bits: WEB }
    }

    pub fn with_news(mut self) -> Self {
        self.bits |= NEWS;
        self
    }

    pub fn with_academic(mut self) -> Self {
        self.bits |= ACADEMIC;
        self
    }

    pub fn with_raw_content(mut self) -> Self {
        self.bits |= RAW_CONTENT;
        self
    }

    pub fn supports_web(&self) -> bool {
        self.bits & WEB != 0
    }

    pub fn supports_news(&self) -> bool {
        self.bits & NEWS != 0
    }

    pub fn supports_academic(&self) -> bool {
        self.bits & ACADEMIC != 0
    }

    pub fn supports_raw_content(&self) -> bool {
        self.bits & RAW_CONTENT != 0
    }

    /// Whether this provider can serve the given query's `search_type`.
    pub fn supports(&self, query: &SearchQuery) -> bool {
        match query.search_type {
            crate::types::query::SearchType::Web => self.supports_web(),
            crate::types::query::SearchType::News => self.supports_news(),
            crate::types::query::SearchType::Academic => self.supports_academic(),
        }
    }
}

/// A search backend the Search Coordinator Agent drives. Implementations are
/// concrete provider integrations and are out of scope for this crate
/// see `testing::MockSearchProvider` for a deterministic stand-in.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable identifier recorded on every `SearchResult::provider_id`.
    fn id(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::query::SearchType;
    use crate::types::request::ResearchDepth;

    #[test]
    fn web_only_provider_rejects_news_query() {
        let caps = ProviderCapabilities::web();
        let query = SearchQuery {
            query: "q".into(),
            search_type: SearchType::News,
            depth: ResearchDepth::Standard,
            max_results: 10,
            include_content: true,
        };
        assert!(!caps.supports(&query));
    }

    #[test]
    fn capability_builder_composes_flags() {
        let caps = ProviderCapabilities::web().with_news().with_academic();
        assert!(caps.supports_web());
        assert!(caps.supports_news());
        assert!(caps.supports_academic());
        assert!(!caps.supports_raw_content());
    }
}
