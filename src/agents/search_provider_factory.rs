//! Registry + capability-based provider selection.
//!
//! Follows the crawler registry's provider-registration pattern, but
//! generalized to a capability bitset rather than a flat enum match so
//! providers can be selected by what they support rather than by name.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};

use crate::error::SearchError;
use crate::traits::search_provider::{ProviderCapabilities, SearchProvider};
use crate::types::query::SearchType;
use crate::types::search::{SearchQuery, SearchResult as SearchOutcome};

type DefaultRateLimiter = RateLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Wraps a `SearchProvider` with a per-provider request quota: an outer
/// `governor::RateLimiter` gate before every call, configurable to any
/// `Quota` rather than a single fixed requests-per-second rate.
pub struct RateLimitedSearchProvider<P: SearchProvider> {
    inner: P,
    limiter: Arc<DefaultRateLimiter>,
}

impl<P: SearchProvider> RateLimitedSearchProvider<P> {
    pub fn new(provider: P, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"));
        Self {
            inner: provider,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn with_quota(provider: P, quota: Quota) -> Self {
        Self {
            inner: provider,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }
}

#[async_trait]
impl<P: SearchProvider> SearchProvider for RateLimitedSearchProvider<P> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        self.limiter.until_ready().await;
        self.inner.search(query).await
    }
}

/// Registry of search providers keyed by case-insensitive id.
pub struct SearchProviderFactory {
    providers: HashMap<String, Arc<dyn SearchProvider>>,
    default_id: Option<String>,
}

impl SearchProviderFactory {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            default_id: None,
        }
    }

    pub fn register(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        let key = provider.id().to_lowercase();
        if self.default_id.is_none() {
            self.default_id = Some(key.clone());
        }
        self.providers.insert(key, provider);
        self
    }

    pub fn with_default(mut self, id: impl Into<String>) -> Self {
        self.default_id = Some(id.into().to_lowercase());
        self
    }

    /// The configured default provider; errors when none is registered.
    pub fn default_provider(&self) -> Result<Arc<dyn SearchProvider>, SearchError> {
        let id = self.default_id.as_ref().ok_or(SearchError::NoDefaultProvider)?;
        self.providers
            .get(id)
            .cloned()
            .ok_or(SearchError::NoDefaultProvider)
    }

    /// Case-insensitive lookup by provider id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn SearchProvider>, SearchError> {
        self.providers
            .get(&id.to_lowercase())
            .cloned()
            .ok_or_else(|| SearchError::ProviderNotFound(id.to_string()))
    }

    pub fn has(&self, id: &str) -> bool {
        self.providers.contains_key(&id.to_lowercase())
    }

    /// Picks the first provider whose capabilities match `search_type`,
    /// falling back to the default provider.
    pub fn select_for(&self, search_type: SearchType) -> Result<Arc<dyn SearchProvider>, SearchError> {
        for provider in self.providers.values() {
            let caps = provider.capabilities();
            let matches = match search_type {
                SearchType::Web => caps.supports_web(),
                SearchType::News => caps.supports_news(),
                SearchType::Academic => caps.supports_academic(),
            };
            if matches {
                return Ok(Arc::clone(provider));
            }
        }
        self.default_provider()
    }
}

impl Default for SearchProviderFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSearchProvider;
    use crate::traits::search_provider::ProviderCapabilities;

    #[test]
    fn get_is_case_insensitive() {
        let factory = SearchProviderFactory::new().register(Arc::new(MockSearchProvider::new("Tavily")));
        assert!(factory.get("tavily").is_ok());
        assert!(factory.get("TAVILY").is_ok());
    }

    #[test]
    fn unknown_provider_errors() {
        let factory = SearchProviderFactory::new();
        assert!(matches!(factory.get("nope"), Err(SearchError::ProviderNotFound(_))));
    }

    #[test]
    fn select_for_falls_back_to_default_when_no_capability_match() {
        let factory = SearchProviderFactory::new().register(Arc::new(
            MockSearchProvider::new("web-only").with_capabilities(ProviderCapabilities::web()),
        ));
        let provider = factory.select_for(SearchType::Academic).unwrap();
        assert_eq!(provider.id(), "web-only");
    }

    #[tokio::test]
    async fn rate_limited_provider_delegates_id_and_capabilities() {
        let wrapped = RateLimitedSearchProvider::new(MockSearchProvider::new("tavily"), 100);
        assert_eq!(wrapped.id(), "tavily");
        assert!(wrapped.capabilities().supports_web());
    }

    #[test]
    fn select_for_prefers_capability_match() {
        let factory = SearchProviderFactory::new()
            .register(Arc::new(MockSearchProvider::new("web-only").with_capabilities(ProviderCapabilities::web())))
            .register(Arc::new(
                MockSearchProvider::new("news-capable")
                    .with_capabilities(ProviderCapabilities::web().with_news()),
            ));
        let provider = factory.select_for(SearchType::News).unwrap();
        assert_eq!(provider.id(), "news-capable");
    }
}
