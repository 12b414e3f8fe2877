//! Deterministic mock implementations of the collaborator ports, for use in
//! this crate's own test suite and by downstream integrators.
//!
//! Queued or keyed canned responses, call tracking for assertions, and
//! sensible deterministic defaults when nothing was configured.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AnalysisError, ExtractionError, SearchError};
use crate::traits::content_extractor::ContentExtractor;
use crate::traits::llm::{GenerationOptions, GenerationResponse, TextGenerationService};
use crate::traits::search_provider::{ProviderCapabilities, SearchProvider};
use crate::types::content::ExtractedContent;
use crate::types::search::{SearchQuery, SearchResult as SearchOutcome, SearchSource};

/// A mock `TextGenerationService` returning queued or keyed canned text.
///
/// Responses configured with `with_response` are consumed in FIFO order;
/// `with_keyed_response` serves a fixed response whenever the prompt
/// contains the given substring, checked before the queue.
#[derive(Default)]
pub struct MockTextGenerator {
    queue: Arc<Mutex<Vec<String>>>,
    keyed: Arc<Mutex<HashMap<String, String>>>,
    fail: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockTextGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.queue.lock().unwrap().push(response.into());
        self
    }

    pub fn with_keyed_response(self, contains: impl Into<String>, response: impl Into<String>) -> Self {
        self.keyed.lock().unwrap().insert(contains.into(), response.into());
        self
    }

    pub fn with_failure(self) -> Self {
        *self.fail.lock().unwrap() = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerationService for MockTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<GenerationResponse, AnalysisError> {
        self.calls.lock().unwrap().push(prompt.to_string());

        if *self.fail.lock().unwrap() {
            return Err(AnalysisError::Llm("mock configured to fail".to_string()));
        }

        let keyed = self.keyed.lock().unwrap();
        for (needle, response) in keyed.iter() {
            if prompt.contains(needle.as_str()) {
                return Ok(GenerationResponse {
                    text: response.clone(),
                    token_usage: None,
                });
            }
        }
        drop(keyed);

        let mut queue = self.queue.lock().unwrap();
        let text = if queue.is_empty() {
            "{}".to_string()
        } else {
            queue.remove(0)
        };
        Ok(GenerationResponse { text, token_usage: None })
    }
}

/// A mock `SearchProvider` returning predefined sources for a query, keyed
/// by exact query text; unmatched queries return zero sources.
pub struct MockSearchProvider {
    id: String,
    capabilities: ProviderCapabilities,
    sources_by_query: Arc<Mutex<HashMap<String, Vec<SearchSource>>>>,
    fail_after: Arc<Mutex<Option<usize>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockSearchProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: ProviderCapabilities::web(),
            sources_by_query: Arc::new(Mutex::new(HashMap::new())),
            fail_after: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_sources(self, query: impl Into<String>, sources: Vec<SearchSource>) -> Self {
        self.sources_by_query.lock().unwrap().insert(query.into(), sources);
        self
    }

    /// Fail every call after the given number of successful calls (for
    /// retry-state-machine tests).
    pub fn fail_after(self, count: usize) -> Self {
        *self.fail_after.lock().unwrap() = Some(count);
        self
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        let call_number = *calls;
        drop(calls);

        if let Some(limit) = *self.fail_after.lock().unwrap() {
            if call_number > limit {
                return Err(SearchError::ServerError("mock exhausted".to_string()));
            }
        }

        let sources = self
            .sources_by_query
            .lock()
            .unwrap()
            .get(&query.query)
            .cloned()
            .unwrap_or_default();

        Ok(SearchOutcome::new(query.clone(), self.id.clone(), sources))
    }
}

/// A mock `ContentExtractor` returning predefined content by URL; unknown
/// URLs fail with `ExtractionError::NoContent`.
#[derive(Default)]
pub struct MockContentExtractor {
    content_by_url: Arc<Mutex<HashMap<String, String>>>,
    fail_urls: Arc<Mutex<Vec<String>>>,
}

impl MockContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.content_by_url.lock().unwrap().insert(url.into(), content.into());
        self
    }

    pub fn fail_url(self, url: impl Into<String>) -> Self {
        self.fail_urls.lock().unwrap().push(url.into());
        self
    }
}

#[async_trait]
impl ContentExtractor for MockContentExtractor {
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractionError> {
        if self.fail_urls.lock().unwrap().iter().any(|u| u == url) {
            return Err(ExtractionError::Timeout { url: url.to_string() });
        }

        match self.content_by_url.lock().unwrap().get(url) {
            Some(content) => Ok(ExtractedContent::success(url, content.clone())),
            None => Ok(ExtractedContent::failure(url, "no mock content configured")),
        }
    }

    async fn extract_from_raw(&self, url: &str, raw_html: &str) -> Result<ExtractedContent, ExtractionError> {
        Ok(ExtractedContent::success(url, raw_html.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_text_generator_serves_queue_in_order() {
        let mock = MockTextGenerator::new().with_response("first").with_response("second");
        let options = GenerationOptions::default();
        let a = mock.generate("p", &options).await.unwrap();
        let b = mock.generate("p", &options).await.unwrap();
        assert_eq!(a.text, "first");
        assert_eq!(b.text, "second");
    }

    #[tokio::test]
    async fn mock_text_generator_fails_when_configured() {
        let mock = MockTextGenerator::new().with_failure();
        let options = GenerationOptions::default();
        assert!(mock.generate("p", &options).await.is_err());
    }

    #[tokio::test]
    async fn mock_search_provider_fails_after_limit() {
        let provider = MockSearchProvider::new("tavily").fail_after(1);
        let query = SearchQuery::new("q", crate::types::query::SearchType::Web);
        assert!(provider.search(&query).await.is_ok());
        assert!(provider.search(&query).await.is_err());
    }

    #[tokio::test]
    async fn mock_content_extractor_returns_failure_for_unknown_url() {
        let extractor = MockContentExtractor::new();
        let result = extractor.extract("https://unknown.example").await.unwrap();
        assert!(!result.success);
    }
}
