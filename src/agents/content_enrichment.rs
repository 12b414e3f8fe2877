//! Fetches, cleans, chunks and trust-scores the sources collected by search.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agents::content_chunker::{ChunkingOptions, ContentChunker};
use crate::agents::content_processor::{ContentProcessor, ContentProcessorOptions};
use crate::error::{ExtractionError, ResearchError};
use crate::traits::content_extractor::ContentExtractor;
use crate::types::content::ExtractedContent;
use crate::types::search::{SearchResult as SearchOutcome, SearchSource};
use crate::types::source::SourceDocument;
use crate::types::state::ResearchState;

/// Options controlling one `Enrich` call.
#[derive(Debug, Clone)]
pub struct ContentEnrichmentOptions {
    pub max_parallel_extractions: usize,
    pub per_source_timeout: Duration,
    pub enable_chunking: bool,
    pub chunking: ChunkingOptions,
    pub processor: ContentProcessorOptions,
}

impl Default for ContentEnrichmentOptions {
    fn default() -> Self {
        Self {
            max_parallel_extractions: 5,
            per_source_timeout: Duration::from_secs(15),
            enable_chunking: true,
            chunking: ChunkingOptions::default(),
            processor: ContentProcessorOptions::default(),
        }
    }
}

/// A `SearchSource` paired with the provider id and search timestamp of the
/// `SearchResult` it was flattened from, so that metadata survives
/// deduplication across multiple search results.
#[derive(Clone)]
struct FlattenedSource {
    source: SearchSource,
    provider_id: String,
    searched_at: DateTime<Utc>,
}

/// A single source's enrichment outcome: either a scored `SourceDocument` or
/// a classified failure.
pub enum EnrichmentOutcome {
    Enriched(SourceDocument),
    Failed { url: String, error: ExtractionError },
}

/// The aggregate result of one `Enrich` call.
pub struct ContentEnrichmentResult {
    pub documents: Vec<SourceDocument>,
    pub failures: Vec<(String, ExtractionError)>,
}

/// Fetches, cleans, chunks and trust-scores sources discovered by search.
pub struct ContentEnrichmentAgent<'a> {
    extractor: &'a dyn ContentExtractor,
}

impl<'a> ContentEnrichmentAgent<'a> {
    pub fn new(extractor: &'a dyn ContentExtractor) -> Self {
        Self { extractor }
    }

    /// **Enrich(searchResults, options, progress) → ContentEnrichmentResult**.
    ///
    /// Flattens and deduplicates sources by URL across all search results,
    /// extracts each (bounded by `max_parallel_extractions`), and builds a
    /// trust-scored `SourceDocument`.
    pub async fn enrich(
        &self,
        search_results: &[SearchOutcome],
        options: &ContentEnrichmentOptions,
        cancellation: &CancellationToken,
    ) -> ContentEnrichmentResult {
        let unique = dedup_sources_by_url(search_results);
        let semaphore = Arc::new(Semaphore::new(options.max_parallel_extractions.max(1)));

        let mut tasks = Vec::with_capacity(unique.len());
        for flattened in unique {
            let semaphore = Arc::clone(&semaphore);
            let cancellation = cancellation.child_token();
            tasks.push(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                self.enrich_one(&flattened, options, &cancellation).await
            });
        }

        let outcomes = futures::future::join_all(tasks).await;

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                EnrichmentOutcome::Enriched(document) => documents.push(document),
                EnrichmentOutcome::Failed { url, error } => {
                    warn!(url, error = %error, "content enrichment failed");
                    failures.push((url, error));
                }
            }
        }

        ContentEnrichmentResult { documents, failures }
    }

    /// **EnrichFromState(state, plan)**: enriches new sources from the
    /// latest search results and appends them to `state`.
    pub async fn enrich_from_state(
        &self,
        state: &mut ResearchState,
        search_results: &[SearchOutcome],
        options: &ContentEnrichmentOptions,
        cancellation: &CancellationToken,
    ) -> ContentEnrichmentResult {
        let result = self.enrich(search_results, options, cancellation).await;

        for document in &result.documents {
            state.add_source_if_new(document.clone());
        }
        for (url, error) in &result.failures {
            state.record_error(ResearchError::content_extraction(format!("{url}: {error}")));
        }

        result
    }

    async fn enrich_one(
        &self,
        flattened: &FlattenedSource,
        options: &ContentEnrichmentOptions,
        cancellation: &CancellationToken,
    ) -> EnrichmentOutcome {
        let source = &flattened.source;
        let extracted = match self.fetch(source, options, cancellation).await {
            Ok(extracted) => extracted,
            Err(error) => return EnrichmentOutcome::Failed { url: source.url.clone(), error },
        };

        if !extracted.success {
            let reason = extracted.error_message.unwrap_or_else(|| "no content".to_string());
            return EnrichmentOutcome::Failed {
                url: source.url.clone(),
                error: classify_failure(&source.url, &reason),
            };
        }

        if extracted.text.trim().is_empty() {
            return EnrichmentOutcome::Failed {
                url: source.url.clone(),
                error: ExtractionError::NoContent { url: source.url.clone() },
            };
        }

        let mut document = SourceDocument::new(&source.url, extracted.text.clone(), flattened.provider_id.clone())
            .with_title(extracted.title.clone())
            .with_description(extracted.description.clone())
            .with_author(extracted.author.clone())
            .with_published_date(extracted.published_date)
            .with_relevance_score(source.relevance_score)
            .with_extracted_at(flattened.searched_at);

        document = document.with_trust_score(trust_score(&extracted, source.relevance_score));

        if options.enable_chunking {
            let chunks = ContentChunker::chunk_text(
                &document.content,
                document.id.as_str(),
                &document.url,
                &options.chunking,
            );
            if !chunks.is_empty() {
                document = document.with_chunks(chunks);
            }
        }

        EnrichmentOutcome::Enriched(document)
    }

    /// Use `raw_content` when the search provider already returned it,
    /// skipping the fetch; otherwise extract via the configured port, racing
    /// a per-source timeout against cancellation.
    async fn fetch(
        &self,
        source: &SearchSource,
        options: &ContentEnrichmentOptions,
        cancellation: &CancellationToken,
    ) -> Result<ExtractedContent, ExtractionError> {
        if let Some(raw) = &source.raw_content {
            let processed = ContentProcessor::process(raw, &source.url, &options.processor);
            return Ok(processed);
        }

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(ExtractionError::Timeout { url: source.url.clone() }),
            result = tokio::time::timeout(options.per_source_timeout, self.extractor.extract(&source.url)) => {
                match result {
                    Ok(inner) => inner,
                    Err(_) => Err(ExtractionError::Timeout { url: source.url.clone() }),
                }
            }
        }
    }
}

/// Trust score formula: base 0.5, +0.1 for an author,
/// +0.1 for a published date, +0.1 for content length in [500, 20000] or
/// -0.1 if under 200, +0.2 * relevance, clamped to [0, 1].
fn trust_score(extracted: &ExtractedContent, relevance: f32) -> f32 {
    let mut score: f32 = 0.5;
    if extracted.author.is_some() {
        score += 0.1;
    }
    if extracted.published_date.is_some() {
        score += 0.1;
    }
    let length = extracted.length;
    if (500..=20_000).contains(&length) {
        score += 0.1;
    } else if length < 200 {
        score -= 0.1;
    }
    score += 0.2 * relevance;
    score.clamp(0.0, 1.0)
}

/// Classify a deterministic-failure `ExtractedContent` into an
/// `ExtractionError` variant by inspecting its recorded error message.
fn classify_failure(url: &str, reason: &str) -> ExtractionError {
    let lower = reason.to_lowercase();
    if lower.contains("denied") || lower.contains("forbidden") || lower.contains("403") {
        ExtractionError::AccessDenied { url: url.to_string() }
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ExtractionError::Timeout { url: url.to_string() }
    } else if lower.contains("no content") || lower.contains("empty") {
        ExtractionError::NoContent { url: url.to_string() }
    } else if lower.contains("parse") {
        ExtractionError::ParseError { url: url.to_string(), reason: reason.to_string() }
    } else {
        ExtractionError::Unknown { url: url.to_string() }
    }
}

/// Flatten all search results and deduplicate by case-insensitive URL,
/// keeping the first occurrence and its owning result's provider id and
/// search timestamp.
fn dedup_sources_by_url(search_results: &[SearchOutcome]) -> Vec<FlattenedSource> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut unique = Vec::new();
    for result in search_results {
        for source in &result.sources {
            if seen.insert(source.normalized_url(), ()).is_none() {
                unique.push(FlattenedSource {
                    source: source.clone(),
                    provider_id: result.provider_id.clone(),
                    searched_at: result.searched_at,
                });
            }
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockContentExtractor;
    use crate::types::query::SearchType;
    use crate::types::search::SearchQuery;

    fn search_result(sources: Vec<SearchSource>) -> SearchOutcome {
        SearchOutcome::new(SearchQuery::new("q", SearchType::Web), "tavily", sources)
    }

    #[tokio::test]
    async fn enriches_sources_with_mock_content() {
        let extractor = MockContentExtractor::new().with_content(
            "https://a.com",
            "a".repeat(1000),
        );
        let agent = ContentEnrichmentAgent::new(&extractor);
        let results = vec![search_result(vec![SearchSource::new("https://a.com", "A").with_relevance(0.8)])];
        let options = ContentEnrichmentOptions::default();
        let token = CancellationToken::new();

        let result = agent.enrich(&results, &options, &token).await;
        assert_eq!(result.documents.len(), 1);
        assert!(result.failures.is_empty());
        assert!(result.documents[0].trust_score > 0.5);
    }

    #[tokio::test]
    async fn deduplicates_sources_across_multiple_search_results() {
        let extractor = MockContentExtractor::new().with_content("https://a.com", "content here");
        let agent = ContentEnrichmentAgent::new(&extractor);
        let results = vec![
            search_result(vec![SearchSource::new("https://a.com", "A")]),
            search_result(vec![SearchSource::new("HTTPS://A.COM", "A dup")]),
        ];
        let options = ContentEnrichmentOptions::default();
        let token = CancellationToken::new();

        let result = agent.enrich(&results, &options, &token).await;
        assert_eq!(result.documents.len(), 1);
    }

    #[tokio::test]
    async fn unknown_url_without_mock_content_is_reported_as_failure() {
        let extractor = MockContentExtractor::new();
        let agent = ContentEnrichmentAgent::new(&extractor);
        let results = vec![search_result(vec![SearchSource::new("https://unknown.example", "U")])];
        let options = ContentEnrichmentOptions::default();
        let token = CancellationToken::new();

        let result = agent.enrich(&results, &options, &token).await;
        assert!(result.documents.is_empty());
        assert_eq!(result.failures.len(), 1);
    }

    #[tokio::test]
    async fn raw_content_skips_the_fetch() {
        let extractor = MockContentExtractor::new(); // configured with nothing
        let agent = ContentEnrichmentAgent::new(&extractor);
        let results = vec![search_result(vec![
            SearchSource::new("https://a.com", "A").with_raw_content("<p>".to_string() + &"word ".repeat(200) + "</p>"),
        ])];
        let options = ContentEnrichmentOptions::default();
        let token = CancellationToken::new();

        let result = agent.enrich(&results, &options, &token).await;
        assert_eq!(result.documents.len(), 1);
    }

    #[test]
    fn trust_score_rewards_author_date_and_length() {
        let mut extracted = ExtractedContent::success("https://a.com", "x".repeat(1000));
        extracted = extracted.with_author("Jane").with_published_date(chrono::Utc::now());
        let score = trust_score(&extracted, 1.0);
        assert!(score > 0.9);
    }

    #[test]
    fn trust_score_penalizes_very_short_content() {
        let extracted = ExtractedContent::success("https://a.com", "short");
        let score = trust_score(&extracted, 0.0);
        assert!(score < 0.5);
    }
}
