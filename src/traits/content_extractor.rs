//! The `ContentExtractor` port: raw HTML/text in, `ExtractedContent` out.

use async_trait::async_trait;

use crate::error::ExtractionError;
use crate::types::content::ExtractedContent;

/// Converts a fetched page (or raw search-result content) into clean,
/// structured text. Implementations are concrete crawler/parser
/// integrations and are out of scope for this crate; see
/// `testing::MockContentExtractor` for a deterministic stand-in.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Fetch `url` and extract its content. Implementations should never
    /// panic on malformed markup — return `ExtractedContent::failure` via
    /// `Ok` for deterministic degrade-paths, and reserve `Err` for
    /// transport-level failure (timeout, network, access denied).
    async fn extract(&self, url: &str) -> Result<ExtractedContent, ExtractionError>;

    /// Extract from content already in hand (e.g. a search provider already
    /// returned `raw_content`), skipping the fetch.
    async fn extract_from_raw(&self, url: &str, raw_html: &str) -> Result<ExtractedContent, ExtractionError>;
}
