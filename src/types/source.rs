//! `SourceDocument`: the enriched, trust-scored unit owned by `ResearchState`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::content::ContentChunk;

/// A document identity stable across a session: `"doc_" + first-12-hex(sha256(url))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    /// Derive the document id from a URL.
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("doc_{}", &hex[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An enriched web source: extracted content, trust score, optional chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: DocumentId,
    pub url: String,
    pub title: String,
    pub content: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub extracted_at: DateTime<Utc>,
    pub provider_id: String,
    pub relevance_score: f32,
    pub trust_score: f32,
    pub chunks: Option<Vec<ContentChunk>>,
}

impl SourceDocument {
    pub fn new(url: impl Into<String>, content: impl Into<String>, provider_id: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: DocumentId::from_url(&url),
            url,
            title: "Untitled".to_string(),
            content: content.into(),
            description: None,
            author: None,
            published_date: None,
            extracted_at: Utc::now(),
            provider_id: provider_id.into(),
            relevance_score: 0.5,
            trust_score: 0.5,
            chunks: None,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| "Untitled".to_string());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_published_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.published_date = date;
        self
    }

    pub fn with_relevance_score(mut self, score: f32) -> Self {
        self.relevance_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_trust_score(mut self, score: f32) -> Self {
        self.trust_score = score.clamp(0.0, 1.0);
        self
    }

    /// Override `extracted_at`, e.g. with the owning search's timestamp when
    /// content was synthesized from raw search results rather than fetched.
    pub fn with_extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = at;
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<ContentChunk>) -> Self {
        self.chunks = Some(chunks);
        self
    }

    /// Case-insensitive URL, the dedup key for `state.collected_sources`.
    pub fn normalized_url(&self) -> String {
        self.url.to_lowercase()
    }

    /// Registrable domain, used by the sufficiency score's source-diversity metric.
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
    }
}
