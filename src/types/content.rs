//! Extracted and chunked page content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One token-bounded slice of a `SourceDocument`'s cleaned content.
///
/// Invariants: `start_position < end_position`; indices
/// are dense over `0..total_chunks`; `estimated_tokens >= 1` when the chunk
/// text is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunk {
    pub source_id: String,
    pub source_url: String,
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub estimated_tokens: usize,
    pub start_position: usize,
    pub end_position: usize,
}

impl ContentChunk {
    pub fn new(
        source_id: impl Into<String>,
        source_url: impl Into<String>,
        text: impl Into<String>,
        chunk_index: usize,
        start_position: usize,
        end_position: usize,
        estimated_tokens: usize,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            source_url: source_url.into(),
            text: text.into(),
            chunk_index,
            total_chunks: 1,
            estimated_tokens,
            start_position,
            end_position,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_position < self.end_position
            && self.chunk_index < self.total_chunks
            && (self.text.is_empty() || self.estimated_tokens >= 1)
    }
}

/// The result of processing raw HTML into clean, structured content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub text: String,
    pub length: usize,
    pub extracted_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub links: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
}

impl ExtractedContent {
    pub fn success(url: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            url: url.into(),
            title: None,
            description: None,
            author: None,
            published_date: None,
            text,
            length,
            extracted_at: Utc::now(),
            success: true,
            error_message: None,
            links: None,
            images: None,
        }
    }

    pub fn failure(url: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            description: None,
            author: None,
            published_date: None,
            text: String::new(),
            length: 0,
            extracted_at: Utc::now(),
            success: false,
            error_message: Some(error_message.into()),
            links: None,
            images: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_published_date(mut self, date: DateTime<Utc>) -> Self {
        self.published_date = Some(date);
        self
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = Some(links);
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = Some(images);
        self
    }
}
