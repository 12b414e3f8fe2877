//! External collaborator ports: the seams at which this crate stops and a
//! concrete backend integration begins.

pub mod content_extractor;
pub mod llm;
pub mod search_provider;

pub use content_extractor::ContentExtractor;
pub use llm::{EmbeddingGenerator, MessageGenerator, TextGenerationService};
pub use search_provider::{ProviderCapabilities, SearchProvider};
