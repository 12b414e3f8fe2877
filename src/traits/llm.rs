//! LLM collaborator ports.
//!
//! The core never talks to a concrete model backend; it calls these traits.
//! Implementations wrap specific providers and are out of scope for this
//! crate — see `testing` for deterministic mocks used by the
//! crate's own tests.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::AnalysisError;

/// Options controlling one generation call.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

impl GenerationOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

/// Token usage reported alongside a generation, if the backend supplies it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// A free-text generation response.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub token_usage: Option<TokenUsage>,
}

/// Free-text and structured-JSON generation, the port every agent prompts
/// through.
#[async_trait]
pub trait TextGenerationService: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, AnalysisError>;

    /// Generate a response constrained to a JSON schema and parse it into
    /// `T`. Returns `Ok(None)` (not an error) when the backend has nothing
    /// to say — callers degrade to their documented fallback rather than
    /// propagate an error, per this trait's "parse-then-validate" contract.
    async fn generate_structured<T>(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Option<T>, AnalysisError>
    where
        T: DeserializeOwned + Send,
    {
        let response = self.generate(prompt, options).await?;
        Ok(parse_structured_response(&response.text))
    }
}

/// Parse a structured LLM response, tolerating a leading/trailing fenced
/// code block (```json ... ```), which models commonly wrap JSON in.
/// Returns `None` rather than an error on malformed input — every caller of
/// `generate_structured` is required to have a deterministic fallback.
pub fn parse_structured_response<T: DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    let candidate = strip_code_fence(trimmed);
    serde_json::from_str(candidate).ok()
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.trim_start_matches("json").trim_start();
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    text
}

/// Embedding generation, used by Adapters rather than the core iteration
/// path.
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, AnalysisError>;

    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(model, text).await?);
        }
        Ok(out)
    }

    async fn count_tokens(&self, model: &str, text: &str) -> Result<usize, AnalysisError>;
}

/// A single request to the message-generation port (chat-style, multi-turn).
#[derive(Debug, Clone)]
pub struct MessageGenerationRequest {
    pub messages: Vec<(String, String)>, // (role, content)
    pub options: GenerationOptions,
}

/// A chat-style completion response.
#[derive(Debug, Clone)]
pub struct MessageResponse {
    pub content: String,
    pub token_usage: Option<TokenUsage>,
}

/// Multi-turn chat generation, used by Adapters.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn generate(&self, request: MessageGenerationRequest) -> Result<MessageResponse, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, PartialEq, Debug)]
    struct Example {
        value: i32,
    }

    #[test]
    fn parse_structured_response_handles_plain_json() {
        let parsed: Option<Example> = parse_structured_response(r#"{"value": 3}"#);
        assert_eq!(parsed, Some(Example { value: 3 }));
    }

    #[test]
    fn parse_structured_response_strips_code_fence() {
        let text = "```json\n{\"value\": 5}\n```";
        let parsed: Option<Example> = parse_structured_response(text);
        assert_eq!(parsed, Some(Example { value: 5 }));
    }

    #[test]
    fn parse_structured_response_returns_none_on_garbage() {
        let parsed: Option<Example> = parse_structured_response("not json at all");
        assert_eq!(parsed, None);
    }
}
