//! LLM-backed decomposition, perspective discovery and query expansion.
//!
//! Follows the "parse-then-validate" pattern used throughout `traits::llm`:
//! an LLM call returns a JSON payload, which is parsed into a typed shape
//! and degrades to a deterministic fallback on any failure rather than
//! propagating an error.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::traits::llm::{GenerationOptions, TextGenerationService};
use crate::types::query::{
    ExpandedQuery, QueryExpansionOptions, ResearchPerspective, SearchType, SubQuestion,
};

#[derive(Debug, Deserialize)]
struct SubQuestionsResponse {
    #[serde(default)]
    sub_questions: Vec<RawSubQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawSubQuestion {
    question: String,
    #[serde(default)]
    purpose: String,
    #[serde(default = "default_priority")]
    priority: i32,
}

fn default_priority() -> i32 {
    2
}

#[derive(Debug, Deserialize)]
struct PerspectivesResponse {
    #[serde(default)]
    perspectives: Vec<RawPerspective>,
}

#[derive(Debug, Deserialize)]
struct RawPerspective {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    key_topics: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ExpandedQueriesResponse {
    #[serde(default)]
    queries: Vec<RawExpandedQuery>,
}

#[derive(Debug, Deserialize)]
struct RawExpandedQuery {
    query: String,
    #[serde(default)]
    intent: String,
    #[serde(default = "default_priority")]
    priority: i32,
    #[serde(default)]
    search_type: Option<String>,
    #[serde(default)]
    source_perspective_id: Option<String>,
    #[serde(default)]
    source_sub_question_id: Option<String>,
}

fn parse_search_type(raw: Option<&str>) -> SearchType {
    match raw.map(|s| s.to_lowercase()).as_deref() {
        Some("news") => SearchType::News,
        Some("academic") => SearchType::Academic,
        _ => SearchType::Web,
    }
}

/// LLM-backed decomposition, perspective discovery, and query expansion.
pub struct QueryExpander<'a> {
    llm: &'a dyn TextGenerationService,
}

impl<'a> QueryExpander<'a> {
    pub fn new(llm: &'a dyn TextGenerationService) -> Self {
        Self { llm }
    }

    /// **Decompose**: ordered sub-questions, capped at `max_sub_questions`,
    /// falling back to a single original-query sub-question on failure.
    pub async fn decompose(&self, query: &str, options: &QueryExpansionOptions) -> Vec<SubQuestion> {
        let prompt = format!(
            "Decompose the research question into distinct sub-questions that, \
             together, cover the topic. Question: {query}\n\
             Respond as JSON: {{\"sub_questions\":[{{\"question\":str,\"purpose\":str,\"priority\":int}}]}}"
        );
        let gen_options = GenerationOptions::default().with_temperature(0.4);

        let parsed: Option<SubQuestionsResponse> =
            match self.llm.generate_structured(&prompt, &gen_options).await {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(error = %err, "decompose: LLM call failed, using fallback sub-question");
                    None
                }
            };

        let mut sub_questions: Vec<SubQuestion> = parsed
            .map(|r| {
                r.sub_questions
                    .into_iter()
                    .enumerate()
                    .map(|(i, raw)| {
                        SubQuestion::new(format!("sq_{i}"), raw.question, raw.priority)
                            .with_purpose(raw.purpose)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if sub_questions.is_empty() {
            debug!("decompose: empty response, falling back to original query");
            sub_questions.push(SubQuestion::fallback(query));
        }

        sub_questions.sort_by_key(|sq| sq.priority);
        sub_questions.truncate(options.max_sub_questions);
        sub_questions
    }

    /// **DiscoverPerspectives**: research angles on the topic, falling back
    /// to a single general perspective on failure.
    pub async fn discover_perspectives(
        &self,
        query: &str,
        options: &QueryExpansionOptions,
    ) -> Vec<ResearchPerspective> {
        let prompt = format!(
            "Identify distinct perspectives or angles from which to research this topic: {query}\n\
             Respond as JSON: {{\"perspectives\":[{{\"name\":str,\"description\":str,\"key_topics\":[str]?}}]}}"
        );
        let gen_options = GenerationOptions::default().with_temperature(0.5);

        let parsed: Option<PerspectivesResponse> =
            match self.llm.generate_structured(&prompt, &gen_options).await {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(error = %err, "discover_perspectives: LLM call failed, using fallback perspective");
                    None
                }
            };

        let mut perspectives: Vec<ResearchPerspective> = parsed
            .map(|r| {
                r.perspectives
                    .into_iter()
                    .enumerate()
                    .map(|(i, raw)| {
                        let mut perspective =
                            ResearchPerspective::new(format!("persp_{i}"), raw.name, raw.description);
                        if let Some(topics) = raw.key_topics {
                            perspective = perspective.with_key_topics(topics);
                        }
                        perspective
                    })
                    .collect()
            })
            .unwrap_or_default();

        if perspectives.is_empty() {
            debug!("discover_perspectives: empty response, falling back to general perspective");
            perspectives.push(ResearchPerspective::fallback());
        }

        perspectives.truncate(options.max_perspectives);
        perspectives
    }

    /// **ExpandQueries**: cross-multiply sub-questions and perspectives into
    /// search-ready queries, falling back to a single-query list on failure.
    pub async fn expand_queries(
        &self,
        original_query: &str,
        sub_questions: &[SubQuestion],
        perspectives: &[ResearchPerspective],
        options: &QueryExpansionOptions,
    ) -> Vec<ExpandedQuery> {
        let sub_question_list = sub_questions
            .iter()
            .map(|sq| format!("- [{}] {}", sq.id, sq.question))
            .collect::<Vec<_>>()
            .join("\n");
        let perspective_list = perspectives
            .iter()
            .map(|p| format!("- [{}] {}: {}", p.id, p.name, p.description))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Original question: {original_query}\n\
             Sub-questions:\n{sub_question_list}\n\
             Perspectives:\n{perspective_list}\n\
             Produce concrete search engine queries combining these angles. Respond as JSON: \
             {{\"queries\":[{{\"query\":str,\"intent\":str,\"priority\":int,\"search_type\":\"web\"|\"news\"|\"academic\",\
             \"source_perspective_id\":str?,\"source_sub_question_id\":str?}}]}}"
        );
        let gen_options = GenerationOptions::default().with_temperature(0.4);

        let parsed: Option<ExpandedQueriesResponse> =
            match self.llm.generate_structured(&prompt, &gen_options).await {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(error = %err, "expand_queries: LLM call failed, using single-query fallback");
                    None
                }
            };

        let mut queries: Vec<ExpandedQuery> = parsed
            .map(|r| {
                r.queries
                    .into_iter()
                    .map(|raw| {
                        let requested = parse_search_type(raw.search_type.as_deref());
                        let search_type = ExpandedQuery::coerce_search_type(
                            requested,
                            options.include_news,
                            options.include_academic,
                        );
                        ExpandedQuery::new(raw.query, raw.priority, search_type)
                            .with_intent(raw.intent)
                            .with_sources(raw.source_perspective_id, raw.source_sub_question_id)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if queries.is_empty() {
            debug!("expand_queries: empty response, falling back to original query");
            queries.push(ExpandedQuery::fallback(original_query));
        }

        queries.sort_by_key(|q| q.priority);
        queries.truncate(options.max_expanded_queries);
        queries
    }
}
