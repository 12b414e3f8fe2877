//! Query-planning types: sub-questions, perspectives and expanded queries.

use serde::{Deserialize, Serialize};

/// The kind of search a query should be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchType {
    Web,
    News,
    Academic,
}

/// A decomposed sub-question produced by the Query Expander.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: String,
    pub question: String,
    pub purpose: String,
    pub priority: i32,
}

impl SubQuestion {
    pub fn new(id: impl Into<String>, question: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            purpose: String::new(),
            priority,
        }
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = purpose.into();
        self
    }

    /// The deterministic fallback used when decomposition fails or is empty.
    pub fn fallback(original_query: &str) -> Self {
        Self {
            id: "sq_fallback".to_string(),
            question: original_query.to_string(),
            purpose: "original exploration".to_string(),
            priority: 1,
        }
    }
}

/// A discovered research angle / perspective on the topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPerspective {
    pub id: String,
    pub name: String,
    pub description: String,
    pub key_topics: Option<Vec<String>>,
}

impl ResearchPerspective {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            key_topics: None,
        }
    }

    pub fn with_key_topics(mut self, topics: Vec<String>) -> Self {
        self.key_topics = Some(topics);
        self
    }

    /// The deterministic fallback used when perspective discovery fails.
    pub fn fallback() -> Self {
        Self {
            id: "persp_fallback".to_string(),
            name: "general perspective".to_string(),
            description: "A general exploration of the topic.".to_string(),
            key_topics: None,
        }
    }
}

/// A query produced by cross-multiplying sub-questions and perspectives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpandedQuery {
    pub query: String,
    pub intent: String,
    pub priority: i32,
    pub search_type: SearchType,
    pub source_perspective_id: Option<String>,
    pub source_sub_question_id: Option<String>,
}

impl ExpandedQuery {
    pub fn new(query: impl Into<String>, priority: i32, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            intent: String::new(),
            priority,
            search_type,
            source_perspective_id: None,
            source_sub_question_id: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    pub fn with_sources(
        mut self,
        perspective_id: Option<String>,
        sub_question_id: Option<String>,
    ) -> Self {
        self.source_perspective_id = perspective_id;
        self.source_sub_question_id = sub_question_id;
        self
    }

    /// The deterministic single-query fallback for `ExpandQueries` on failure.
    pub fn fallback(original_query: &str) -> Self {
        Self::new(original_query.to_string(), 1, SearchType::Web)
    }

    /// Coerce a requested search type per `options` — News requires
    /// `include_news`, Academic requires `include_academic`, else Web.
    pub fn coerce_search_type(
        requested: SearchType,
        include_news: bool,
        include_academic: bool,
    ) -> SearchType {
        match requested {
            SearchType::News if !include_news => SearchType::Web,
            SearchType::Academic if !include_academic => SearchType::Web,
            other => other,
        }
    }

    /// Case-insensitive, whitespace-normalized text used for dedup against
    /// `state.executed_queries`.
    pub fn normalized_text(&self) -> String {
        normalize_query_text(&self.query)
    }
}

/// Normalize query text for deduplication: lowercase, collapse whitespace, trim.
pub fn normalize_query_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Options controlling query expansion behavior (capacities, flags).
#[derive(Debug, Clone)]
pub struct QueryExpansionOptions {
    pub max_sub_questions: usize,
    pub max_perspectives: usize,
    pub max_expanded_queries: usize,
    pub include_news: bool,
    pub include_academic: bool,
}

impl QueryExpansionOptions {
    pub fn for_depth(depth: crate::types::request::ResearchDepth) -> Self {
        let (max_sub_questions, max_perspectives, max_expanded_queries) = depth.expansion_limits();
        Self {
            max_sub_questions,
            max_perspectives,
            max_expanded_queries,
            include_news: false,
            include_academic: false,
        }
    }

    pub fn with_news(mut self, include: bool) -> Self {
        self.include_news = include;
        self
    }

    pub fn with_academic(mut self, include: bool) -> Self {
        self.include_academic = include;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_query_text("  Hello   World  "), "hello world");
    }

    #[test]
    fn coerce_search_type_downgrades_without_flags() {
        assert_eq!(
            ExpandedQuery::coerce_search_type(SearchType::News, false, false),
            SearchType::Web
        );
        assert_eq!(
            ExpandedQuery::coerce_search_type(SearchType::Academic, false, false),
            SearchType::Web
        );
        assert_eq!(
            ExpandedQuery::coerce_search_type(SearchType::News, true, false),
            SearchType::News
        );
    }

    #[test]
    fn fallback_subquestion_has_original_exploration_purpose() {
        let fallback = SubQuestion::fallback("hello world");
        assert_eq!(fallback.question, "hello world");
        assert_eq!(fallback.purpose, "original exploration");
    }
}
