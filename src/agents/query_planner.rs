//! Builds the initial research plan and gap-driven follow-up queries.

use tracing::info;

use crate::agents::query_expander::QueryExpander;
use crate::traits::llm::TextGenerationService;
use crate::types::finding::GapPriority;
use crate::types::query::{
    normalize_query_text, ExpandedQuery, QueryExpansionOptions, ResearchPerspective, SubQuestion,
};
use crate::types::state::ResearchState;

/// The result of the initial planning pass: expanded queries plus the
/// intermediate artifacts the orchestrator records onto state.
pub struct QueryPlanResult {
    pub queries: Vec<ExpandedQuery>,
    pub sub_questions: Vec<SubQuestion>,
    pub perspectives: Vec<ResearchPerspective>,
}

/// Builds the initial plan and follow-up queries driven by identified gaps.
pub struct QueryPlannerAgent<'a> {
    expander: QueryExpander<'a>,
}

impl<'a> QueryPlannerAgent<'a> {
    pub fn new(llm: &'a dyn TextGenerationService) -> Self {
        Self {
            expander: QueryExpander::new(llm),
        }
    }

    /// **Plan(state) → QueryPlanResult**: decompose, discover perspectives,
    /// expand, dedup by normalized text, sort by priority.
    pub async fn plan(&self, state: &ResearchState) -> QueryPlanResult {
        let options = QueryExpansionOptions::for_depth(state.request.depth)
            .with_news(state.request.include_news)
            .with_academic(state.request.include_academic);

        let sub_questions = self.expander.decompose(&state.request.query, &options).await;
        let perspectives = self
            .expander
            .discover_perspectives(&state.request.query, &options)
            .await;
        let expanded = self
            .expander
            .expand_queries(&state.request.query, &sub_questions, &perspectives, &options)
            .await;

        let queries = dedup_and_sort(expanded);

        info!(
            count = queries.len(),
            sub_questions = sub_questions.len(),
            perspectives = perspectives.len(),
            "query plan generated"
        );

        QueryPlanResult {
            queries,
            sub_questions,
            perspectives,
        }
    }

    /// **GenerateFollowUp(state) → Vec<ExpandedQuery>**: reads
    /// `state.identified_gaps` (ignoring Low priority when budget-pressed),
    /// maps gaps into sub-questions, reuses `state.research_angles` as
    /// perspectives, calls ExpandQueries, and filters out anything already
    /// executed.
    pub async fn generate_follow_up(&self, state: &ResearchState, budget_pressed: bool) -> Vec<ExpandedQuery> {
        let gaps: Vec<_> = state
            .identified_gaps
            .iter()
            .filter(|gap| !budget_pressed || gap.priority != GapPriority::Low)
            .collect();

        if gaps.is_empty() {
            return Vec::new();
        }

        let sub_questions: Vec<SubQuestion> = gaps
            .iter()
            .enumerate()
            .map(|(i, gap)| {
                SubQuestion::new(
                    format!("gap_sq_{i}"),
                    gap.suggested_query.clone(),
                    gap.priority.as_sub_question_priority(),
                )
                .with_purpose(gap.description.clone())
            })
            .collect();

        let perspectives: Vec<ResearchPerspective> = if state.research_angles.is_empty() {
            vec![ResearchPerspective::fallback()]
        } else {
            state
                .research_angles
                .iter()
                .enumerate()
                .map(|(i, angle)| ResearchPerspective::new(format!("angle_{i}"), angle.clone(), angle.clone()))
                .collect()
        };

        let options = QueryExpansionOptions::for_depth(state.request.depth)
            .with_news(state.request.include_news)
            .with_academic(state.request.include_academic);

        let expanded = self
            .expander
            .expand_queries(&state.request.query, &sub_questions, &perspectives, &options)
            .await;

        expanded
            .into_iter()
            .filter(|q| !state.has_executed_normalized(&q.normalized_text()))
            .collect()
    }
}

/// Deduplicate by case-insensitive, whitespace-normalized text, preserving
/// the first occurrence, then sort by ascending priority.
fn dedup_and_sort(queries: Vec<ExpandedQuery>) -> Vec<ExpandedQuery> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped: Vec<ExpandedQuery> = queries
        .into_iter()
        .filter(|q| seen.insert(normalize_query_text(&q.query)))
        .collect();
    deduped.sort_by_key(|q| q.priority);
    deduped
}

/// Depth mapping used by the orchestrator's later iterations.
pub fn depth_expansion_limits(depth: crate::types::request::ResearchDepth) -> (usize, usize, usize) {
    depth.expansion_limits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextGenerator;
    use crate::types::request::{ResearchDepth, ResearchRequest};

    #[tokio::test]
    async fn plan_dedups_queries_by_normalized_text() {
        let llm = MockTextGenerator::new().with_response(
            r#"{"queries":[{"query":"Rust Async","priority":1},{"query":"rust   async","priority":2}]}"#,
        );
        let agent = QueryPlannerAgent::new(&llm);
        let state = ResearchState::new(ResearchRequest::new("rust async", ResearchDepth::Quick));
        let result = agent.plan(&state).await;
        assert_eq!(result.queries.len(), 1);
    }

    #[tokio::test]
    async fn follow_up_is_empty_when_no_gaps() {
        let llm = MockTextGenerator::new();
        let agent = QueryPlannerAgent::new(&llm);
        let state = ResearchState::new(ResearchRequest::new("q", ResearchDepth::Quick));
        let follow_up = agent.generate_follow_up(&state, false).await;
        assert!(follow_up.is_empty());
    }

    #[tokio::test]
    async fn follow_up_filters_low_priority_when_budget_pressed() {
        use crate::types::finding::{GapPriority, InformationGap};

        let llm = MockTextGenerator::new().with_response(r#"{"queries":[]}"#);
        let agent = QueryPlannerAgent::new(&llm);
        let mut state = ResearchState::new(ResearchRequest::new("q", ResearchDepth::Quick));
        state
            .identified_gaps
            .push(InformationGap::new("minor gap", "minor query", GapPriority::Low));
        let follow_up = agent.generate_follow_up(&state, true).await;
        assert!(follow_up.is_empty());
    }
}
