//! Integration tests for the research orchestrator loop.
//!
//! These exercise the full session lifecycle end to end against
//! deterministic mocks: plan queries, search, extract and score content,
//! analyze findings, evaluate sufficiency, and generate a cited report.

use deep_research_core::testing::{MockContentExtractor, MockSearchProvider, MockTextGenerator};
use deep_research_core::{
    OrchestratorOptions, ResearchDepth, ResearchOrchestrator, ResearchRequest, SearchProviderFactory,
};
use deep_research_core::types::search::SearchSource;
use std::sync::Arc;

fn sufficient_llm() -> MockTextGenerator {
    MockTextGenerator::new()
        .with_response(
            r#"{"sub_questions":[{"question":"What is the organization's mission?","priority":1}]}"#,
        )
        .with_response(r#"{"perspectives":[{"name":"general","description":"general overview"}]}"#)
        .with_response(
            r#"{"queries":[{"query":"organization mission","priority":1,"search_type":"web"}]}"#,
        )
        .with_response(
            r#"{"findings":[{"claim":"The organization supports local communities.","verification_score":0.9}]}"#,
        )
        .with_response(r#"{"gaps":[]}"#)
        .with_response(r#"{"coverage":0.9,"quality":0.85}"#)
        .with_response(r#"{"title":"Research Report","sections":[{"title":"Overview","purpose":"summarize findings"}]}"#)
        .with_response(r#"{"content":"The organization supports local communities [1]."}"#)
}

fn single_source_factory() -> SearchProviderFactory {
    let provider = MockSearchProvider::new("tavily").with_sources(
        "organization mission",
        vec![SearchSource::new("https://example.org/about", "About Us")],
    );
    SearchProviderFactory::new().register(Arc::new(provider))
}

#[tokio::test]
async fn full_research_loop_produces_cited_report() {
    let llm = sufficient_llm();
    let factory = single_source_factory();
    let extractor = MockContentExtractor::new()
        .with_content("https://example.org/about", "Our organization helps communities thrive.");

    let orchestrator = ResearchOrchestrator::new(&llm, &factory, &extractor);
    let request = ResearchRequest::new("What does this organization do?", ResearchDepth::Quick);

    let result = orchestrator.research(request, &OrchestratorOptions::default()).await;

    assert!(!result.is_partial);
    assert_eq!(result.iterations_run, 1);
    assert!(!result.report.is_empty());
    assert!(!result.findings.is_empty());
    assert!(result.sources().len() >= 1);
}

#[tokio::test]
async fn empty_query_yields_partial_result_with_no_sources() {
    let llm = MockTextGenerator::new();
    let factory = SearchProviderFactory::new();
    let extractor = MockContentExtractor::new();

    let orchestrator = ResearchOrchestrator::new(&llm, &factory, &extractor);
    let request = ResearchRequest::new("   ", ResearchDepth::Quick);

    let result = orchestrator.research(request, &OrchestratorOptions::default()).await;

    assert!(result.is_partial);
    assert!(result.report.is_empty());
    assert!(result.sources().is_empty());
    assert!(!result.errors.is_empty());
}

#[tokio::test]
async fn interactive_session_runs_one_iteration_at_a_time() {
    let llm = sufficient_llm();
    let factory = single_source_factory();
    let extractor = MockContentExtractor::new()
        .with_content("https://example.org/about", "Our organization helps communities thrive.");

    let orchestrator = ResearchOrchestrator::new(&llm, &factory, &extractor);
    let request = ResearchRequest::new("What does this organization do?", ResearchDepth::Quick);

    let mut session = orchestrator
        .start_interactive(request, OrchestratorOptions::default())
        .expect("non-empty query starts a session");

    let wants_more = session.continue_().await.expect("iteration succeeds");
    assert!(!wants_more, "a sufficient first iteration should not ask for more research");

    let result = session.finalize().await.expect("finalize succeeds once");
    assert!(!result.is_partial);
    assert!(!result.report.is_empty());
}

#[tokio::test]
async fn depth_caps_iterations_even_when_sufficiency_is_never_reached() {
    let llm = MockTextGenerator::new()
        .with_response(r#"{"sub_questions":[{"question":"q","priority":1}]}"#)
        .with_response(r#"{"perspectives":[]}"#)
        .with_response(r#"{"queries":[{"query":"q","priority":1,"search_type":"web"}]}"#)
        .with_response(r#"{"findings":[]}"#)
        .with_response(r#"{"gaps":[{"description":"missing detail","priority":"high"}]}"#)
        .with_response(r#"{"coverage":0.1,"quality":0.1}"#);
    let factory = SearchProviderFactory::new();
    let extractor = MockContentExtractor::new();

    let orchestrator = ResearchOrchestrator::new(&llm, &factory, &extractor);
    let request = ResearchRequest::new("an unanswerable question", ResearchDepth::Quick);

    let result = orchestrator.research(request, &OrchestratorOptions::default()).await;

    assert!(result.iterations_run <= ResearchDepth::Quick.iteration_cap());
}
