//! Finding extraction, gap identification and sufficiency evaluation.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::traits::llm::{parse_structured_response, GenerationOptions, TextGenerationService};
use crate::types::finding::{Finding, GapPriority, InformationGap};
use crate::types::source::SourceDocument;
use crate::types::state::ResearchState;
use crate::types::sufficiency::SufficiencyScore;

const CONTENT_PREVIEW_CHARS: usize = 3000;
const MAX_FINDINGS_PER_SOURCE: usize = 5;

/// Options controlling one `Analyze` call.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub max_sources_to_analyze: usize,
    pub max_gaps: usize,
    pub sufficiency_threshold: f32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_sources_to_analyze: 10,
            max_gaps: 5,
            sufficiency_threshold: 0.75,
        }
    }
}

/// The result of one analysis pass.
pub struct AnalysisResult {
    pub findings: Vec<Finding>,
    pub gaps: Vec<InformationGap>,
    pub sufficiency: SufficiencyScore,
    pub needs_more_research: bool,
}

#[derive(Deserialize)]
struct FindingsResponse {
    #[serde(default)]
    findings: Vec<RawFinding>,
}

#[derive(Deserialize)]
struct RawFinding {
    claim: String,
    #[serde(default)]
    evidence_quote: Option<String>,
    #[serde(default = "default_verification_score")]
    verification_score: f32,
}

fn default_verification_score() -> f32 {
    0.5
}

#[derive(Deserialize)]
struct GapsResponse {
    #[serde(default)]
    gaps: Vec<RawGap>,
}

#[derive(Deserialize)]
struct RawGap {
    description: String,
    suggested_query: String,
    #[serde(default)]
    priority: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct SufficiencyJudgment {
    #[serde(default = "default_half")]
    coverage: f32,
    #[serde(default = "default_half")]
    quality: f32,
}

fn default_half() -> f32 {
    0.5
}

/// Extracts findings, identifies gaps and scores whether evidence is
/// sufficient to stop iterating.
pub struct AnalysisAgent<'a> {
    llm: &'a dyn TextGenerationService,
}

impl<'a> AnalysisAgent<'a> {
    pub fn new(llm: &'a dyn TextGenerationService) -> Self {
        Self { llm }
    }

    /// **Analyze(state, options) → AnalysisResult**.
    pub async fn analyze(&self, state: &ResearchState, options: &AnalysisOptions) -> AnalysisResult {
        let selected = select_sources_for_analysis(&state.collected_sources, options.max_sources_to_analyze);

        let mut findings = Vec::new();
        for source in &selected {
            let extracted = self.extract_findings(source, state.current_iteration).await;
            findings.extend(extracted);
        }
        let findings = dedup_findings(findings);

        let gaps = self.identify_gaps(state, &findings, options.max_gaps).await;
        let sufficiency = self.evaluate_sufficiency(state, &findings, &gaps, options).await;

        let needs_more_research = !sufficiency.is_sufficient(options.sufficiency_threshold) && !gaps.is_empty();

        info!(
            findings = findings.len(),
            gaps = gaps.len(),
            overall = sufficiency.overall,
            needs_more_research,
            "analysis pass complete"
        );

        AnalysisResult {
            findings,
            gaps,
            sufficiency,
            needs_more_research,
        }
    }

    /// **AnalyzeFromState(state)**: runs `Analyze` and appends its output
    /// onto `state` in place.
    pub async fn analyze_from_state(&self, state: &mut ResearchState, options: &AnalysisOptions) -> AnalysisResult {
        let result = self.analyze(state, options).await;
        state.findings.extend(result.findings.iter().cloned());
        state.identified_gaps.extend(result.gaps.iter().cloned());
        state.last_sufficiency_score = Some(result.sufficiency.clone());
        result
    }

    /// **ExtractFindings(source, iteration) → Vec<Finding>**: an LLM call
    /// per source, capped at `MAX_FINDINGS_PER_SOURCE`, stamped with the
    /// current iteration for the dedup-preference and provenance rules.
    async fn extract_findings(&self, source: &SourceDocument, iteration: u32) -> Vec<Finding> {
        let preview: String = source.content.chars().take(CONTENT_PREVIEW_CHARS).collect();
        let prompt = format!(
            "Extract atomic, verifiable factual claims from the following source.\n\nSource title: {}\nSource URL: {}\n\nContent:\n{}\n\nRespond as JSON: {{\"findings\": [{{\"claim\": \"...\", \"evidence_quote\": \"...\", \"verification_score\": 0.0-1.0}}]}}",
            source.title, source.url, preview
        );
        let options = GenerationOptions {
            temperature: 0.3,
            ..Default::default()
        };

        let response = match self.llm.generate(&prompt, &options).await {
            Ok(response) => response,
            Err(_) => return Vec::new(),
        };

        let parsed: Option<FindingsResponse> = parse_structured_response(&response.text);
        let raw = match parsed {
            Some(parsed) => parsed.findings,
            None => return Vec::new(),
        };

        raw.into_iter()
            .take(MAX_FINDINGS_PER_SOURCE)
            .enumerate()
            .map(|(k, raw)| {
                let id = format!("find_{}_{}", source.id.as_str(), k);
                let mut finding = Finding::new(id, raw.claim, source.id.as_str(), raw.verification_score, iteration);
                if let Some(quote) = raw.evidence_quote {
                    finding = finding.with_evidence_quote(quote);
                }
                finding
            })
            .collect()
    }

    /// **IdentifyGaps(state, findings, maxGaps) → Vec<InformationGap>**.
    async fn identify_gaps(&self, state: &ResearchState, findings: &[Finding], max_gaps: usize) -> Vec<InformationGap> {
        let claims: Vec<&str> = findings.iter().map(|f| f.claim.as_str()).collect();
        let prompt = format!(
            "Research question: {}\n\nFindings gathered so far:\n{}\n\nIdentify gaps in the evidence: what important sub-questions remain unanswered? Respond as JSON: {{\"gaps\": [{{\"description\": \"...\", \"suggested_query\": \"...\", \"priority\": \"high|medium|low\"}}]}}",
            state.request.query,
            claims.join("\n- ")
        );
        let options = GenerationOptions {
            temperature: 0.4,
            ..Default::default()
        };

        let response = match self.llm.generate(&prompt, &options).await {
            Ok(response) => response,
            Err(_) => return Vec::new(),
        };

        let parsed: Option<GapsResponse> = parse_structured_response(&response.text);
        let raw = match parsed {
            Some(parsed) => parsed.gaps,
            None => return Vec::new(),
        };

        raw.into_iter()
            .take(max_gaps)
            .map(|gap| {
                let priority = gap
                    .priority
                    .as_deref()
                    .map(GapPriority::parse_or_medium)
                    .unwrap_or(GapPriority::Medium);
                InformationGap::new(gap.description, gap.suggested_query, priority)
            })
            .collect()
    }

    /// **EvaluateSufficiency(state, findings, gaps) → SufficiencyScore**:
    /// `coverage`/`quality` come from an LLM judgment (0.5/0.5 fallback on
    /// failure); `source_diversity`/`freshness` are computed locally.
    async fn evaluate_sufficiency(
        &self,
        state: &ResearchState,
        findings: &[Finding],
        gaps: &[InformationGap],
        options: &AnalysisOptions,
    ) -> SufficiencyScore {
        let (coverage, quality) = self.judge_coverage_and_quality(state, findings).await;
        let source_diversity = source_diversity(&state.collected_sources);
        let freshness = freshness(&state.collected_sources);

        let new_findings_this_iteration = findings
            .iter()
            .filter(|f| f.iteration_discovered == state.current_iteration)
            .count();

        let _ = options; // threshold applied by caller, not the scoring formula itself
        SufficiencyScore::compose(coverage, quality, source_diversity, freshness, gaps.len(), new_findings_this_iteration)
    }

    async fn judge_coverage_and_quality(&self, state: &ResearchState, findings: &[Finding]) -> (f32, f32) {
        let claims: Vec<&str> = findings.iter().map(|f| f.claim.as_str()).collect();
        let prompt = format!(
            "Research question: {}\n\nFindings:\n{}\n\nJudge how thoroughly these findings cover the question (coverage) and how reliable they are (quality), each from 0.0 to 1.0. Respond as JSON: {{\"coverage\": 0.0, \"quality\": 0.0}}",
            state.request.query,
            claims.join("\n- ")
        );
        let options = GenerationOptions {
            temperature: 0.2,
            ..Default::default()
        };

        let response = match self.llm.generate(&prompt, &options).await {
            Ok(response) => response,
            Err(_) => return (0.5, 0.5),
        };

        match parse_structured_response::<SufficiencyJudgment>(&response.text) {
            Some(judgment) => (judgment.coverage.clamp(0.0, 1.0), judgment.quality.clamp(0.0, 1.0)),
            None => (0.5, 0.5),
        }
    }
}

/// Select sources for analysis: sort by relevance desc then trust desc, take
/// the top N.
fn select_sources_for_analysis(sources: &[SourceDocument], max: usize) -> Vec<SourceDocument> {
    let mut sorted: Vec<&SourceDocument> = sources.iter().collect();
    sorted.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.trust_score.partial_cmp(&a.trust_score).unwrap_or(std::cmp::Ordering::Equal))
    });
    sorted.into_iter().take(max).cloned().collect()
}

/// Deduplicate findings by lowercased-first-50-chars, preferring the
/// higher-verification-score finding on a collision.
fn dedup_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut best: std::collections::HashMap<String, Finding> = std::collections::HashMap::new();
    for finding in findings {
        let key = finding.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.verification_score >= finding.verification_score => {}
            _ => {
                best.insert(key, finding);
            }
        }
    }
    best.into_values().collect()
}

/// `mean(min(1, distinct_domains/5), min(1, distinct_providers/3))`.
fn source_diversity(sources: &[SourceDocument]) -> f32 {
    if sources.is_empty() {
        return 0.0;
    }
    let domains: HashSet<String> = sources.iter().filter_map(|s| s.domain()).collect();
    let providers: HashSet<&str> = sources.iter().map(|s| s.provider_id.as_str()).collect();
    let domain_score = (domains.len() as f32 / 5.0).min(1.0);
    let provider_score = (providers.len() as f32 / 3.0).min(1.0);
    ((domain_score + provider_score) / 2.0).clamp(0.0, 1.0)
}

/// Per-source age-based freshness, averaged across sources: `<=7d -> 1.0`,
/// `<=30d -> 0.9`, `<=90d -> 0.7`, `<=365d -> 0.5`, else `0.3`; sources
/// without a published date score 0.5.
fn freshness(sources: &[SourceDocument]) -> f32 {
    if sources.is_empty() {
        return 0.0;
    }
    let now = Utc::now();
    let total: f32 = sources
        .iter()
        .map(|s| match s.published_date {
            None => 0.5,
            Some(d) => {
                let age_days = (now - d).num_days();
                if age_days <= 7 {
                    1.0
                } else if age_days <= 30 {
                    0.9
                } else if age_days <= 90 {
                    0.7
                } else if age_days <= 365 {
                    0.5
                } else {
                    0.3
                }
            }
        })
        .sum();
    (total / sources.len() as f32).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextGenerator;
    use crate::types::request::{ResearchDepth, ResearchRequest};

    fn state_with_sources(n: usize) -> ResearchState {
        let mut state = ResearchState::new(ResearchRequest::new("rust async", ResearchDepth::Quick));
        for i in 0..n {
            state.collected_sources.push(
                SourceDocument::new(format!("https://a{i}.com"), "content ".repeat(100), "tavily")
                    .with_relevance_score(0.9),
            );
        }
        state
    }

    #[tokio::test]
    async fn analyze_extracts_findings_and_flags_more_research_needed() {
        let llm = MockTextGenerator::new()
            .with_response(r#"{"findings":[{"claim":"Rust has a borrow checker","verification_score":0.9}]}"#)
            .with_response(r#"{"gaps":[{"description":"missing perf data","suggested_query":"rust async perf","priority":"high"}]}"#)
            .with_response(r#"{"coverage":0.3,"quality":0.4}"#);
        let agent = AnalysisAgent::new(&llm);
        let state = state_with_sources(1);
        let options = AnalysisOptions::default();

        let result = agent.analyze(&state, &options).await;
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.gaps.len(), 1);
        assert!(result.needs_more_research);
    }

    #[tokio::test]
    async fn no_gaps_means_no_more_research_needed_even_if_score_low() {
        let llm = MockTextGenerator::new()
            .with_response(r#"{"findings":[]}"#)
            .with_response(r#"{"gaps":[]}"#)
            .with_response(r#"{"coverage":0.1,"quality":0.1}"#);
        let agent = AnalysisAgent::new(&llm);
        let state = state_with_sources(1);
        let options = AnalysisOptions::default();

        let result = agent.analyze(&state, &options).await;
        assert!(!result.needs_more_research);
    }

    #[test]
    fn dedup_findings_prefers_higher_verification_score() {
        let low = Finding::new("f1", "Same Claim Text Duplicated", "doc_1", 0.3, 1);
        let high = Finding::new("f2", "same claim text duplicated", "doc_1", 0.9, 1);
        let deduped = dedup_findings(vec![low, high]);
        assert_eq!(deduped.len(), 1);
        assert!((deduped[0].verification_score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn source_diversity_averages_domain_and_provider_ratios() {
        // 2 distinct domains (/5 = 0.4), 1 distinct provider (/3 ~= 0.333)
        let sources = vec![
            SourceDocument::new("https://a.com/1", "x", "tavily"),
            SourceDocument::new("https://a.com/2", "x", "tavily"),
            SourceDocument::new("https://b.com/1", "x", "tavily"),
        ];
        let expected = (0.4 + (1.0f32 / 3.0)) / 2.0;
        assert!((source_diversity(&sources) - expected).abs() < 1e-6);
    }

    #[test]
    fn select_sources_sorts_by_relevance_then_trust() {
        let low = SourceDocument::new("https://a.com", "x", "tavily")
            .with_relevance_score(0.5)
            .with_trust_score(0.9);
        let high = SourceDocument::new("https://b.com", "x", "tavily")
            .with_relevance_score(0.9)
            .with_trust_score(0.1);
        let selected = select_sources_for_analysis(&[low, high.clone()], 1);
        assert_eq!(selected[0].url, high.url);
    }
}
