//! Outline planning, section writing and citation post-processing.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::traits::llm::{parse_structured_response, GenerationOptions, TextGenerationService};
use crate::types::finding::Finding;
use crate::types::report::{Citation, CitationStyle, OutlineSection, ReportOutline, ReportSection};
use crate::types::state::ResearchState;

const MAX_FINDINGS_PER_SECTION: usize = 10;
const MAX_SOURCES_PER_SECTION: usize = 5;

/// Options controlling one report-generation pass.
#[derive(Debug, Clone)]
pub struct ReportGeneratorOptions {
    pub max_sections: usize,
    pub citation_style: CitationStyle,
}

impl Default for ReportGeneratorOptions {
    fn default() -> Self {
        Self {
            max_sections: 8,
            citation_style: CitationStyle::Numbered,
        }
    }
}

/// The generator's terminal output: the assembled markdown body and the
/// citations it references, sorted by number.
pub struct GeneratedReport {
    pub body: String,
    pub citations: Vec<Citation>,
    pub sections: Vec<ReportSection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlineResponse {
    title: String,
    sections: Vec<RawOutlineSection>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOutlineSection {
    title: String,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    key_points: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionResponse {
    content: String,
    #[serde(default)]
    #[allow(dead_code)]
    used_findings: Vec<String>,
    #[serde(default)]
    citations: Vec<RawCitation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCitation {
    source_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    quote: Option<String>,
}

/// Allocates citation numbers in first-seen order across all sections of a
/// report, so the shared counter never collides between sections.
struct CitationRegistry {
    next_number: u32,
    by_source_id: HashMap<String, Citation>,
}

impl CitationRegistry {
    fn new() -> Self {
        Self {
            next_number: 1,
            by_source_id: HashMap::new(),
        }
    }

    /// Register `source_id`, allocating a new number on first sight; returns
    /// `None` if the id cannot be resolved in `state`, so the caller can
    /// drop any source id that cannot be resolved.
    fn register(&mut self, source_id: &str, state: &ResearchState) -> Option<Citation> {
        if let Some(existing) = self.by_source_id.get(source_id) {
            return Some(existing.clone());
        }
        let source = state.resolve_source(source_id)?;
        let citation = Citation::new(self.next_number, source_id, source.url.clone(), source.title.clone())
            .with_author(source.author.clone())
            .with_published_date(source.published_date);
        self.next_number += 1;
        self.by_source_id.insert(source_id.to_string(), citation.clone());
        Some(citation)
    }

    fn into_sorted(self) -> Vec<Citation> {
        let mut citations: Vec<Citation> = self.by_source_id.into_values().collect();
        citations.sort_by_key(|c| c.number);
        citations
    }
}

/// Plans the outline, writes each section, resolves citations and
/// assembles the final markdown report.
pub struct ReportGeneratorAgent<'a> {
    llm: &'a dyn TextGenerationService,
}

impl<'a> ReportGeneratorAgent<'a> {
    pub fn new(llm: &'a dyn TextGenerationService) -> Self {
        Self { llm }
    }

    /// Runs GeneratingOutline → GeneratingSections → ProcessingCitations →
    /// AssemblingReport in sequence and returns the completed report.
    pub async fn generate(&self, state: &ResearchState, options: &ReportGeneratorOptions) -> GeneratedReport {
        let outline = self.generate_outline(state, options).await;

        let mut registry = CitationRegistry::new();
        let mut sections = Vec::with_capacity(outline.sections.len());
        for (index, outline_section) in outline.sections.iter().enumerate() {
            let section = self
                .generate_section(outline_section, index, state, &mut registry, options)
                .await;
            sections.push(section);
        }

        let citations = registry.into_sorted();
        let body = assemble_report(&outline, &sections);

        GeneratedReport { body, citations, sections }
    }

    /// **GenerateOutline(state, options) → ReportOutline**.
    async fn generate_outline(&self, state: &ResearchState, options: &ReportGeneratorOptions) -> ReportOutline {
        let claims: Vec<&str> = state.findings.iter().map(|f| f.claim.as_str()).collect();
        let prompt = format!(
            "Research question: {}\n\nKey findings:\n{}\n\nPropose a report outline. Respond as JSON: {{\"title\": \"...\", \"sections\": [{{\"title\": \"...\", \"purpose\": \"...\", \"keyPoints\": [\"...\"]}}]}}",
            state.request.query,
            claims.join("\n- ")
        );
        let generation_options = GenerationOptions {
            temperature: 0.4,
            ..Default::default()
        };

        let response = match self.llm.generate(&prompt, &generation_options).await {
            Ok(response) => response,
            Err(_) => return default_outline(state),
        };

        match parse_structured_response::<OutlineResponse>(&response.text) {
            Some(parsed) if !parsed.sections.is_empty() => {
                let sections: Vec<OutlineSection> = parsed
                    .sections
                    .into_iter()
                    .take(options.max_sections)
                    .enumerate()
                    .map(|(order, raw)| OutlineSection::new(raw.title, raw.purpose, order).with_key_points(raw.key_points))
                    .collect();
                ReportOutline::new(parsed.title, sections)
            }
            _ => default_outline(state),
        }
    }

    /// **GenerateSection(outlineSection, index, citationCtx) → ReportSection**.
    async fn generate_section(
        &self,
        outline_section: &OutlineSection,
        index: usize,
        state: &ResearchState,
        registry: &mut CitationRegistry,
        options: &ReportGeneratorOptions,
    ) -> ReportSection {
        let relevant = select_relevant_findings(outline_section, &state.findings);

        let findings_block: Vec<String> = relevant
            .iter()
            .map(|f| format!("- [{}] {}", f.source_id, f.claim))
            .collect();
        let prompt = format!(
            "Section: {}\nPurpose: {}\n\nRelevant findings (each tagged with its source id):\n{}\n\nWrite the section's markdown body. Cite sources inline using the literal token [sourceId]. Respond as JSON: {{\"content\": \"...\", \"citations\": [{{\"sourceId\": \"...\", \"quote\": \"...\"}}]}}",
            outline_section.title,
            outline_section.purpose,
            findings_block.join("\n")
        );
        let generation_options = GenerationOptions {
            temperature: 0.5,
            ..Default::default()
        };

        let response = match self.llm.generate(&prompt, &generation_options).await {
            Ok(response) => response,
            Err(_) => return ReportSection::placeholder(outline_section.title.clone(), index),
        };

        let parsed: Option<SectionResponse> = parse_structured_response(&response.text);
        let parsed = match parsed {
            Some(parsed) => parsed,
            None => return ReportSection::placeholder(outline_section.title.clone(), index),
        };

        let mut content = parsed.content;
        for raw_citation in &parsed.citations {
            if let Some(citation) = registry.register(&raw_citation.source_id, state) {
                let token = format!("[{}]", raw_citation.source_id);
                let rendered = citation.render(options.citation_style);
                content = content.replace(&token, &rendered);
            }
        }

        let related_finding_ids: Vec<String> = relevant.iter().map(|f| f.id.clone()).collect();
        ReportSection::new(outline_section.title.clone(), content, index).with_related_findings(related_finding_ids)
    }
}

/// Deterministic fallback outline used when outline generation fails.
fn default_outline(state: &ResearchState) -> ReportOutline {
    let top_claims: Vec<String> = state.findings.iter().take(5).map(|f| f.claim.clone()).collect();
    ReportOutline::default_outline(&state.request.query, &top_claims)
}

/// Select findings relevant to a section by keyword intersection between
/// the section's title+purpose and each finding's claim, capped at 10
/// findings then at 5 distinct referenced sources.
fn select_relevant_findings<'f>(section: &OutlineSection, findings: &'f [Finding]) -> Vec<&'f Finding> {
    let section_tokens = tokenize(&format!("{} {}", section.title, section.purpose));
    if section_tokens.is_empty() {
        return Vec::new();
    }

    let mut selected = Vec::new();
    let mut sources_seen: HashSet<&str> = HashSet::new();

    for finding in findings {
        if selected.len() >= MAX_FINDINGS_PER_SECTION {
            break;
        }
        let finding_tokens = tokenize(&finding.claim);
        let overlaps = finding_tokens.iter().any(|t| section_tokens.contains(t));
        if !overlaps {
            continue;
        }
        if sources_seen.len() >= MAX_SOURCES_PER_SECTION && !sources_seen.contains(finding.source_id.as_str()) {
            continue;
        }
        sources_seen.insert(finding.source_id.as_str());
        selected.push(finding);
    }

    selected
}

/// Tokenize on punctuation and whitespace, lowercase, drop words of length
/// <= 2 and a bilingual (English/Korean) stopword set.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|word| word.to_lowercase())
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

const STOPWORDS: &[&str] = &[
    // English
    "the", "and", "for", "are", "was", "were", "that", "this", "with", "from", "has", "have",
    "had", "not", "but", "its", "their", "they", "them", "his", "her", "which", "who", "what",
    "when", "where", "how", "into", "out", "over", "under", "than", "then", "also", "such",
    "been", "being", "more", "most", "some", "each", "other", "about", "because",
    // Korean (common particles / function words, each > 2 bytes but short in tokens)
    "이것", "저것", "그것", "그리고", "하지만", "그러나", "때문에", "그래서", "또한", "있다", "없다",
];

/// **AssembleReport(outline, sections) → markdown body**.
fn assemble_report(outline: &ReportOutline, sections: &[ReportSection]) -> String {
    let mut body = format!("# {}\n\n", outline.title);
    let mut ordered = sections.to_vec();
    ordered.sort_by_key(|s| s.order);
    for section in &ordered {
        body.push_str(&format!("## {}\n\n{}\n\n", section.title, section.content));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTextGenerator;
    use crate::types::request::{ResearchDepth, ResearchRequest};
    use crate::types::source::SourceDocument;

    fn state_with_finding() -> ResearchState {
        let mut state = ResearchState::new(ResearchRequest::new("rust async runtimes", ResearchDepth::Quick));
        let source = SourceDocument::new("https://a.com", "body", "tavily").with_title(Some("Async Rust".to_string()));
        let source_id = source.id.as_str().to_string();
        state.collected_sources.push(source);
        state.findings.push(Finding::new("f1", "Tokio is a popular async runtime", &source_id, 0.9, 1));
        state
    }

    #[tokio::test]
    async fn generate_produces_report_with_numbered_citations() {
        let state = state_with_finding();
        let source_id = state.collected_sources[0].id.as_str().to_string();
        let llm = MockTextGenerator::new()
            .with_response(r#"{"title":"Async Rust Report","sections":[{"title":"Overview","purpose":"intro"}]}"#)
            .with_keyed_response(
                "Overview",
                format!(
                    r#"{{"content":"Tokio is widely used [{source_id}].","citations":[{{"sourceId":"{source_id}","quote":"q"}}]}}"#
                ),
            );
        let agent = ReportGeneratorAgent::new(&llm);
        let options = ReportGeneratorOptions::default();

        let report = agent.generate(&state, &options).await;
        assert!(report.body.starts_with("# Async Rust Report"));
        assert_eq!(report.citations.len(), 1);
        assert_eq!(report.citations[0].number, 1);
        assert!(report.body.contains("[1]"));
    }

    #[tokio::test]
    async fn outline_falls_back_to_default_on_llm_failure() {
        let llm = MockTextGenerator::new().with_failure();
        let agent = ReportGeneratorAgent::new(&llm);
        let state = state_with_finding();
        let options = ReportGeneratorOptions::default();

        let report = agent.generate(&state, &options).await;
        assert!(report.body.contains("Key Findings"));
        assert!(report.sections.iter().all(|s| s.content.starts_with("[section generation failed")));
    }

    #[test]
    fn select_relevant_findings_requires_keyword_overlap() {
        let section = OutlineSection::new("Async Runtimes", "discuss tokio and async-std", 0);
        let findings = vec![
            Finding::new("f1", "Tokio is a popular runtime", "doc_1", 0.9, 1),
            Finding::new("f2", "Completely unrelated topic about cooking", "doc_2", 0.9, 1),
        ];
        let selected = select_relevant_findings(&section, &findings);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "f1");
    }

    #[test]
    fn tokenize_drops_short_words_and_stopwords() {
        let tokens = tokenize("the Tokio and async runtime");
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("and"));
        assert!(tokens.contains("tokio"));
        assert!(tokens.contains("runtime"));
    }

    #[test]
    fn assemble_report_orders_sections_and_headers() {
        let outline = ReportOutline::new("Title", vec![]);
        let sections = vec![
            ReportSection::new("B", "content b", 1),
            ReportSection::new("A", "content a", 0),
        ];
        let body = assemble_report(&outline, &sections);
        let a_pos = body.find("## A").unwrap();
        let b_pos = body.find("## B").unwrap();
        assert!(a_pos < b_pos);
    }
}
