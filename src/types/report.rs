//! Report structure: outline, sections and citations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planned section of the final report, before its body is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineSection {
    pub title: String,
    pub purpose: String,
    pub key_points: Vec<String>,
    pub order: usize,
}

impl OutlineSection {
    pub fn new(title: impl Into<String>, purpose: impl Into<String>, order: usize) -> Self {
        Self {
            title: title.into(),
            purpose: purpose.into(),
            key_points: Vec::new(),
            order,
        }
    }

    pub fn with_key_points(mut self, key_points: Vec<String>) -> Self {
        self.key_points = key_points;
        self
    }
}

/// The planned structure of the report, produced before section writing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutline {
    pub title: String,
    pub sections: Vec<OutlineSection>,
}

impl ReportOutline {
    pub fn new(title: impl Into<String>, sections: Vec<OutlineSection>) -> Self {
        Self {
            title: title.into(),
            sections,
        }
    }

    /// Deterministic fallback outline used when outline generation fails:
    /// Summary (optional), Overview, Key Findings (seeded
    /// with the top five finding claims), Analysis, Conclusion (optional),
    /// Limitations (optional).
    pub fn default_outline(query: &str, top_finding_claims: &[String]) -> Self {
        let mut sections = Vec::new();
        let mut order = 0;

        sections.push(OutlineSection::new(
            "Overview",
            format!("Introduce the research question: {query}"),
            order,
        ));
        order += 1;

        let key_points: Vec<String> = top_finding_claims.iter().take(5).cloned().collect();
        sections.push(
            OutlineSection::new("Key Findings", "Summarize the strongest findings gathered", order)
                .with_key_points(key_points),
        );
        order += 1;

        sections.push(OutlineSection::new(
            "Analysis",
            "Analyze and contextualize the gathered evidence",
            order,
        ));
        order += 1;

        sections.push(OutlineSection::new(
            "Conclusion",
            "Summarize conclusions drawn from the research",
            order,
        ));
        order += 1;

        sections.push(OutlineSection::new(
            "Limitations",
            "Note gaps, caveats and limitations of this research",
            order,
        ));

        Self::new(format!("Research Report: {query}"), sections)
    }
}

/// One written section of the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSection {
    pub title: String,
    pub content: String,
    pub order: usize,
    pub related_finding_ids: Vec<String>,
}

impl ReportSection {
    pub fn new(title: impl Into<String>, content: impl Into<String>, order: usize) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            order,
            related_finding_ids: Vec::new(),
        }
    }

    pub fn with_related_findings(mut self, ids: Vec<String>) -> Self {
        self.related_finding_ids = ids;
        self
    }

    /// Placeholder body used when a single section's LLM call fails, so
    /// the pipeline still completes.
    pub fn placeholder(title: impl Into<String>, order: usize) -> Self {
        let title = title.into();
        let content = format!("[section generation failed: {title}]");
        Self::new(title, content, order)
    }
}

/// How inline citation tokens are rendered in report content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CitationStyle {
    Numbered,
    AuthorYear,
    InlineUrl,
    Footnote,
}

/// A numbered reference binding a report location to a `SourceDocument`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub number: u32,
    pub source_id: String,
    pub url: String,
    pub title: String,
    pub author: Option<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub accessed_at: DateTime<Utc>,
}

impl Citation {
    pub fn new(number: u32, source_id: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            number,
            source_id: source_id.into(),
            url: url.into(),
            title: title.into(),
            author: None,
            published_date: None,
            accessed_at: Utc::now(),
        }
    }

    pub fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn with_published_date(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.published_date = date;
        self
    }

    /// Render the inline citation token per the configured style.
    pub fn render(&self, style: CitationStyle) -> String {
        match style {
            CitationStyle::Numbered | CitationStyle::Footnote => format!("[{}]", self.number),
            CitationStyle::AuthorYear => {
                let author = self.author.clone().unwrap_or_else(|| "Unknown".to_string());
                let year = self
                    .published_date
                    .map(|d| d.format("%Y").to_string())
                    .unwrap_or_else(|| Utc::now().format("%Y").to_string());
                format!("({author}, {year})")
            }
            CitationStyle::InlineUrl => format!("([{}]({}))", self.title, self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_outline_has_five_sections_in_order() {
        let outline = ReportOutline::default_outline("hello world", &[]);
        let titles: Vec<&str> = outline.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Overview", "Key Findings", "Analysis", "Conclusion", "Limitations"]
        );
        for (i, section) in outline.sections.iter().enumerate() {
            assert_eq!(section.order, i);
        }
    }

    #[test]
    fn default_outline_seeds_key_findings_with_top_five_claims() {
        let claims: Vec<String> = (0..8).map(|i| format!("claim {i}")).collect();
        let outline = ReportOutline::default_outline("q", &claims);
        let key_findings = &outline.sections[1];
        assert_eq!(key_findings.key_points.len(), 5);
        assert_eq!(key_findings.key_points[0], "claim 0");
    }

    #[test]
    fn placeholder_section_marks_failure_in_content() {
        let section = ReportSection::placeholder("Key Findings", 1);
        assert!(section.content.contains("Key Findings"));
        assert!(section.content.starts_with("[section generation failed"));
    }

    #[test]
    fn citation_render_numbered() {
        let citation = Citation::new(3, "doc_1", "https://a.com", "Title");
        assert_eq!(citation.render(CitationStyle::Numbered), "[3]");
        assert_eq!(citation.render(CitationStyle::Footnote), "[3]");
    }

    #[test]
    fn citation_render_author_year_defaults_unknown() {
        let citation = Citation::new(1, "doc_1", "https://a.com", "Title");
        let rendered = citation.render(CitationStyle::AuthorYear);
        assert!(rendered.starts_with("(Unknown, "));
    }

    #[test]
    fn citation_render_inline_url() {
        let citation = Citation::new(1, "doc_1", "https://a.com", "Title");
        assert_eq!(citation.render(CitationStyle::InlineUrl), "([Title](https://a.com))");
    }
}
