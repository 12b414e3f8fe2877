//! Pure HTML-to-text transformation: metadata extraction, tag stripping,
//! truncation and link/image collection.
//!
//! Builds its cleaning pipeline out of a sequence of inline
//! `regex::Regex::new` patterns applied in order, extended here to also
//! extract title/description/author/date metadata.

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::content::ExtractedContent;

/// Options controlling one `Process` call.
#[derive(Debug, Clone)]
pub struct ContentProcessorOptions {
    pub max_content_length: usize,
    pub extract_metadata: bool,
    pub extract_links: bool,
    pub extract_images: bool,
}

impl Default for ContentProcessorOptions {
    fn default() -> Self {
        Self {
            max_content_length: 5000,
            extract_metadata: true,
            extract_links: true,
            extract_images: true,
        }
    }
}

const MAX_LINKS: usize = 100;
const MAX_IMAGES: usize = 50;

/// Pure HTML-to-text transformation; implements `Process(html, baseUri, options)`.
pub struct ContentProcessor;

impl ContentProcessor {
    /// Errors are caught internally; this always returns a well-formed
    /// `ExtractedContent`; errors never propagate out of this stage.
    pub fn process(html: &str, url: &str, options: &ContentProcessorOptions) -> ExtractedContent {
        let title = extract_title(html);
        let description = extract_description(html);

        let (author, published_date) = if options.extract_metadata {
            (extract_author(html), extract_published_date(html))
        } else {
            (None, None)
        };

        let cleaned = clean_main_content(html, options.max_content_length);

        let mut content = ExtractedContent::success(url, cleaned);
        if let Some(title) = title {
            content = content.with_title(decode_entities(&title));
        }
        if let Some(description) = description {
            content = content.with_description(decode_entities(&description));
        }
        if let Some(author) = author {
            content = content.with_author(decode_entities(&author));
        }
        if let Some(date) = published_date {
            content = content.with_published_date(date);
        }

        if options.extract_links {
            content = content.with_links(extract_absolute_urls(
                r#"(?is)<a[^>]+href=["']([^"']+)["']"#,
                html,
                MAX_LINKS,
            ));
        }
        if options.extract_images {
            content = content.with_images(extract_absolute_urls(
                r#"(?is)<img[^>]+src=["']([^"']+)["']"#,
                html,
                MAX_IMAGES,
            ));
        }

        content
    }
}

fn first_capture(pattern: &str, html: &str) -> Option<String> {
    let regex = Regex::new(pattern).expect("static regex pattern is valid");
    regex.captures(html).and_then(|c| c.get(1)).map(|m| m.as_str().trim().to_string())
}

fn extract_title(html: &str) -> Option<String> {
    first_capture(r"(?is)<title[^>]*>(.*?)</title>", html)
        .or_else(|| first_capture(r#"(?is)<meta[^>]+property=["']og:title["'][^>]+content=["']([^"']*)["']"#, html))
}

fn extract_description(html: &str) -> Option<String> {
    first_capture(r#"(?is)<meta[^>]+name=["']description["'][^>]+content=["']([^"']*)["']"#, html)
        .or_else(|| first_capture(r#"(?is)<meta[^>]+property=["']og:description["'][^>]+content=["']([^"']*)["']"#, html))
}

fn extract_author(html: &str) -> Option<String> {
    first_capture(r#"(?is)<meta[^>]+name=["']author["'][^>]+content=["']([^"']*)["']"#, html)
        .or_else(|| first_capture(r#"(?is)<meta[^>]+property=["']article:author["'][^>]+content=["']([^"']*)["']"#, html))
}

fn extract_published_date(html: &str) -> Option<DateTime<Utc>> {
    first_capture(
        r#"(?is)<meta[^>]+property=["']article:published_time["'][^>]+content=["']([^"']*)["']"#,
        html,
    )
    .or_else(|| first_capture(r#"(?is)"datePublished"\s*:\s*"([^"]+)""#, html))
    .and_then(|s| parse_date(&s))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|d| d.with_timezone(&Utc))
}

fn extract_absolute_urls(pattern: &str, html: &str, cap: usize) -> Vec<String> {
    let regex = Regex::new(pattern).expect("static regex pattern is valid");
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for captures in regex.captures_iter(html) {
        if out.len() >= cap {
            break;
        }
        if let Some(m) = captures.get(1) {
            let url = m.as_str();
            if (url.starts_with("http://") || url.starts_with("https://")) && seen.insert(url.to_string()) {
                out.push(url.to_string());
            }
        }
    }
    out
}

/// Strip non-content tags, remaining markup, decode entities, collapse
/// whitespace, trim, then truncate per the sentence-aware policy.
fn clean_main_content(html: &str, max_content_length: usize) -> String {
    let script_pattern = Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap();
    let style_pattern = Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap();
    let comment_pattern = Regex::new(r"(?s)<!--.*?-->").unwrap();
    let nav_pattern = Regex::new(r"(?is)<nav[^>]*>.*?</nav>").unwrap();
    let header_pattern = Regex::new(r"(?is)<header[^>]*>.*?</header>").unwrap();
    let footer_pattern = Regex::new(r"(?is)<footer[^>]*>.*?</footer>").unwrap();
    let aside_pattern = Regex::new(r"(?is)<aside[^>]*>.*?</aside>").unwrap();
    let any_tag_pattern = Regex::new(r"(?s)<[^>]+>").unwrap();
    let whitespace_pattern = Regex::new(r"\s+").unwrap();

    let mut text = html.to_string();
    text = script_pattern.replace_all(&text, "").to_string();
    text = style_pattern.replace_all(&text, "").to_string();
    text = comment_pattern.replace_all(&text, "").to_string();
    text = nav_pattern.replace_all(&text, "").to_string();
    text = header_pattern.replace_all(&text, "").to_string();
    text = footer_pattern.replace_all(&text, "").to_string();
    text = aside_pattern.replace_all(&text, "").to_string();
    text = any_tag_pattern.replace_all(&text, " ").to_string();
    text = decode_entities(&text);
    text = whitespace_pattern.replace_all(&text, " ").trim().to_string();

    truncate_at_sentence_boundary(&text, max_content_length)
}

/// Truncation policy: if the last sentence-terminator within the truncated
/// region occurs past 70% of the limit, cut there; else hard-cut.
fn truncate_at_sentence_boundary(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_len).collect();
    let min_cut = (max_len as f64 * 0.7) as usize;

    let last_terminator = truncated
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | '!' | '?' | '\n'))
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&byte_idx| truncated[..byte_idx].chars().count() >= min_cut)
        .last();

    match last_terminator {
        Some(byte_idx) => truncated[..byte_idx].to_string(),
        None => truncated,
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_and_tags() {
        let html = "<html><head><style>.a{}</style></head><body><script>alert(1)</script><p>Hello <b>World</b></p></body></html>";
        let result = ContentProcessor::process(html, "https://a.com", &ContentProcessorOptions::default());
        assert!(result.text.contains("Hello"));
        assert!(result.text.contains("World"));
        assert!(!result.text.contains("alert"));
        assert!(!result.text.contains(".a{}"));
    }

    #[test]
    fn extracts_title_preferring_title_tag() {
        let html = r#"<html><head><title>Page Title</title><meta property="og:title" content="OG Title"></head></html>"#;
        let result = ContentProcessor::process(html, "https://a.com", &ContentProcessorOptions::default());
        assert_eq!(result.title.as_deref(), Some("Page Title"));
    }

    #[test]
    fn extracts_og_title_when_title_tag_absent() {
        let html = r#"<html><head><meta property="og:title" content="OG Title"></head></html>"#;
        let result = ContentProcessor::process(html, "https://a.com", &ContentProcessorOptions::default());
        assert_eq!(result.title.as_deref(), Some("OG Title"));
    }

    #[test]
    fn links_are_deduplicated_and_absolute_only() {
        let html = r#"<a href="https://a.com/1">x</a><a href="https://a.com/1">dup</a><a href="/relative">y</a>"#;
        let result = ContentProcessor::process(html, "https://a.com", &ContentProcessorOptions::default());
        let links = result.links.unwrap();
        assert_eq!(links, vec!["https://a.com/1".to_string()]);
    }

    #[test]
    fn truncates_at_sentence_boundary_past_70_percent() {
        let sentence = "This is a sentence. ";
        let text = sentence.repeat(20);
        let truncated = truncate_at_sentence_boundary(&text, 100);
        assert!(truncated.len() <= 100);
        assert!(truncated.ends_with('.'));
    }

    #[test]
    fn hard_cuts_when_no_terminator_past_threshold() {
        let text = "a".repeat(200);
        let truncated = truncate_at_sentence_boundary(&text, 100);
        assert_eq!(truncated.chars().count(), 100);
    }
}
