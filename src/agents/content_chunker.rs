//! Token-aware segmentation with overlap.
//!
//! Token estimate heuristic (resolved in DESIGN.md): this component uses
//! the Korean-code-point-adjusted heuristic consistently, since it's the
//! only one of the candidate heuristics that accounts for non-Latin
//! heuristics that accounts for non-Latin scripts.

use crate::types::content::ContentChunk;

/// Options controlling chunk sizing and overlap.
#[derive(Debug, Clone)]
pub struct ChunkingOptions {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
    pub split_on_paragraphs: bool,
    pub split_on_sentences: bool,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 50,
            split_on_paragraphs: true,
            split_on_sentences: true,
        }
    }
}

const CHARS_PER_TOKEN: usize = 4;

/// Estimate token count: Korean code points (U+AC00..U+D7A3) cost 0.5
/// tokens each, other characters 0.25 each, ceiling.
pub fn estimate_tokens(text: &str) -> usize {
    let total: f64 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (0xAC00..=0xD7A3).contains(&code) {
                0.5
            } else {
                0.25
            }
        })
        .sum();
    total.ceil() as usize
}

/// Token-aware segmentation with overlap; implements `ChunkText`.
pub struct ContentChunker;

impl ContentChunker {
    pub fn chunk_text(
        text: &str,
        source_id: &str,
        source_url: &str,
        options: &ChunkingOptions,
    ) -> Vec<ContentChunk> {
        if text.is_empty() {
            return Vec::new();
        }

        let budget_chars = options.max_tokens * CHARS_PER_TOKEN;
        let overlap_chars = options.overlap_tokens * CHARS_PER_TOKEN;
        let segments = split_into_segments(text, options);

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_start = 0usize;
        let mut cursor = 0usize;

        for segment in segments {
            let segment_start = cursor;
            cursor += segment.chars().count();

            if segment.chars().count() > budget_chars {
                if !buffer.is_empty() {
                    emit_chunk(&mut chunks, &buffer, buffer_start, source_id, source_url);
                    buffer.clear();
                }
                force_split_oversize(
                    &segment,
                    segment_start,
                    budget_chars,
                    overlap_chars,
                    source_id,
                    source_url,
                    &mut chunks,
                );
                buffer_start = cursor;
                continue;
            }

            if !buffer.is_empty() && buffer.chars().count() + segment.chars().count() > budget_chars {
                emit_chunk(&mut chunks, &buffer, buffer_start, source_id, source_url);
                let overlap_tail = tail_with_word_boundary(&buffer, overlap_chars);
                buffer_start = cursor - segment.chars().count() - overlap_tail.chars().count();
                buffer = overlap_tail;
            }

            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(&segment);
        }

        if !buffer.is_empty() {
            emit_chunk(&mut chunks, &buffer, buffer_start, source_id, source_url);
        }

        let total = chunks.len();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.chunk_index = i;
            chunk.total_chunks = total;
        }

        chunks
    }
}

fn emit_chunk(chunks: &mut Vec<ContentChunk>, buffer: &str, start: usize, source_id: &str, source_url: &str) {
    let end = start + buffer.chars().count();
    let tokens = estimate_tokens(buffer);
    chunks.push(ContentChunk::new(source_id, source_url, buffer, chunks.len(), start, end, tokens));
}

/// Seed the next buffer with the tail of the just-emitted chunk whose
/// length is approximately `overlap_chars`, preserving word boundary.
fn tail_with_word_boundary(buffer: &str, overlap_chars: usize) -> String {
    if overlap_chars == 0 {
        return String::new();
    }
    let chars: Vec<char> = buffer.chars().collect();
    if chars.len() <= overlap_chars {
        return buffer.to_string();
    }
    let tail_start = chars.len() - overlap_chars;
    let tail: String = chars[tail_start..].iter().collect();
    match tail.find(' ') {
        Some(space_idx) => tail[space_idx + 1..].to_string(),
        None => tail,
    }
}

/// Force-split a single oversize segment: cut at budget, preferring a space
/// in the last 30% of the cut; subtract overlap from the advance pointer;
/// guard against a non-positive advance to avoid an infinite loop.
fn force_split_oversize(
    segment: &str,
    segment_start: usize,
    budget_chars: usize,
    overlap_chars: usize,
    source_id: &str,
    source_url: &str,
    chunks: &mut Vec<ContentChunk>,
) {
    let chars: Vec<char> = segment.chars().collect();
    let mut pos = 0usize;

    while pos < chars.len() {
        let remaining = chars.len() - pos;
        let take = remaining.min(budget_chars);
        let mut cut = take;

        if take == budget_chars {
            let search_from = (take as f64 * 0.7) as usize;
            if let Some(space_offset) = chars[pos + search_from..pos + take].iter().rposition(|&c| c == ' ') {
                cut = search_from + space_offset + 1;
            }
        }

        let piece: String = chars[pos..pos + cut].iter().collect();
        let piece_start = segment_start + pos;
        emit_chunk(chunks, piece.trim(), piece_start, source_id, source_url);

        let mut advance = cut as isize - overlap_chars as isize;
        if advance <= 0 {
            advance = cut as isize;
        }
        pos += advance as usize;
    }
}

/// Split text into segments: by paragraph (runs of blank lines) when
/// `split_on_paragraphs`, else by sentence when `split_on_sentences`, else
/// one segment.
fn split_into_segments(text: &str, options: &ChunkingOptions) -> Vec<String> {
    if options.split_on_paragraphs {
        let paragraphs: Vec<String> = text
            .split("\n\n")
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs;
        }
    }

    if options.split_on_sentences {
        return split_on_sentence_boundaries(text);
    }

    vec![text.to_string()]
}

fn split_on_sentence_boundaries(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let next_is_whitespace = chars.get(i + 1).map(|c| c.is_whitespace()).unwrap_or(true);
            if next_is_whitespace {
                sentences.push(current.trim().to_string());
                current.clear();
            }
        }
        i += 1;
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences.into_iter().filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_code_points_cost_half_a_token() {
        let korean = "가".repeat(10); // 10 Korean syllables
        assert_eq!(estimate_tokens(&korean), 5);
    }

    #[test]
    fn ascii_characters_cost_quarter_token_each() {
        assert_eq!(estimate_tokens("abcd"), 1);
    }

    #[test]
    fn chunking_respects_character_budget() {
        let text = "word ".repeat(200); // 1000 chars
        let options = ChunkingOptions {
            max_tokens: 50,
            overlap_tokens: 0,
            split_on_paragraphs: false,
            split_on_sentences: false,
        };
        let chunks = ContentChunker::chunk_text(&text, "doc_1", "https://a.com", &options);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() <= 50 * 4);
        }
        assert_eq!(chunks.last().unwrap().total_chunks, chunks.len());

        let mut last_end = 0;
        for chunk in &chunks {
            assert!(chunk.end_position >= last_end);
            last_end = chunk.end_position;
        }
    }

    #[test]
    fn chunk_indices_are_dense_and_well_formed() {
        let text = "Sentence one. Sentence two. Sentence three.".repeat(20);
        let options = ChunkingOptions {
            max_tokens: 20,
            overlap_tokens: 2,
            split_on_paragraphs: false,
            split_on_sentences: true,
        };
        let chunks = ContentChunker::chunk_text(&text, "doc_1", "https://a.com", &options);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert!(chunk.is_well_formed());
        }
    }

    #[test]
    fn oversize_segment_is_force_split_without_infinite_loop() {
        let text = "a".repeat(10_000);
        let options = ChunkingOptions {
            max_tokens: 10,
            overlap_tokens: 50, // overlap larger than budget: advance guard must kick in
            split_on_paragraphs: false,
            split_on_sentences: false,
        };
        let chunks = ContentChunker::chunk_text(&text, "doc_1", "https://a.com", &options);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn empty_text_produces_no_chunks() {
        let options = ChunkingOptions::default();
        let chunks = ContentChunker::chunk_text("", "doc_1", "https://a.com", &options);
        assert!(chunks.is_empty());
    }
}
