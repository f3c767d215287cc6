use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{Chunk, ChunkKind, ChunkStatistics, ChunkedDocument, ChunkerConfig};
use crate::pipeline::cleaning::DocumentSection;
use crate::pipeline::extraction::turkish_lowercase;

/// Counts tokens for size reporting. Plug in a real tokenizer where one
/// is available; `CharEstimateTokenizer` is the fallback.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// One token per four characters, rounded up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharEstimateTokenizer;

impl Tokenizer for CharEstimateTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").unwrap());
static WIDE_GAPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{3,}.*\s{3,}").unwrap());
static TABLE_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(çizelge|tablo|table)").unwrap());

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Byte span within the text being chunked; converted to characters
/// when a chunk is built.
type Span = (usize, usize);

pub struct DocumentChunker {
    config: ChunkerConfig,
    tokenizer: Box<dyn Tokenizer>,
}

impl Default for DocumentChunker {
    fn default() -> Self {
        Self::new(ChunkerConfig::default())
    }
}

impl DocumentChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self::with_tokenizer(config, Box::new(CharEstimateTokenizer))
    }

    pub fn with_tokenizer(config: ChunkerConfig, tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { config, tokenizer }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk `text`. When `sections` (detected on this same text) are given,
    /// each section that fits becomes one chunk and larger ones are split
    /// by paragraphs; otherwise the whole text is split by paragraphs.
    pub fn chunk(&self, text: &str, sections: &[DocumentSection]) -> ChunkedDocument {
        let mut chunks = Vec::new();

        if sections.is_empty() {
            self.push_semantic(&mut chunks, text, text, 0, None);
        } else {
            for section in sections {
                let body = section.content.trim();
                if body.is_empty() {
                    continue;
                }
                if body.chars().count() <= self.config.max_chunk_size {
                    chunks.push(self.build(
                        body.to_string(),
                        (section.start, section.end),
                        section.title.clone(),
                        ChunkKind::Section,
                    ));
                } else {
                    let (from, to) = (byte_offset(text, section.start), byte_offset(text, section.end));
                    let base = text
                        .get(from..to)
                        .and_then(|slice| slice.rfind(section.content.as_str()))
                        .map(|i| from + i)
                        .unwrap_or(from);
                    self.push_semantic(&mut chunks, text, &section.content, base, section.title.clone());
                }
            }
        }

        let total = chunks.len();
        for (index, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = index;
            chunk.total = total;
        }

        let statistics = chunk_statistics(&chunks, text.chars().count());
        tracing::debug!(
            chunks = statistics.total_chunks,
            avg_size = statistics.avg_size,
            sections = sections.len(),
            "Document chunked"
        );
        ChunkedDocument { chunks, statistics }
    }

    /// Join a range of chunks back into one, recomputing its counts.
    pub fn merge(&self, chunks: &[Chunk], range: Range<usize>) -> Option<Chunk> {
        let selected = chunks.get(range)?;
        let first = selected.first()?;
        let text = selected
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR);
        let start = selected.iter().map(|c| c.start).min().unwrap_or(first.start);
        let end = selected.iter().map(|c| c.end).max().unwrap_or(first.end);
        let title = first.section_title.clone();
        let same_section = selected.iter().all(|c| c.section_title == title);

        let mut merged = self.build(
            text,
            (start, end),
            if same_section { title } else { None },
            ChunkKind::Semantic,
        );
        merged.index = first.index;
        merged.total = first.total;
        Some(merged)
    }

    /// `source` sits at byte `base` of `text`; chunk spans are reported in
    /// characters of `text`.
    fn push_semantic(
        &self,
        chunks: &mut Vec<Chunk>,
        text: &str,
        source: &str,
        base: usize,
        title: Option<String>,
    ) {
        for group in self.group_paragraphs(source) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let joined = group
                .iter()
                .map(|&(a, b)| &source[a..b])
                .collect::<Vec<_>>()
                .join(PARAGRAPH_SEPARATOR);
            let span = (char_offset(text, base + first.0), char_offset(text, base + last.1));
            chunks.push(self.build(joined, span, title.clone(), ChunkKind::Semantic));
        }
    }

    /// Accumulate paragraphs until the next one would overflow the maximum
    /// and the current group has reached the minimum. A short last
    /// paragraph is carried into the next group as overlap.
    fn group_paragraphs(&self, source: &str) -> Vec<Vec<Span>> {
        let ChunkerConfig {
            max_chunk_size: max,
            min_chunk_size: min,
            overlap_size: overlap,
        } = self.config;

        let paragraphs: Vec<Span> = paragraph_spans(source)
            .into_iter()
            .flat_map(|span| split_oversized(source, span, max))
            .collect();

        let mut groups = Vec::new();
        let mut current: Vec<Span> = Vec::new();
        let mut size = 0usize;

        for para in paragraphs {
            let para_chars = char_len(source, para);
            if !current.is_empty() && size + para_chars > max && size >= min {
                let carry = current.last().copied();
                groups.push(std::mem::take(&mut current));
                size = 0;
                if let Some(last) = carry.filter(|&span| overlap > 0 && char_len(source, span) < overlap) {
                    size = char_len(source, last) + PARAGRAPH_SEPARATOR.len();
                    current.push(last);
                }
            }
            current.push(para);
            size += para_chars + PARAGRAPH_SEPARATOR.len();
        }
        if !current.is_empty() {
            groups.push(current);
        }
        groups
    }

    fn build(&self, text: String, span: Span, section_title: Option<String>, kind: ChunkKind) -> Chunk {
        Chunk {
            index: 0,
            total: 0,
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
            token_count: self.tokenizer.count_tokens(&text),
            has_table: detect_table(&text),
            start: span.0,
            end: span.1,
            section_title,
            kind,
            text,
        }
    }
}

/// Characters before byte `byte` of `text`.
fn char_offset(text: &str, byte: usize) -> usize {
    text.get(..byte).map_or_else(|| text.chars().count(), |head| head.chars().count())
}

/// Byte position of character `index` of `text`.
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices().nth(index).map_or(text.len(), |(i, _)| i)
}

fn char_len(source: &str, span: Span) -> usize {
    source[span.0..span.1].chars().count()
}

/// Span without surrounding whitespace, or `None` if nothing is left.
fn trimmed_span(source: &str, from: usize, to: usize) -> Option<Span> {
    let slice = &source[from..to];
    let lead = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some((from + lead, from + lead + trimmed.len()))
}

fn paragraph_spans(source: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut cursor = 0;
    for separator in PARAGRAPH_BREAK.find_iter(source) {
        spans.extend(trimmed_span(source, cursor, separator.start()));
        cursor = separator.end();
    }
    spans.extend(trimmed_span(source, cursor, source.len()));
    spans
}

/// A paragraph over the maximum is split at line boundaries, and any single
/// line still over the maximum at character boundaries.
fn split_oversized(source: &str, span: Span, max: usize) -> Vec<Span> {
    let max = max.max(1);
    if char_len(source, span) <= max {
        return vec![span];
    }

    let mut pieces = Vec::new();
    let mut piece: Option<(usize, usize)> = None;
    let mut piece_chars = 0usize;
    let mut offset = span.0;

    for line in source[span.0..span.1].split('\n') {
        let line_span = (offset, offset + line.len());
        offset += line.len() + 1;
        let line_chars = line.chars().count();

        if line_chars > max {
            pieces.extend(piece.take());
            piece_chars = 0;
            pieces.extend(hard_split(source, line_span, max));
            continue;
        }
        match piece.as_mut() {
            Some(current) if piece_chars + 1 + line_chars <= max => {
                current.1 = line_span.1;
                piece_chars += 1 + line_chars;
            }
            _ => {
                pieces.extend(piece.replace(line_span));
                piece_chars = line_chars;
            }
        }
    }
    pieces.extend(piece);

    pieces
        .into_iter()
        .filter_map(|(a, b)| trimmed_span(source, a, b))
        .collect()
}

fn hard_split(source: &str, span: Span, max: usize) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = span.0;
    let mut count = 0;
    for (i, _) in source[span.0..span.1].char_indices() {
        if count == max {
            spans.push((start, span.0 + i));
            start = span.0 + i;
            count = 0;
        }
        count += 1;
    }
    if start < span.1 {
        spans.push((start, span.1));
    }
    spans
}

/// Pipes or tabs in quantity, or wide column gaps next to a table keyword.
pub fn detect_table(text: &str) -> bool {
    text.matches('|').count() >= 3
        || text.matches('\t').count() >= 3
        || (WIDE_GAPS.is_match(text) && TABLE_WORDS.is_match(text))
}

pub fn get_chunk(chunks: &[Chunk], index: usize) -> Option<&Chunk> {
    chunks.get(index)
}

/// Case-insensitive (Turkish-aware) substring search.
pub fn find_chunks_with_keyword<'a>(chunks: &'a [Chunk], keyword: &str) -> Vec<&'a Chunk> {
    let needle = turkish_lowercase(keyword.trim());
    if needle.is_empty() {
        return Vec::new();
    }
    chunks
        .iter()
        .filter(|c| turkish_lowercase(&c.text).contains(&needle))
        .collect()
}

const SUMMARY_PREVIEW_CHARS: usize = 200;

/// One-line description for logs and CLI output.
pub fn chunk_summary(chunk: &Chunk) -> String {
    let preview: String = chunk
        .text
        .chars()
        .take(SUMMARY_PREVIEW_CHARS)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    let ellipsis = if chunk.char_count > SUMMARY_PREVIEW_CHARS { "…" } else { "" };
    format!(
        "[{}/{}] {} karakter, {} token - \"{preview}{ellipsis}\"",
        chunk.index + 1,
        chunk.total,
        chunk.char_count,
        chunk.token_count
    )
}

pub fn chunk_statistics(chunks: &[Chunk], original_length: usize) -> ChunkStatistics {
    if chunks.is_empty() {
        return ChunkStatistics {
            original_length,
            ..Default::default()
        };
    }
    let sizes: Vec<usize> = chunks.iter().map(|c| c.char_count).collect();
    let overlap_total = chunks
        .windows(2)
        .map(|pair| pair[0].end.saturating_sub(pair[1].start))
        .sum();

    ChunkStatistics {
        original_length,
        total_chunks: chunks.len(),
        avg_size: sizes.iter().sum::<usize>() / sizes.len(),
        min_size: sizes.iter().copied().min().unwrap_or(0),
        max_size: sizes.iter().copied().max().unwrap_or(0),
        total_tokens: chunks.iter().map(|c| c.token_count).sum(),
        with_tables: chunks.iter().filter(|c| c.has_table).count(),
        overlap_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::cleaning::detect_sections;

    fn chunker(max: usize, min: usize, overlap: usize) -> DocumentChunker {
        DocumentChunker::new(ChunkerConfig {
            max_chunk_size: max,
            min_chunk_size: min,
            overlap_size: overlap,
        })
    }

    fn paragraphs() -> String {
        [
            "a".repeat(30),
            "b".repeat(30),
            "c".repeat(10),
            "d".repeat(30),
        ]
        .join("\n\n")
    }

    #[test]
    fn paragraphs_accumulate_with_overlap() {
        let text = paragraphs();
        let doc = chunker(50, 20, 15).chunk(&text, &[]);
        let chunks = &doc.chunks;
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.total == 3 && c.kind == ChunkKind::Semantic));
        assert_eq!((chunks[0].start, chunks[0].end), (0, 30));
        assert_eq!(chunks[1].text, format!("{}\n\n{}", "b".repeat(30), "c".repeat(10)));
        // the short "c" paragraph is carried forward
        assert!(chunks[2].text.starts_with("cccccccccc\n\nddd"));
        assert_eq!(doc.statistics.overlap_total, 10);
        assert_eq!(chunks[0].token_count, 8);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn no_overlap_when_last_paragraph_is_long() {
        let doc = chunker(50, 20, 5).chunk(&paragraphs(), &[]);
        assert_eq!(doc.statistics.overlap_total, 0);
    }

    #[test]
    fn below_minimum_keeps_growing() {
        let doc = chunker(50, 1000, 0).chunk(&paragraphs(), &[]);
        assert_eq!(doc.chunks.len(), 1);
        assert_eq!(doc.chunks[0].char_count, 30 + 30 + 10 + 30 + 6);
    }

    #[test]
    fn sections_become_chunks() {
        let text = format!(
            "İDARİ ŞARTLAR\nbirinci bölüm\nMADDE 2 Süre\n{}\n\n{}",
            "x".repeat(30),
            "y".repeat(30)
        );
        let sections = detect_sections(&text);
        let doc = chunker(40, 10, 0).chunk(&text, &sections);
        let chunks = &doc.chunks;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].kind, ChunkKind::Section);
        assert_eq!(chunks[0].text, "birinci bölüm");
        assert_eq!(chunks[0].section_title.as_deref(), Some("İDARİ ŞARTLAR"));
        for chunk in &chunks[1..] {
            assert_eq!(chunk.kind, ChunkKind::Semantic);
            assert_eq!(chunk.section_title.as_deref(), Some("MADDE 2 Süre"));
            let span: String = text.chars().skip(chunk.start).take(chunk.end - chunk.start).collect();
            assert_eq!(span, chunk.text);
        }
    }

    #[test]
    fn spans_are_character_offsets() {
        let text = "Şartnameye göre öğün sayısı üçtür.\n\nİkinci paragraf çok kısa.";
        let doc = chunker(40, 10, 0).chunk(text, &[]);
        assert_eq!(doc.chunks.len(), 2);
        for chunk in &doc.chunks {
            let span: String = text.chars().skip(chunk.start).take(chunk.end - chunk.start).collect();
            assert_eq!(span, chunk.text);
        }
        assert_eq!(doc.chunks[1].start, "Şartnameye göre öğün sayısı üçtür.\n\n".chars().count());
        assert_eq!(doc.chunks[1].end, text.chars().count());
    }

    #[test]
    fn oversized_paragraph_split_to_bound() {
        let doc = chunker(10, 0, 0).chunk(&"a".repeat(25), &[]);
        assert_eq!(doc.chunks.len(), 3);
        assert!(doc.chunks.iter().all(|c| c.char_count <= 10));
        assert_eq!(doc.statistics.max_size, 10);
        assert_eq!(doc.statistics.min_size, 5);
    }

    #[test]
    fn oversized_paragraph_splits_at_lines_first() {
        let text = format!("{}\n{}\n{}", "a".repeat(6), "b".repeat(6), "c".repeat(6));
        let doc = chunker(13, 0, 0).chunk(&text, &[]);
        let texts: Vec<&str> = doc.chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["aaaaaa\nbbbbbb", "cccccc"]);
    }

    #[test]
    fn table_detection() {
        assert!(detect_table("Ürün | Fiyat | Miktar |"));
        assert!(detect_table("a\tb\tc\td"));
        assert!(detect_table("Tablo 1   Pirinç   45"));
        assert!(!detect_table("Düz bir paragraf metni."));
    }

    #[test]
    fn keyword_search_is_turkish_case_insensitive() {
        let text = "İHALE TARİHİ 15.04.2025\n\nteslim yeri";
        let doc = chunker(30, 0, 0).chunk(text, &[]);
        let found = find_chunks_with_keyword(&doc.chunks, "ihale");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 0);
        assert!(find_chunks_with_keyword(&doc.chunks, "  ").is_empty());
        assert!(get_chunk(&doc.chunks, 5).is_none());
    }

    #[test]
    fn merge_recomputes_counts() {
        let c = chunker(50, 20, 0);
        let doc = c.chunk(&paragraphs(), &[]);
        let merged = c.merge(&doc.chunks, 0..2).unwrap();
        assert_eq!(merged.text, format!("{}\n\n{}", doc.chunks[0].text, doc.chunks[1].text));
        assert_eq!(merged.char_count, merged.text.chars().count());
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, doc.chunks[1].end);
        assert!(c.merge(&doc.chunks, 2..2).is_none());
        assert!(c.merge(&doc.chunks, 0..9).is_none());
    }

    #[test]
    fn summary_line() {
        let doc = chunker(50, 20, 0).chunk(&paragraphs(), &[]);
        let summary = chunk_summary(&doc.chunks[0]);
        assert!(summary.starts_with("[1/3] 30 karakter, 8 token"));
        assert!(!summary.contains('…'));
    }

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn pluggable_tokenizer() {
        let c = DocumentChunker::with_tokenizer(ChunkerConfig::default(), Box::new(WordTokenizer));
        let doc = c.chunk("bir iki üç", &[]);
        assert_eq!(doc.chunks[0].token_count, 3);
        assert_eq!(doc.statistics.total_tokens, 3);
    }

    #[test]
    fn empty_text_no_chunks() {
        let doc = DocumentChunker::default().chunk("  \n\n ", &[]);
        assert!(doc.chunks.is_empty());
        assert_eq!(doc.statistics.total_chunks, 0);
    }
}
