use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A titled slice of a cleaned document. `start`/`end` are character
/// offsets into the cleaned text; `start` points at the heading line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    /// `None` for text that precedes the first heading.
    pub title: Option<String>,
    pub content: String,
    pub start: usize,
    pub end: usize,
}

static HEADING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(BÖLÜM|KISIM|MADDE)\s+\d+",
        r"^[IVXLCDM]+\.\s+[A-ZĞÜŞİÖÇ\s]{3,50}$",
        r"^\d+\.\s+[A-ZĞÜŞİÖÇ\s]{3,50}$",
        r"^[A-ZĞÜŞİÖÇ\s]{3,50}:$",
        r"(?i)^(İDARİ|TEKNİK|MALİ|GENEL)\s+ŞARTLAR",
        r"(?i)^(İHALE|SÖZLEŞME|ŞARTNAME)\s+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Whether a (trimmed) line reads as a section heading.
pub fn is_heading(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && HEADING_PATTERNS.iter().any(|p| p.is_match(trimmed))
}

/// Slice text into sections at heading lines. Returns nothing when the
/// text has no headings at all.
pub fn detect_sections(text: &str) -> Vec<DocumentSection> {
    let mut sections = Vec::new();
    let mut title: Option<String> = None;
    let mut lines: Vec<&str> = Vec::new();
    let mut start = 0usize;
    let mut position = 0usize;
    let mut seen_heading = false;

    for line in text.split('\n') {
        if is_heading(line) {
            let content = lines.join("\n");
            // Preamble is kept only when it carries text
            if seen_heading || !content.trim().is_empty() {
                sections.push(DocumentSection {
                    title: title.take(),
                    content,
                    start,
                    end: position,
                });
            }
            seen_heading = true;
            title = Some(line.trim().to_string());
            lines.clear();
            start = position;
        } else {
            lines.push(line);
        }
        position += line.chars().count() + 1;
    }

    if !seen_heading {
        return Vec::new();
    }
    sections.push(DocumentSection {
        title,
        content: lines.join("\n"),
        start,
        end: text.chars().count(),
    });
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_tender_headings() {
        assert!(is_heading("İDARİ ŞARTLAR"));
        assert!(is_heading("Madde 7 - Teklif bedeli"));
        assert!(is_heading("II. GENEL HÜKÜMLER"));
        assert!(is_heading("3. İHALE KONUSU"));
        assert!(is_heading("TEKLİF MEKTUBU:"));
        assert!(!is_heading("Yemekler günlük olarak hazırlanacaktır."));
        assert!(!is_heading(""));
    }

    #[test]
    fn slices_sections_with_offsets() {
        let text = "Giriş metni\nİDARİ ŞARTLAR\nbirinci\nikinci\nMADDE 2 Süre\n365 gün";
        let sections = detect_sections(text);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].title, None);
        assert_eq!(sections[0].content, "Giriş metni");
        assert_eq!(sections[1].title.as_deref(), Some("İDARİ ŞARTLAR"));
        assert_eq!(sections[1].content, "birinci\nikinci");
        assert_eq!(sections[1].start, "Giriş metni\n".chars().count());
        assert_eq!(sections[1].end, sections[2].start);
        assert_eq!(sections[2].content, "365 gün");
        assert_eq!(sections[2].end, text.chars().count());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let text = "Şöğüçı\nİDARİ ŞARTLAR\nmetin";
        let sections = detect_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].start, 7);
        let heading: String = text.chars().skip(sections[1].start).take(5).collect();
        assert_eq!(heading, "İDARİ");
        assert_eq!(sections[1].end, text.chars().count());
    }

    #[test]
    fn no_headings_no_sections() {
        assert!(detect_sections("sadece metin\nbaşka satır").is_empty());
    }
}
