use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::sections::{detect_sections, DocumentSection};

/// Each cleaning step can be switched off independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningOptions {
    pub remove_page_numbers: bool,
    pub remove_headers_footers: bool,
    pub merge_hyphenation: bool,
    pub remove_duplicate_lines: bool,
    pub normalize_whitespace: bool,
    pub detect_sections: bool,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            remove_page_numbers: true,
            remove_headers_footers: true,
            merge_hyphenation: true,
            remove_duplicate_lines: true,
            normalize_whitespace: true,
            detect_sections: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningStatistics {
    pub original_length: usize,
    pub cleaned_length: usize,
    pub removed_page_numbers: usize,
    pub removed_header_footer_lines: usize,
    pub merged_hyphenations: usize,
    pub removed_duplicate_lines: usize,
    pub sections: usize,
    pub table_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedDocument {
    pub cleaned_text: String,
    pub sections: Vec<DocumentSection>,
    pub statistics: CleaningStatistics,
}

/// Repeated lines shorter or longer than this are never treated as boilerplate.
const BOILERPLATE_MIN_CHARS: usize = 5;
const BOILERPLATE_MAX_CHARS: usize = 200;
const BOILERPLATE_MIN_REPEATS: usize = 3;
/// Leading indentation at least this wide survives as a 4-space marker.
const TABLE_INDENT: usize = 10;

static PAGE_NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^sayfa\s+\d+\s*$",
        r"(?i)^sayfa:\s*\d+\s*$",
        r"(?i)^page\s+\d+\s*$",
        r"(?i)^page:\s*\d+\s*$",
        r"^\s*\d+\s*/\s*\d+\s*$",
        r"^\s*\d{1,3}\s*$",
        r"^[-\s]*\d+[-\s]*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static HYPHEN_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)-[ \t]*\n[ \t]*(\w+)").unwrap());
static SPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Run the cleaning pipeline over one document's text.
pub fn clean_text(raw: &str, options: &CleaningOptions) -> CleanedDocument {
    let mut stats = CleaningStatistics {
        original_length: raw.chars().count(),
        ..Default::default()
    };
    let mut text = raw.replace("\r\n", "\n");

    if options.remove_page_numbers {
        let (cleaned, removed) = remove_page_numbers(&text);
        text = cleaned;
        stats.removed_page_numbers = removed;
    }
    if options.remove_headers_footers {
        let (cleaned, removed) = remove_headers_footers(&text);
        text = cleaned;
        stats.removed_header_footer_lines = removed;
    }
    if options.merge_hyphenation {
        let (cleaned, merged) = merge_hyphenation(&text);
        text = cleaned;
        stats.merged_hyphenations = merged;
    }
    if options.remove_duplicate_lines {
        let (cleaned, removed) = remove_duplicate_lines(&text);
        text = cleaned;
        stats.removed_duplicate_lines = removed;
    }
    if options.normalize_whitespace {
        text = normalize_whitespace(&text);
    }

    let sections = if options.detect_sections {
        detect_sections(&text)
    } else {
        Vec::new()
    };

    stats.cleaned_length = text.chars().count();
    stats.sections = sections.len();
    stats.table_lines = count_table_lines(&text);

    tracing::debug!(
        original = stats.original_length,
        cleaned = stats.cleaned_length,
        sections = stats.sections,
        "Text cleaned"
    );

    CleanedDocument {
        cleaned_text: text,
        sections,
        statistics: stats,
    }
}

fn is_page_number_line(line: &str) -> bool {
    PAGE_NUMBER_PATTERNS.iter().any(|p| p.is_match(line))
}

/// Page-number lines are blanked rather than dropped so paragraph breaks survive.
fn remove_page_numbers(text: &str) -> (String, usize) {
    let mut removed = 0;
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| {
            if is_page_number_line(line) {
                removed += 1;
                ""
            } else {
                line
            }
        })
        .collect();
    (lines.join("\n"), removed)
}

fn remove_headers_footers(text: &str) -> (String, usize) {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for line in text.split('\n') {
        let trimmed = line.trim();
        let len = trimmed.chars().count();
        if len > BOILERPLATE_MIN_CHARS && len < BOILERPLATE_MAX_CHARS {
            *frequency.entry(trimmed).or_default() += 1;
        }
    }

    let mut removed = 0;
    let kept: Vec<&str> = text
        .split('\n')
        .filter(|line| {
            let repeated = frequency
                .get(line.trim())
                .is_some_and(|&count| count >= BOILERPLATE_MIN_REPEATS);
            if repeated {
                removed += 1;
            }
            !repeated
        })
        .collect();
    (kept.join("\n"), removed)
}

fn merge_hyphenation(text: &str) -> (String, usize) {
    let merged = HYPHEN_BREAK.find_iter(text).count();
    if merged == 0 {
        return (text.to_string(), 0);
    }
    (HYPHEN_BREAK.replace_all(text, "$1$2").into_owned(), merged)
}

/// Consecutive repeats (compared trimmed) are dropped; blank lines never are.
fn remove_duplicate_lines(text: &str) -> (String, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut previous = "";
    let mut removed = 0;
    for line in text.split('\n') {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed != previous {
            kept.push(line);
            previous = trimmed;
        } else {
            removed += 1;
        }
    }
    (kept.join("\n"), removed)
}

fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let line = line.trim_end();
            let body = line.trim_start_matches(' ');
            let indent = line.len() - body.len();
            let body = SPACE_RUN.replace_all(body, " ");
            if indent >= TABLE_INDENT && !body.is_empty() {
                format!("    {body}")
            } else {
                body.into_owned()
            }
        })
        .collect();
    let joined = lines.join("\n");
    BLANK_RUN
        .replace_all(&joined, "\n\n")
        .trim_matches('\n')
        .to_string()
}

/// Lines that look like flattened table rows.
pub fn count_table_lines(text: &str) -> usize {
    text.lines()
        .filter(|l| l.matches('|').count() >= 3 || l.matches('\t').count() >= 3)
        .count()
}
