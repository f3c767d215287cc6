use super::sanitize::{sanitize_extracted_text, split_paragraphs};
use super::types::{ExtractedContent, ExtractedTable, TextBlock};

/// Paragraphs longer than this are split at line boundaries into
/// consecutive blocks (which the DataPool builder may merge back).
const MAX_BLOCK_CHARS: usize = 1000;

/// Decode bytes as UTF-8, falling back to Windows-1254 (Turkish ANSI).
/// Returns the text and whether the fallback was used.
pub fn decode_text(bytes: &[u8]) -> (String, bool) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        Err(_) => (bytes.iter().map(|&b| windows_1254(b)).collect(), true),
    }
}

/// Windows-1254 differs from Latin-1 in six Turkish letters (and the 0x80-0x9F range).
fn windows_1254(byte: u8) -> char {
    match byte {
        0xD0 => 'Ğ',
        0xDD => 'İ',
        0xDE => 'Ş',
        0xF0 => 'ğ',
        0xFD => 'ı',
        0xFE => 'ş',
        0x80 => '€',
        0x80..=0x9F => '\u{FFFD}',
        other => other as char,
    }
}

/// Plain text: paragraph blocks with line ranges.
pub fn extract_plain_text(bytes: &[u8], doc_id: &str) -> ExtractedContent {
    let (decoded, fallback) = decode_text(bytes);
    let raw_text = sanitize_extracted_text(&decoded);
    let mut content = ExtractedContent {
        text_blocks: paragraph_blocks(&raw_text, doc_id),
        raw_text,
        ..Default::default()
    };
    if fallback {
        content
            .warnings
            .push("Dosya UTF-8 değil, Windows-1254 kodlaması varsayıldı".into());
    }
    content
}

fn paragraph_blocks(text: &str, doc_id: &str) -> Vec<TextBlock> {
    let mut blocks = Vec::new();
    for (paragraph, start, _end) in split_paragraphs(text) {
        let mut piece = String::new();
        let mut piece_start = start;
        for (offset, line) in paragraph.lines().enumerate() {
            let line_no = start + offset as u32;
            if !piece.is_empty() && piece.chars().count() + line.chars().count() > MAX_BLOCK_CHARS {
                let index = blocks.len();
                blocks.push(
                    TextBlock::new(doc_id, None, index, std::mem::take(&mut piece))
                        .with_lines(piece_start, line_no - 1),
                );
                piece_start = line_no;
            }
            if !piece.is_empty() {
                piece.push('\n');
            }
            piece.push_str(line);
        }
        if !piece.is_empty() {
            let end = piece_start + piece.lines().count() as u32 - 1;
            let index = blocks.len();
            blocks.push(TextBlock::new(doc_id, None, index, piece).with_lines(piece_start, end));
        }
    }
    blocks
}

/// CSV: one table (first row = headers) mirrored into raw text.
/// The delimiter is whichever of `,` `;` or tab dominates the first line.
pub fn extract_csv(bytes: &[u8], doc_id: &str) -> ExtractedContent {
    let (decoded, fallback) = decode_text(bytes);
    let text = sanitize_extracted_text(&decoded);
    let first_line = text.lines().next().unwrap_or("");
    let delimiter = [',', ';', '\t']
        .into_iter()
        .max_by_key(|d| first_line.matches(*d).count())
        .unwrap_or(',');

    let grid: Vec<Vec<String>> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| split_csv_line(l, delimiter))
        .collect();

    let mut content = ExtractedContent::default();
    if let Some(table) = ExtractedTable::from_grid(doc_id, 0, grid) {
        content.raw_text = table.to_text().trim_end().to_string();
        content.tables.push(table);
    }
    if fallback {
        content
            .warnings
            .push("Dosya UTF-8 değil, Windows-1254 kodlaması varsayıldı".into());
    }
    content
}

/// Quote-aware split of one CSV line. `""` inside quotes is a literal quote.
fn split_csv_line(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

/// JSON: pretty-printed into raw text; unparseable JSON is kept verbatim.
pub fn extract_json(bytes: &[u8], doc_id: &str) -> ExtractedContent {
    let (decoded, _) = decode_text(bytes);
    let mut warnings = Vec::new();
    let pretty = match serde_json::from_str::<serde_json::Value>(&decoded) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| decoded.clone()),
        Err(e) => {
            tracing::warn!(doc_id, error = %e, "JSON parse failed, using raw text");
            warnings.push(format!("JSON ayrıştırılamadı: {e}"));
            decoded.clone()
        }
    };
    let raw_text = sanitize_extracted_text(&pretty);
    ExtractedContent {
        text_blocks: paragraph_blocks(&raw_text, doc_id),
        tables: vec![],
        raw_text,
        warnings,
    }
}
