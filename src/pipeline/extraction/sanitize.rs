/// Normalize extracted text before it is split into blocks.
/// Strips control characters (keeping newlines and tabs), unifies line
/// endings, maps non-breaking spaces and trims trailing whitespace per line.
/// Blank lines are kept: paragraph splitting depends on them.
pub fn sanitize_extracted_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .map(|c| match c {
            '\u{00A0}' | '\u{2007}' | '\u{202F}' => ' ',
            _ => c,
        })
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .filter(|c| !matches!(c, '\u{feff}' | '\u{200b}'))
        .collect::<String>()
        .lines()
        .map(|l| l.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}

/// Split text into paragraphs on blank lines, keeping 1-based line ranges.
pub fn split_paragraphs(text: &str) -> Vec<(String, u32, u32)> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut start = 0u32;

    for (i, line) in text.lines().enumerate() {
        let line_no = i as u32 + 1;
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push((current.join("\n"), start, line_no - 1));
                current.clear();
            }
            continue;
        }
        if current.is_empty() {
            start = line_no;
        }
        current.push(line.trim());
    }

    if !current.is_empty() {
        let end = start + current.len() as u32 - 1;
        paragraphs.push((current.join("\n"), start, end));
    }

    paragraphs
}
