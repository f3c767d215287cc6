use scraper::{ElementRef, Html, Selector};

use super::types::{ExtractedContent, ExtractedTable, TextBlock};
use super::ExtractionError;

/// Leaf block elements that always become text blocks.
const BLOCK_CSS: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre";
/// Containers that become blocks only when they hold no block children.
const CONTAINER_CSS: &str = "div, section, article";
const NESTED_BLOCK_CSS: &str = "h1, h2, h3, h4, h5, h6, p, li, blockquote, pre, div, section, article, table";

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::HtmlSelector(format!("{css}: {e:?}")))
}

/// HTML: block-level elements become text blocks, `<table>` elements
/// become tables. Without `<thead>` the first row is the header row.
pub fn extract_html(bytes: &[u8], doc_id: &str) -> Result<ExtractedContent, ExtractionError> {
    let source = String::from_utf8_lossy(bytes);
    let document = Html::parse_document(&source);

    let block_sel = selector(&format!("{BLOCK_CSS}, {CONTAINER_CSS}"))?;
    let nested_sel = selector(NESTED_BLOCK_CSS)?;
    let table_sel = selector("table")?;

    let mut content = ExtractedContent::default();

    for element in document.select(&block_sel) {
        if inside(element, &["table", "script", "style", "noscript"]) {
            continue;
        }
        let is_container = matches!(element.value().name(), "div" | "section" | "article");
        if is_container && element.select(&nested_sel).next().is_some() {
            continue;
        }
        // A <p> inside an <li> is reported once, by the <li>
        if !is_container && inside(element, &["li", "blockquote"]) {
            continue;
        }
        let text = visible_text(element);
        if text.is_empty() {
            continue;
        }
        let index = content.text_blocks.len();
        content.text_blocks.push(TextBlock::new(doc_id, None, index, text));
    }

    for element in document.select(&table_sel) {
        if inside(element, &["table"]) {
            continue;
        }
        let index = content.tables.len();
        if let Some(table) = parse_table(element, doc_id, index)? {
            content.tables.push(table);
        }
    }

    let mut raw_text = content
        .text_blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    for table in &content.tables {
        if !raw_text.is_empty() {
            raw_text.push_str("\n\n");
        }
        raw_text.push_str(table.to_text().trim_end());
    }
    content.raw_text = raw_text;

    Ok(content)
}

fn parse_table(
    table: ElementRef<'_>,
    doc_id: &str,
    index: usize,
) -> Result<Option<ExtractedTable>, ExtractionError> {
    let row_sel = selector("tr")?;
    let cell_sel = selector("td, th")?;
    let head_row_sel = selector("thead tr")?;
    let caption_sel = selector("caption")?;

    let cells_of = |row: ElementRef<'_>| -> Vec<String> {
        row.select(&cell_sel).map(visible_text).collect()
    };

    let head = table.select(&head_row_sel).next().map(cells_of);
    let body: Vec<Vec<String>> = table
        .select(&row_sel)
        .filter(|row| !inside(*row, &["thead"]))
        .map(cells_of)
        .filter(|cells| !cells.is_empty())
        .collect();

    let grid = match head {
        Some(headers) => std::iter::once(headers).chain(body).collect(),
        None => body,
    };

    let mut table_out = match ExtractedTable::from_grid(doc_id, index, grid) {
        Some(t) => t,
        None => return Ok(None),
    };
    table_out.title = table
        .select(&caption_sel)
        .next()
        .map(visible_text)
        .filter(|c| !c.is_empty());
    Ok(Some(table_out))
}

/// Whether any ancestor element has one of the given tag names.
fn inside(element: ElementRef<'_>, tags: &[&str]) -> bool {
    element.ancestors().any(|node| {
        node.value()
            .as_element()
            .map(|e| tags.contains(&e.name()))
            .unwrap_or(false)
    })
}

/// Element text without script/style content, whitespace collapsed.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Some(text) = node.value().as_text() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
                    .unwrap_or(false)
            });
            if !hidden {
                out.push_str(text);
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
