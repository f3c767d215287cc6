//! XLSX: one table per worksheet, first row as headers. The same data is
//! mirrored into raw text as `Table: <sheet>` followed by tab-joined rows.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ooxml::{
    attr, entity_text, open_container, read_part, require_part, text_content, Container,
};
use super::types::{ExtractedContent, ExtractedTable};
use super::ExtractionError;

#[derive(Debug, Clone, PartialEq)]
struct SheetRef {
    name: String,
    path: String,
}

pub fn extract_xlsx(bytes: &[u8], doc_id: &str) -> Result<ExtractedContent, ExtractionError> {
    let mut container = open_container(bytes)?;
    let sheets = list_sheets(&mut container)?;
    let shared = match read_part(&mut container, "xl/sharedStrings.xml")? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let mut content = ExtractedContent::default();
    for sheet in sheets {
        let xml = match read_part(&mut container, &sheet.path)? {
            Some(xml) => xml,
            None => {
                content
                    .warnings
                    .push(format!("Çalışma sayfası bulunamadı: {}", sheet.name));
                continue;
            }
        };
        let grid = parse_sheet(&xml, &shared)?;
        let index = content.tables.len();
        if let Some(mut table) = ExtractedTable::from_grid(doc_id, index, grid) {
            table.title = Some(sheet.name.clone());
            content.raw_text.push_str(&table.to_text());
            content.raw_text.push('\n');
            content.tables.push(table);
        }
    }
    content.raw_text = content.raw_text.trim_end().to_string();

    tracing::debug!(doc_id, sheets = content.tables.len(), "XLSX sheets extracted");
    Ok(content)
}

/// Sheet names and part paths, in workbook order.
fn list_sheets(container: &mut Container<'_>) -> Result<Vec<SheetRef>, ExtractionError> {
    let workbook = require_part(container, "xl/workbook.xml")?;
    let rels = read_part(container, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
    let targets = parse_relationships(&rels)?;

    let mut reader = Reader::from_str(&workbook);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name").unwrap_or_else(|| format!("Sheet{}", sheets.len() + 1));
                let path = attr(&e, b"r:id")
                    .and_then(|id| targets.iter().find(|(rid, _)| *rid == id).map(|(_, t)| t.clone()))
                    .map(|target| resolve_target(&target))
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", sheets.len() + 1));
                sheets.push(SheetRef { name, path });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_relationships(xml: &str) -> Result<Vec<(String, String)>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(&e, b"Id"), attr(&e, b"Target")) {
                    out.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_item = true;
                    current.clear();
                }
                b"t" if in_item => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_item = false;
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&text_content(&t)),
            Event::GeneralRef(r) if in_text => current.push_str(&entity_text(&r)),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Cell kinds by the `t` attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    Shared,
    Inline,
    Boolean,
    Other,
}

fn cell_kind(e: &BytesStart<'_>) -> CellKind {
    match attr(e, b"t").as_deref() {
        Some("s") => CellKind::Shared,
        Some("inlineStr") => CellKind::Inline,
        Some("b") => CellKind::Boolean,
        _ => CellKind::Other,
    }
}

/// Widest sheet Excel allows (`XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column from a cell reference like `C12`. `Ok(None)` when the
/// reference carries no column letters.
fn column_index(reference: &str) -> Result<Option<usize>, ExtractionError> {
    let letters: String = reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let beyond = || ExtractionError::XmlParsing(format!("cell reference {reference} is beyond column XFD"));

    let mut index = 0usize;
    for c in letters.chars() {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        index = index
            .checked_mul(26)
            .and_then(|i| i.checked_add(digit))
            .filter(|i| *i <= MAX_COLUMNS)
            .ok_or_else(beyond)?;
    }
    Ok(Some(index - 1))
}

fn parse_sheet(xml: &str, shared: &[String]) -> Result<Vec<Vec<String>>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut grid: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut column = 0usize;
    let mut kind = CellKind::Other;
    let mut value = String::new();
    let mut capture = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Vec::new(),
                b"c" => {
                    column = match attr(&e, b"r") {
                        Some(r) => column_index(&r)?.unwrap_or(row.len()),
                        None => row.len(),
                    };
                    kind = cell_kind(&e);
                    value.clear();
                }
                b"v" | b"t" => capture = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    let text = match kind {
                        CellKind::Shared => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        CellKind::Boolean if value.trim() == "1" => "TRUE".to_string(),
                        CellKind::Boolean => "FALSE".to_string(),
                        CellKind::Inline | CellKind::Other => value.clone(),
                    };
                    if row.len() <= column {
                        row.resize(column + 1, String::new());
                    }
                    row[column] = text.trim().to_string();
                }
                b"row" => grid.push(std::mem::take(&mut row)),
                _ => {}
            },
            Event::Text(t) if capture => value.push_str(&text_content(&t)),
            Event::GeneralRef(r) if capture => value.push_str(&entity_text(&r)),
            Event::Eof => break,
            _ => {}
        }
    }

    // Ragged rows are padded to the widest row
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, String::new());
    }
    Ok(grid)
}
