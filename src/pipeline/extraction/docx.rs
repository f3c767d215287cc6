use quick_xml::events::Event;
use quick_xml::Reader;

use super::ooxml::{entity_text, open_container, require_part, text_content};
use super::types::{ExtractedContent, ExtractedTable, TextBlock};
use super::ExtractionError;

/// Parsed body of `word/document.xml`.
#[derive(Debug, Default)]
struct DocxBody {
    paragraphs: Vec<String>,
    tables: Vec<Vec<Vec<String>>>,
}

/// DOCX: one block per top-level paragraph, one table per `w:tbl`.
pub fn extract_docx(bytes: &[u8], doc_id: &str) -> Result<ExtractedContent, ExtractionError> {
    let mut container = open_container(bytes)?;
    let xml = require_part(&mut container, "word/document.xml")?;
    let body = parse_document_xml(&xml)?;

    let text_blocks: Vec<TextBlock> = body
        .paragraphs
        .iter()
        .enumerate()
        .map(|(i, p)| TextBlock::new(doc_id, None, i, p.clone()))
        .collect();

    let tables: Vec<ExtractedTable> = body
        .tables
        .into_iter()
        .filter_map(|grid| grid_to_table(doc_id, grid))
        .enumerate()
        .map(|(i, mut table)| {
            table.table_id = format!("T{}", i + 1);
            table
        })
        .collect();

    let mut raw_text = body.paragraphs.join("\n\n");
    for table in &tables {
        raw_text.push_str("\n\n");
        raw_text.push_str(table.to_text().trim_end());
    }

    Ok(ExtractedContent {
        text_blocks,
        tables,
        raw_text,
        warnings: vec![],
    })
}

fn grid_to_table(doc_id: &str, grid: Vec<Vec<String>>) -> Option<ExtractedTable> {
    ExtractedTable::from_grid(doc_id, 0, grid)
}

fn parse_document_xml(xml: &str) -> Result<DocxBody, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut body = DocxBody::default();
    let mut table_depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut cell = String::new();
    let mut row: Vec<String> = Vec::new();
    let mut grid: Vec<Vec<String>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        grid = Vec::new();
                    }
                }
                b"tr" if table_depth == 1 => row = Vec::new(),
                b"tc" if table_depth == 1 => cell = String::new(),
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"tbl" => {
                    if table_depth == 1 {
                        body.tables.push(std::mem::take(&mut grid));
                    }
                    table_depth = table_depth.saturating_sub(1);
                }
                b"tr" if table_depth == 1 => grid.push(std::mem::take(&mut row)),
                b"tc" if table_depth == 1 => row.push(cell.trim().to_string()),
                b"p" => {
                    let text = paragraph.trim();
                    if table_depth == 0 {
                        if !text.is_empty() {
                            body.paragraphs.push(text.to_string());
                        }
                    } else if !text.is_empty() {
                        if !cell.is_empty() {
                            cell.push(' ');
                        }
                        cell.push_str(text);
                    }
                    paragraph.clear();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => paragraph.push_str(&text_content(&t)),
            Event::GeneralRef(r) if in_text => paragraph.push_str(&entity_text(&r)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::super::ooxml::test_support::make_container;
    use super::*;

    const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>TEKNİK ŞARTNAME</w:t></w:r></w:p>
    <w:p><w:r><w:t xml:space="preserve">Yemek hizmeti </w:t></w:r><w:r><w:t>alımı &amp; dağıtımı</w:t></w:r></w:p>
    <w:p/>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>Yemek</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Gramaj</w:t></w:r></w:p></w:tc></w:tr>
      <w:tr><w:tc><w:p><w:r><w:t>Pilav</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>80</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
    <w:p><w:r><w:t>Son</w:t></w:r><w:r><w:tab/><w:t>paragraf</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn paragraphs_become_blocks() {
        let bytes = make_container(&[("word/document.xml", DOCUMENT_XML)]);
        let content = extract_docx(&bytes, "B").unwrap();
        let texts: Vec<&str> = content.text_blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["TEKNİK ŞARTNAME", "Yemek hizmeti alımı & dağıtımı", "Son\tparagraf"]
        );
        assert_eq!(content.text_blocks[1].block_id, "B:0.1");
        assert!(content.text_blocks.iter().all(|b| b.page.is_none()));
    }

    #[test]
    fn tables_extracted_with_header_row() {
        let bytes = make_container(&[("word/document.xml", DOCUMENT_XML)]);
        let content = extract_docx(&bytes, "B").unwrap();
        assert_eq!(content.tables.len(), 1);
        let table = &content.tables[0];
        assert_eq!(table.table_id, "T1");
        assert_eq!(table.headers, vec!["Yemek", "Gramaj"]);
        assert_eq!(table.rows, vec![vec!["Pilav".to_string(), "80".to_string()]]);
        assert!(content.raw_text.contains("Pilav\t80"));
        assert!(content.raw_text.starts_with("TEKNİK ŞARTNAME\n\n"));
    }

    #[test]
    fn missing_document_part_is_error() {
        let bytes = make_container(&[("word/styles.xml", "<w:styles/>")]);
        assert!(matches!(
            extract_docx(&bytes, "B"),
            Err(ExtractionError::MissingPart(_))
        ));
    }
}
