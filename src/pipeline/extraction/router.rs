//! Format extraction router: one file in, one `ExtractedDocument` out.

use chrono::Utc;

use super::classify::classify_document;
use super::docx::extract_docx;
use super::html::extract_html;
use super::pdf::{extract_page_tables, has_text_layer, LopdfExtractor};
use super::sanitize::split_paragraphs;
use super::text::{extract_csv, extract_json, extract_plain_text};
use super::types::{
    DocumentInfo, ExtractedContent, ExtractedDocument, OcrEngine, PdfExtractor, PdfPage, TextBlock,
};
use super::xlsx::extract_xlsx;
use super::ExtractionError;
use crate::pipeline::import::{content_hash, DocumentFormat, InputFile};
use crate::pipeline::types::ProcessingOptions;

/// Dispatches files to format extractors and assembles `DocumentInfo`.
pub struct DocumentExtractor {
    pdf: Box<dyn PdfExtractor>,
    ocr: Option<Box<dyn OcrEngine>>,
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new(Box::new(LopdfExtractor), None)
    }
}

impl DocumentExtractor {
    pub fn new(pdf: Box<dyn PdfExtractor>, ocr: Option<Box<dyn OcrEngine>>) -> Self {
        Self { pdf, ocr }
    }

    /// Info the pipeline can build without reading content.
    pub fn describe(&self, file: &InputFile, doc_id: &str) -> DocumentInfo {
        let guess = classify_document(&file.name, "");
        DocumentInfo {
            doc_id: doc_id.to_string(),
            name: file.name.clone(),
            type_guess: guess.doc_type,
            type_confidence: guess.confidence,
            hash: content_hash(&file.bytes),
            size: file.size(),
            mime_type: file.effective_mime(),
            format: file.format(),
            source_archive: file.source_archive.clone(),
            created_at: Utc::now(),
        }
    }

    /// Extract one file. Archives are opaque here: expansion happens
    /// before routing, so a ZIP reaching this point is a fallback input.
    pub fn extract(
        &self,
        file: &InputFile,
        doc_id: &str,
        options: &ProcessingOptions,
    ) -> Result<ExtractedDocument, ExtractionError> {
        let mut info = self.describe(file, doc_id);

        let mut content = match info.format {
            DocumentFormat::Pdf => self.extract_pdf(&file.bytes, doc_id, options)?,
            DocumentFormat::Docx => extract_docx(&file.bytes, doc_id)?,
            DocumentFormat::Xlsx => extract_xlsx(&file.bytes, doc_id)?,
            DocumentFormat::Html => extract_html(&file.bytes, doc_id)?,
            DocumentFormat::Text => extract_plain_text(&file.bytes, doc_id),
            DocumentFormat::Csv => extract_csv(&file.bytes, doc_id),
            DocumentFormat::Json => extract_json(&file.bytes, doc_id),
            DocumentFormat::Zip => ExtractedContent {
                warnings: vec![format!("Arşiv açılamadı, dosya olduğu gibi eklendi: {}", file.name)],
                ..Default::default()
            },
            DocumentFormat::Unknown => {
                return Err(ExtractionError::UnsupportedFormat(file.name.clone()));
            }
        };

        if !options.extract_tables {
            content.tables.clear();
        }

        let guess = classify_document(&file.name, &content.raw_text);
        info.type_guess = guess.doc_type;
        info.type_confidence = guess.confidence;

        tracing::info!(
            doc_id,
            format = info.format.as_str(),
            doc_type = info.type_guess.as_str(),
            blocks = content.text_blocks.len(),
            tables = content.tables.len(),
            "Document extracted"
        );

        Ok(ExtractedDocument { info, content })
    }

    fn extract_pdf(
        &self,
        bytes: &[u8],
        doc_id: &str,
        options: &ProcessingOptions,
    ) -> Result<ExtractedContent, ExtractionError> {
        let pages = self.pdf.extract_pages(bytes)?;
        let mut content = ExtractedContent::default();
        let mut page_texts = Vec::with_capacity(pages.len());
        let mut ocr_missing_warned = false;

        for mut page in pages {
            if !has_text_layer(&page) && page.items.is_empty() && options.ocr_enabled {
                match &self.ocr {
                    Some(ocr) => match ocr.recognize_page(bytes, page.page_number) {
                        Ok(items) => {
                            page.text = items
                                .iter()
                                .map(|i| i.text.as_str())
                                .collect::<Vec<_>>()
                                .join("\n");
                            page.items = items;
                        }
                        Err(e) => {
                            tracing::warn!(doc_id, page = page.page_number, error = %e, "OCR failed — continuing");
                            content
                                .warnings
                                .push(format!("Sayfa {} için OCR başarısız: {e}", page.page_number));
                        }
                    },
                    None if !ocr_missing_warned => {
                        ocr_missing_warned = true;
                        content
                            .warnings
                            .push("Metin katmanı olmayan sayfalar var; OCR motoru yapılandırılmamış".into());
                    }
                    None => {}
                }
            }

            content.text_blocks.extend(page_blocks(doc_id, &page));
            for mut table in extract_page_tables(doc_id, &page) {
                table.table_id = format!("T{}", content.tables.len() + 1);
                table.page = Some(page.page_number);
                content.tables.push(table);
            }
            page_texts.push(page.text);
        }

        content.raw_text = page_texts.join("\n\n");
        Ok(content)
    }
}

/// Positioned items become one block each (with bbox); otherwise the page
/// text is split into paragraph blocks with page-relative line ranges.
fn page_blocks(doc_id: &str, page: &PdfPage) -> Vec<TextBlock> {
    let page_no = Some(page.page_number);
    if !page.items.is_empty() {
        return page
            .items
            .iter()
            .filter(|item| !item.text.trim().is_empty())
            .enumerate()
            .map(|(i, item)| {
                let line = i as u32 + 1;
                let block = TextBlock::new(doc_id, page_no, i, item.text.trim()).with_lines(line, line);
                match item.bbox {
                    Some(bbox) => block.with_bbox(bbox),
                    None => block,
                }
            })
            .collect();
    }

    split_paragraphs(&page.text)
        .into_iter()
        .enumerate()
        .map(|(i, (text, start, end))| {
            TextBlock::new(doc_id, page_no, i, text).with_lines(start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::pdf::test_support::make_test_pdf;
    use super::super::types::{BoundingBox, DocumentType, PositionedText};
    use super::*;

    struct FixedPdf(Vec<PdfPage>);

    impl PdfExtractor for FixedPdf {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<PdfPage>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    struct StubOcr;

    impl OcrEngine for StubOcr {
        fn recognize_page(
            &self,
            _pdf_bytes: &[u8],
            _page_number: u32,
        ) -> Result<Vec<PositionedText>, ExtractionError> {
            Ok(vec![PositionedText {
                text: "Taranmış sayfa metni".into(),
                bbox: Some(BoundingBox {
                    x: 72.0,
                    y: 700.0,
                    width: 200.0,
                    height: 12.0,
                }),
            }])
        }
    }

    fn blank_page(n: u32) -> PdfPage {
        PdfPage {
            page_number: n,
            text: String::new(),
            items: vec![],
        }
    }

    #[test]
    fn pdf_pages_become_paged_blocks() {
        let file = InputFile::new(
            "idari_sartname.pdf",
            make_test_pdf(&["Ihale konusu yemek hizmeti", "Ikinci sayfa metni"]),
            None,
        );
        let doc = DocumentExtractor::default()
            .extract(&file, "A", &ProcessingOptions::default())
            .unwrap();
        assert_eq!(doc.info.type_guess, DocumentType::Idari);
        assert_eq!(doc.info.type_confidence, 0.9);
        assert_eq!(doc.info.format, DocumentFormat::Pdf);
        assert!(doc.content.text_blocks.iter().any(|b| b.page == Some(2)));
        assert!(doc.content.text_blocks[0].block_id.starts_with("A:1."));
    }

    #[test]
    fn ocr_fills_blank_pages_with_positions() {
        let extractor = DocumentExtractor::new(
            Box::new(FixedPdf(vec![blank_page(1)])),
            Some(Box::new(StubOcr)),
        );
        let options = ProcessingOptions {
            ocr_enabled: true,
            ..Default::default()
        };
        let file = InputFile::new("tarama.pdf", b"%PDF-1.4".to_vec(), None);
        let doc = extractor.extract(&file, "B", &options).unwrap();
        let block = &doc.content.text_blocks[0];
        assert_eq!(block.text, "Taranmış sayfa metni");
        assert_eq!(block.block_id, "B:1.0");
        assert!(block.bbox.is_some());
    }

    #[test]
    fn missing_ocr_engine_warns_once() {
        let extractor =
            DocumentExtractor::new(Box::new(FixedPdf(vec![blank_page(1), blank_page(2)])), None);
        let options = ProcessingOptions {
            ocr_enabled: true,
            ..Default::default()
        };
        let file = InputFile::new("tarama.pdf", b"%PDF-1.4".to_vec(), None);
        let doc = extractor.extract(&file, "B", &options).unwrap();
        assert!(doc.content.text_blocks.is_empty());
        assert_eq!(doc.content.warnings.len(), 1);
    }

    #[test]
    fn content_classification_upgrades_filename_guess() {
        let file = InputFile::new("dosya.txt", "TEKNİK ŞARTNAME\n\nMadde 1".as_bytes().to_vec(), None);
        let extractor = DocumentExtractor::default();
        assert_eq!(extractor.describe(&file, "C").type_guess, DocumentType::Bilinmeyen);
        let doc = extractor.extract(&file, "C", &ProcessingOptions::default()).unwrap();
        assert_eq!(doc.info.type_guess, DocumentType::Teknik);
        assert_eq!(doc.info.type_confidence, 0.7);
    }

    #[test]
    fn unknown_format_is_an_error() {
        let file = InputFile::new("logo.bin", vec![0, 159, 146, 150], None);
        let result = DocumentExtractor::default().extract(&file, "D", &ProcessingOptions::default());
        assert!(matches!(result, Err(ExtractionError::UnsupportedFormat(_))));
    }

    #[test]
    fn archive_is_opaque() {
        let file = InputFile::new("paket.zip", b"PK\x03\x04junk".to_vec(), None);
        let doc = DocumentExtractor::default()
            .extract(&file, "E", &ProcessingOptions::default())
            .unwrap();
        assert!(doc.content.text_blocks.is_empty());
        assert_eq!(doc.content.warnings.len(), 1);
        assert_eq!(doc.info.mime_type, "application/zip");
    }

    #[test]
    fn tables_dropped_when_disabled() {
        let file = InputFile::new("fiyat.csv", b"a,b\n1,2".to_vec(), None);
        let options = ProcessingOptions {
            extract_tables: false,
            ..Default::default()
        };
        let doc = DocumentExtractor::default().extract(&file, "F", &options).unwrap();
        assert!(doc.content.tables.is_empty());
    }

    #[test]
    fn identical_bytes_identical_hash() {
        let a = InputFile::new("a.txt", b"ayni".to_vec(), None);
        let b = InputFile::new("b.txt", b"ayni".to_vec(), None);
        let extractor = DocumentExtractor::default();
        assert_eq!(extractor.describe(&a, "A").hash, extractor.describe(&b, "B").hash);
    }
}
