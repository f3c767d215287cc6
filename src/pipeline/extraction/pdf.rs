use lopdf::Document;

use super::sanitize::sanitize_extracted_text;
use super::types::{ExtractedTable, PdfExtractor, PdfPage};
use super::ExtractionError;

/// PDF text-layer extractor built on lopdf. Page-by-page; no positions.
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PdfPage>, ExtractionError> {
        let doc = Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(e.to_string()))?;

        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(ExtractionError::EncryptedPdf);
        }

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys().copied() {
            let text = match doc.extract_text(&[page_number]) {
                Ok(text) => sanitize_extracted_text(&text),
                Err(e) => {
                    tracing::warn!(
                        page = page_number,
                        error = %e,
                        "PDF page text extraction failed — continuing with empty page"
                    );
                    String::new()
                }
            };
            pages.push(PdfPage {
                page_number,
                text,
                items: vec![],
            });
        }

        Ok(pages)
    }
}

/// Table structure detection inside PDF pages. Not implemented: PDF
/// tables reach the pool only as text.
pub fn extract_page_tables(_doc_id: &str, page: &PdfPage) -> Vec<ExtractedTable> {
    tracing::trace!(page = page.page_number, "PDF table detection not available");
    Vec::new()
}

/// A page counts as having a text layer once it holds more than 10 visible chars.
pub fn has_text_layer(page: &PdfPage) -> bool {
    page.text.trim().chars().count() > 10
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// Build a PDF with one page per entry, each showing its text in Helvetica.
    pub fn make_test_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.4");

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }
}
