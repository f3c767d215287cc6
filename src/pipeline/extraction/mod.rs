pub mod types;
pub mod sanitize;
pub mod classify;
pub mod pdf;
pub mod ooxml;
pub mod docx;
pub mod xlsx;
pub mod html;
pub mod text;
pub mod language;
pub mod router;

pub use types::*;
pub use sanitize::*;
pub use classify::*;
pub use pdf::*;
pub use language::*;
pub use router::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF is password-protected — please decrypt it first")]
    EncryptedPdf,

    #[error("Office container could not be opened: {0}")]
    Container(#[from] zip::result::ZipError),

    #[error("Office container is missing part: {0}")]
    MissingPart(String),

    #[error("XML parsing failed: {0}")]
    XmlParsing(String),

    #[error("HTML selector error: {0}")]
    HtmlSelector(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("Unsupported format for extraction: {0}")]
    UnsupportedFormat(String),

    #[error("Extractor panicked on {0}")]
    Panicked(String),
}

impl From<quick_xml::Error> for ExtractionError {
    fn from(e: quick_xml::Error) -> Self {
        Self::XmlParsing(e.to_string())
    }
}
