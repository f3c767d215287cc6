use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ExtractionError;
use crate::pipeline::import::DocumentFormat;

/// Tender document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// İdari şartname (administrative specification)
    Idari,
    /// Teknik şartname (technical specification)
    Teknik,
    Ilan,
    Sozlesme,
    Ek,
    Menu,
    Gramaj,
    Bilinmeyen,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idari => "idari",
            Self::Teknik => "teknik",
            Self::Ilan => "ilan",
            Self::Sozlesme => "sozlesme",
            Self::Ek => "ek",
            Self::Menu => "menu",
            Self::Gramaj => "gramaj",
            Self::Bilinmeyen => "bilinmeyen",
        }
    }
}

/// One input file as seen by the pipeline. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    pub name: String,
    pub type_guess: DocumentType,
    pub type_confidence: f32,
    /// SHA-256 of the file bytes, base64. Dedup key.
    pub hash: String,
    pub size: u64,
    pub mime_type: String,
    pub format: DocumentFormat,
    pub source_archive: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Position of a text item on a PDF page, in PDF user-space points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// `doc_id:page.index`; unpaginated formats use page segment 0.
    pub block_id: String,
    pub doc_id: String,
    pub text: String,
    pub page: Option<u32>,
    pub line_start: Option<u32>,
    pub line_end: Option<u32>,
    pub bbox: Option<BoundingBox>,
}

impl TextBlock {
    pub fn new(doc_id: &str, page: Option<u32>, index: usize, text: impl Into<String>) -> Self {
        Self {
            block_id: block_id(doc_id, page, index),
            doc_id: doc_id.to_string(),
            text: text.into(),
            page,
            line_start: None,
            line_end: None,
            bbox: None,
        }
    }

    pub fn with_lines(mut self, start: u32, end: u32) -> Self {
        self.line_start = Some(start);
        self.line_end = Some(end);
        self
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

pub fn block_id(doc_id: &str, page: Option<u32>, index: usize) -> String {
    format!("{}:{}.{}", doc_id, page.unwrap_or(0), index)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// `T<n>`. Numbered per file by extractors, renumbered run-wide by the DataPool builder.
    pub table_id: String,
    pub doc_id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub title: Option<String>,
    pub page: Option<u32>,
}

impl ExtractedTable {
    /// First row becomes the header row. `None` when there are no rows.
    pub fn from_grid(doc_id: &str, index: usize, mut grid: Vec<Vec<String>>) -> Option<Self> {
        grid.retain(|row| row.iter().any(|c| !c.trim().is_empty()));
        if grid.is_empty() {
            return None;
        }
        let headers = grid.remove(0);
        Some(Self {
            table_id: format!("T{}", index + 1),
            doc_id: doc_id.to_string(),
            headers,
            rows: grid,
            title: None,
            page: None,
        })
    }

    /// Tab-separated rendering: title line, header row, data rows.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(&format!("Table: {title}\n"));
        }
        out.push_str(&self.headers.join("\t"));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join("\t"));
            out.push('\n');
        }
        out
    }
}

/// What a single format extractor produces for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedContent {
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<ExtractedTable>,
    pub raw_text: String,
    pub warnings: Vec<String>,
}

/// Router output: info plus content for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub info: DocumentInfo,
    pub content: ExtractedContent,
}

/// Text item with an optional position, as produced by PDF text layers or OCR.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedText {
    pub text: String,
    pub bbox: Option<BoundingBox>,
}

/// One PDF page. `items` is filled only by extractors that know positions.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfPage {
    pub page_number: u32,
    pub text: String,
    pub items: Vec<PositionedText>,
}

/// PDF text extraction abstraction
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<PdfPage>, ExtractionError>;
}

/// OCR hook for pages without a text layer. No engine ships with the crate.
pub trait OcrEngine: Send + Sync {
    fn recognize_page(
        &self,
        pdf_bytes: &[u8],
        page_number: u32,
    ) -> Result<Vec<PositionedText>, ExtractionError>;
}
