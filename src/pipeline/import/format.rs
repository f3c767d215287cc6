use std::path::Path;

use serde::{Deserialize, Serialize};

/// Formats the extraction router knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Html,
    Text,
    Csv,
    Json,
    Zip,
    Unknown,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Html => "html",
            Self::Text => "text",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Zip => "zip",
            Self::Unknown => "unknown",
        }
    }

    /// Formats with a real extractor behind them (archives are opaque to the router).
    pub fn is_extractable(&self) -> bool {
        !matches!(self, Self::Zip | Self::Unknown)
    }

    pub fn default_mime(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Html => "text/html",
            Self::Text => "text/plain",
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Zip => "application/zip",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Map a lowercase file extension to a format.
pub fn format_from_extension(ext: &str) -> DocumentFormat {
    match ext {
        "pdf" => DocumentFormat::Pdf,
        "docx" => DocumentFormat::Docx,
        "xlsx" => DocumentFormat::Xlsx,
        "html" | "htm" => DocumentFormat::Html,
        "txt" | "text" | "md" => DocumentFormat::Text,
        "csv" => DocumentFormat::Csv,
        "json" => DocumentFormat::Json,
        "zip" => DocumentFormat::Zip,
        _ => DocumentFormat::Unknown,
    }
}

/// Map a declared mime type to a format.
pub fn format_from_mime(mime: &str) -> DocumentFormat {
    let mime = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match mime.as_str() {
        "application/pdf" => DocumentFormat::Pdf,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            DocumentFormat::Docx
        }
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            DocumentFormat::Xlsx
        }
        "text/html" | "application/xhtml+xml" => DocumentFormat::Html,
        "text/plain" | "text/markdown" => DocumentFormat::Text,
        "text/csv" => DocumentFormat::Csv,
        "application/json" => DocumentFormat::Json,
        "application/zip" | "application/x-zip-compressed" => DocumentFormat::Zip,
        _ => DocumentFormat::Unknown,
    }
}

/// Lowercase extension of a file name, if any.
pub fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Detect a file's format: extension first, then declared mime, then
/// magic bytes. `PK` containers are disambiguated by the entry names inside.
pub fn detect_format(name: &str, declared_mime: Option<&str>, bytes: &[u8]) -> DocumentFormat {
    let by_ext = extension_of(name)
        .map(|ext| format_from_extension(&ext))
        .unwrap_or(DocumentFormat::Unknown);
    if by_ext != DocumentFormat::Unknown {
        return by_ext;
    }

    if let Some(mime) = declared_mime {
        let by_mime = format_from_mime(mime);
        if by_mime != DocumentFormat::Unknown {
            return by_mime;
        }
    }

    sniff_format(bytes)
}

/// Magic-byte detection for inputs with no usable name or mime.
pub fn sniff_format(bytes: &[u8]) -> DocumentFormat {
    match bytes {
        // %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => DocumentFormat::Pdf,
        // PK\x03\x04
        [0x50, 0x4B, 0x03, 0x04, ..] => classify_zip_container(bytes),
        _ => {
            let head: String = String::from_utf8_lossy(&bytes[..bytes.len().min(512)])
                .trim_start_matches('\u{feff}')
                .trim_start()
                .chars()
                .take(64)
                .collect::<String>()
                .to_ascii_lowercase();
            if head.starts_with("<!doctype html") || head.starts_with("<html") {
                DocumentFormat::Html
            } else if head.starts_with('{') || head.starts_with('[') {
                DocumentFormat::Json
            } else if looks_like_text(bytes) {
                DocumentFormat::Text
            } else {
                DocumentFormat::Unknown
            }
        }
    }
}

/// OOXML documents are ZIP containers; their entry names give them away.
fn classify_zip_container(bytes: &[u8]) -> DocumentFormat {
    let reader = std::io::Cursor::new(bytes);
    match ::zip::ZipArchive::new(reader) {
        Ok(archive) => {
            let names: Vec<&str> = archive.file_names().collect();
            if names.iter().any(|n| n.starts_with("word/")) {
                DocumentFormat::Docx
            } else if names.iter().any(|n| n.starts_with("xl/")) {
                DocumentFormat::Xlsx
            } else {
                DocumentFormat::Zip
            }
        }
        Err(_) => DocumentFormat::Zip,
    }
}

/// Valid UTF-8 without NUL bytes in the first 8KB.
fn looks_like_text(bytes: &[u8]) -> bool {
    if bytes.is_empty() {
        return false;
    }
    let sample = &bytes[..bytes.len().min(8192)];
    if sample.contains(&0) {
        return false;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte char cut at the sample boundary is still text
        Err(e) => e.error_len().is_none(),
    }
}

/// Sanitize a filename: strip path components, prevent traversal.
pub fn sanitize_filename(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or("");
    let name = Path::new(last)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0') && !c.is_control())
        .take(255)
        .collect();

    if clean.is_empty() || clean == ".." {
        "document".to_string()
    } else {
        clean
    }
}
