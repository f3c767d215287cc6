use std::path::Path;

use super::format::{detect_format, sanitize_filename, DocumentFormat};
use super::{bytes_to_mb, ImportError};

/// One file handed to the pipeline: name, content and declared mime.
#[derive(Debug, Clone, PartialEq)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub declared_mime: Option<String>,
    /// Archive this file was expanded from, if any.
    pub source_archive: Option<String>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, declared_mime: Option<&str>) -> Self {
        Self {
            name: sanitize_filename(&name.into()),
            bytes,
            declared_mime: declared_mime.map(str::to_string),
            source_archive: None,
        }
    }

    /// Read a file from disk, guessing its mime from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        let mime = mime_guess::from_path(path).first().map(|m| m.to_string());
        Ok(Self::new(name, bytes, mime.as_deref()))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn format(&self) -> DocumentFormat {
        detect_format(&self.name, self.declared_mime.as_deref(), &self.bytes)
    }

    /// Mime for DocumentInfo: declared if present, else the format default.
    pub fn effective_mime(&self) -> String {
        match &self.declared_mime {
            Some(m) if !m.trim().is_empty() => m.clone(),
            _ => self.format().default_mime().to_string(),
        }
    }

    /// Fingerprint used to avoid expanding the same archive twice in a run.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.name, self.size())
    }
}

/// Per-file and per-run upload limits.
#[derive(Debug, Clone, Copy)]
pub struct IntakeLimits {
    pub max_file_bytes: u64,
    pub max_total_bytes: u64,
}

/// Stateful intake check: tracks the running total across one run.
pub struct IntakeGuard {
    limits: IntakeLimits,
    accepted_bytes: u64,
}

impl IntakeGuard {
    pub fn new(limits: IntakeLimits) -> Self {
        Self {
            limits,
            accepted_bytes: 0,
        }
    }

    /// Accept or reject a file. Rejected files do not count toward the total.
    pub fn admit(&mut self, file: &InputFile) -> Result<(), ImportError> {
        let size = file.size();
        if size == 0 {
            return Err(ImportError::EmptyFile(file.name.clone()));
        }
        if size > self.limits.max_file_bytes {
            return Err(ImportError::FileTooLarge {
                size_mb: bytes_to_mb(size),
                max_mb: self.limits.max_file_bytes / (1024 * 1024),
            });
        }
        let total = self.accepted_bytes + size;
        if total > self.limits.max_total_bytes {
            return Err(ImportError::RunTooLarge {
                total_mb: bytes_to_mb(total),
                max_mb: self.limits.max_total_bytes / (1024 * 1024),
            });
        }
        self.accepted_bytes = total;
        Ok(())
    }

    pub fn accepted_bytes(&self) -> u64 {
        self.accepted_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(file: u64, total: u64) -> IntakeLimits {
        IntakeLimits {
            max_file_bytes: file,
            max_total_bytes: total,
        }
    }

    #[test]
    fn input_file_sanitizes_name() {
        let file = InputFile::new("../secret/ilan.pdf", b"%PDF".to_vec(), None);
        assert_eq!(file.name, "ilan.pdf");
        assert_eq!(file.format(), DocumentFormat::Pdf);
        assert_eq!(file.effective_mime(), "application/pdf");
    }

    #[test]
    fn declared_mime_preferred() {
        let file = InputFile::new("x.txt", b"a".to_vec(), Some("text/plain; charset=utf-8"));
        assert_eq!(file.effective_mime(), "text/plain; charset=utf-8");
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teknik.txt");
        std::fs::write(&path, "Teknik şartname").unwrap();
        let file = InputFile::from_path(&path).unwrap();
        assert_eq!(file.name, "teknik.txt");
        assert_eq!(file.declared_mime.as_deref(), Some("text/plain"));
        assert_eq!(file.size(), "Teknik şartname".len() as u64);
    }

    #[test]
    fn fingerprint_is_name_and_size() {
        let file = InputFile::new("paket.zip", vec![1, 2, 3], None);
        assert_eq!(file.fingerprint(), "paket.zip:3");
    }

    #[test]
    fn rejects_empty_and_oversized() {
        let mut guard = IntakeGuard::new(limits(10, 100));
        assert!(matches!(
            guard.admit(&InputFile::new("a.txt", vec![], None)),
            Err(ImportError::EmptyFile(_))
        ));
        assert!(matches!(
            guard.admit(&InputFile::new("b.txt", vec![b'x'; 11], None)),
            Err(ImportError::FileTooLarge { .. })
        ));
        assert_eq!(guard.accepted_bytes(), 0);
    }

    #[test]
    fn running_total_enforced() {
        let mut guard = IntakeGuard::new(limits(10, 15));
        guard.admit(&InputFile::new("a.txt", vec![b'x'; 10], None)).unwrap();
        assert!(matches!(
            guard.admit(&InputFile::new("b.txt", vec![b'x'; 10], None)),
            Err(ImportError::RunTooLarge { .. })
        ));
        guard.admit(&InputFile::new("c.txt", vec![b'x'; 5], None)).unwrap();
        assert_eq!(guard.accepted_bytes(), 15);
    }
}
