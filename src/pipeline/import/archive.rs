//! ZIP expansion: one pass, bounded, never recursive.
//!
//! Nested archives are skipped rather than expanded, so expansion always
//! terminates. Any cap violation or read failure hands the archive back
//! as an opaque fallback input instead of dropping it.

use std::collections::HashSet;
use std::io::{Cursor, Read};

use ::zip::ZipArchive;

use super::format::{
    extension_of, format_from_extension, sanitize_filename, sniff_format, DocumentFormat,
};
use super::intake::InputFile;
use super::{bytes_to_mb, ImportError};

#[derive(Debug, Clone, Copy)]
pub struct ZipLimits {
    pub max_entries: usize,
    pub max_uncompressed_bytes: u64,
}

impl Default for ZipLimits {
    fn default() -> Self {
        Self {
            max_entries: crate::config::DEFAULT_ZIP_MAX_ENTRIES,
            max_uncompressed_bytes: crate::config::DEFAULT_ZIP_MAX_UNCOMPRESSED_BYTES,
        }
    }
}

/// Outcome of expanding one archive.
#[derive(Debug)]
pub enum ZipExpansion {
    /// Supported entries, none of them archives.
    Expanded {
        files: Vec<InputFile>,
        warnings: Vec<String>,
    },
    /// Expansion failed; the archive itself is queued as an opaque input.
    Fallback { file: InputFile, error: ImportError },
    /// Same `name+size` fingerprint already handled earlier in this run.
    AlreadyExpanded,
}

/// Expands archives for a single run. Holds the run's fingerprint set.
pub struct ZipExpander {
    limits: ZipLimits,
    seen: HashSet<String>,
}

impl ZipExpander {
    pub fn new(limits: ZipLimits) -> Self {
        Self {
            limits,
            seen: HashSet::new(),
        }
    }

    pub fn expand(&mut self, archive: &InputFile) -> ZipExpansion {
        let fingerprint = archive.fingerprint();
        if !self.seen.insert(fingerprint) {
            tracing::debug!(archive = %archive.name, "Archive already expanded in this run, skipping");
            return ZipExpansion::AlreadyExpanded;
        }

        match self.read_entries(archive) {
            Ok((files, warnings)) => {
                tracing::info!(
                    archive = %archive.name,
                    files = files.len(),
                    skipped = warnings.len(),
                    "Archive expanded"
                );
                ZipExpansion::Expanded { files, warnings }
            }
            Err(error) => {
                tracing::warn!(
                    archive = %archive.name,
                    error = %error,
                    "Archive expansion failed — queuing archive as opaque input"
                );
                ZipExpansion::Fallback {
                    file: archive.clone(),
                    error,
                }
            }
        }
    }

    fn read_entries(
        &self,
        archive_file: &InputFile,
    ) -> Result<(Vec<InputFile>, Vec<String>), ImportError> {
        let mut archive = ZipArchive::new(Cursor::new(archive_file.bytes.as_slice()))?;

        if archive.len() > self.limits.max_entries {
            return Err(ImportError::ZipTooManyEntries {
                count: archive.len(),
                max: self.limits.max_entries,
            });
        }

        let max_bytes = self.limits.max_uncompressed_bytes;
        let too_large = || ImportError::ZipTooLarge {
            max_mb: bytes_to_mb(max_bytes).round() as u64,
        };

        let mut files = Vec::new();
        let mut warnings = Vec::new();
        let mut total: u64 = 0;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            let raw_name = entry.name().to_string();

            if entry.is_dir() || is_junk_entry(&raw_name) {
                continue;
            }

            let name = sanitize_filename(&raw_name);
            let format = extension_of(&name)
                .map(|ext| format_from_extension(&ext))
                .unwrap_or(DocumentFormat::Unknown);

            if format == DocumentFormat::Zip {
                warnings.push(format!("İç içe arşiv atlandı: {raw_name}"));
                continue;
            }
            if !format.is_extractable() {
                warnings.push(format!("Desteklenmeyen dosya türü atlandı: {raw_name}"));
                continue;
            }

            // Header sizes can lie; the read itself is capped too.
            if over_budget(total, entry.size(), max_bytes) {
                return Err(too_large());
            }
            let remaining = max_bytes - total;
            let mut bytes = Vec::new();
            entry.by_ref().take(remaining + 1).read_to_end(&mut bytes)?;
            if bytes.len() as u64 > remaining {
                return Err(too_large());
            }

            // Renamed archives are caught by their bytes
            if !matches!(format, DocumentFormat::Docx | DocumentFormat::Xlsx)
                && sniff_format(&bytes) == DocumentFormat::Zip
            {
                warnings.push(format!("İç içe arşiv atlandı: {raw_name}"));
                continue;
            }

            total += bytes.len() as u64;
            let mime = mime_guess::from_path(&name).first().map(|m| m.to_string());
            files.push(InputFile {
                name,
                bytes,
                declared_mime: mime,
                source_archive: Some(archive_file.name.clone()),
            });
        }

        if files.is_empty() {
            return Err(ImportError::ZipEmpty);
        }

        Ok((files, warnings))
    }
}

/// Declared entry sizes are untrusted and may be near `u64::MAX`.
fn over_budget(total: u64, declared: u64, max_bytes: u64) -> bool {
    total.saturating_add(declared) > max_bytes
}

/// macOS resource forks, Finder metadata and hidden files.
fn is_junk_entry(raw_name: &str) -> bool {
    if raw_name.starts_with("__MACOSX/") || raw_name.contains("/__MACOSX/") {
        return true;
    }
    let base = raw_name.rsplit(['/', '\\']).next().unwrap_or(raw_name);
    base == ".DS_Store" || base.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = ::zip::ZipWriter::new(&mut buf);
            let options = ::zip::write::SimpleFileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    fn archive(name: &str, entries: &[(&str, &[u8])]) -> InputFile {
        InputFile::new(name, make_zip(entries), Some("application/zip"))
    }

    #[test]
    fn expands_supported_entries() {
        let zip = archive(
            "ihale.zip",
            &[
                ("docs/idari_sartname.txt", b"Idari sartname"),
                ("docs/ilan.html", b"<html><p>Ilan</p></html>"),
            ],
        );
        let mut expander = ZipExpander::new(ZipLimits::default());
        match expander.expand(&zip) {
            ZipExpansion::Expanded { files, warnings } => {
                assert_eq!(files.len(), 2);
                assert!(warnings.is_empty());
                assert_eq!(files[0].name, "idari_sartname.txt");
                assert_eq!(files[0].source_archive.as_deref(), Some("ihale.zip"));
                assert_eq!(files[1].declared_mime.as_deref(), Some("text/html"));
            }
            other => panic!("expected expansion, got {other:?}"),
        }
    }

    #[test]
    fn nested_zip_skipped_never_expanded() {
        let inner = make_zip(&[("deep.txt", b"deep")]);
        let zip = archive(
            "outer.zip",
            &[("inner.zip", &inner), ("renamed.txt", &inner), ("a.txt", b"ok")],
        );
        let mut expander = ZipExpander::new(ZipLimits::default());
        match expander.expand(&zip) {
            ZipExpansion::Expanded { files, warnings } => {
                assert_eq!(files.len(), 1);
                assert_eq!(files[0].name, "a.txt");
                assert_eq!(warnings.len(), 2);
                assert!(files.iter().all(|f| f.format() != DocumentFormat::Zip));
            }
            other => panic!("expected expansion, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_and_junk_entries() {
        let zip = archive(
            "paket.zip",
            &[
                ("__MACOSX/._a.txt", b"junk"),
                (".DS_Store", b"junk"),
                ("docs/.hidden.txt", b"junk"),
                ("logo.png", b"\x89PNG"),
                ("teknik.txt", b"teknik"),
            ],
        );
        let mut expander = ZipExpander::new(ZipLimits::default());
        match expander.expand(&zip) {
            ZipExpansion::Expanded { files, warnings } => {
                assert_eq!(files.len(), 1);
                assert_eq!(warnings.len(), 1);
                assert!(warnings[0].contains("logo.png"));
            }
            other => panic!("expected expansion, got {other:?}"),
        }
    }

    #[test]
    fn too_many_entries_falls_back_to_archive() {
        let names: Vec<String> = (0..101).map(|i| format!("f{i}.txt")).collect();
        let entries: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
        let zip = archive("big.zip", &entries);
        let mut expander = ZipExpander::new(ZipLimits::default());
        match expander.expand(&zip) {
            ZipExpansion::Fallback { file, error } => {
                assert_eq!(file, zip);
                assert!(matches!(
                    error,
                    ImportError::ZipTooManyEntries { count: 101, max: 100 }
                ));
            }
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn uncompressed_cap_enforced() {
        let big = vec![b'a'; 4096];
        let zip = archive("bomb.zip", &[("a.txt", &big), ("b.txt", &big)]);
        let mut expander = ZipExpander::new(ZipLimits {
            max_entries: 100,
            max_uncompressed_bytes: 5000,
        });
        assert!(matches!(
            expander.expand(&zip),
            ZipExpansion::Fallback {
                error: ImportError::ZipTooLarge { .. },
                ..
            }
        ));
    }

    #[test]
    fn empty_and_corrupt_archives_fall_back() {
        let mut expander = ZipExpander::new(ZipLimits::default());
        let empty = archive("empty.zip", &[("logo.png", b"png")]);
        assert!(matches!(
            expander.expand(&empty),
            ZipExpansion::Fallback {
                error: ImportError::ZipEmpty,
                ..
            }
        ));

        let corrupt = InputFile::new("broken.zip", b"PK\x03\x04garbage".to_vec(), None);
        assert!(matches!(
            expander.expand(&corrupt),
            ZipExpansion::Fallback {
                error: ImportError::ZipRead(_),
                ..
            }
        ));
    }

    #[test]
    fn same_fingerprint_expanded_once() {
        let zip = archive("ihale.zip", &[("a.txt", b"a")]);
        let mut expander = ZipExpander::new(ZipLimits::default());
        assert!(matches!(expander.expand(&zip), ZipExpansion::Expanded { .. }));
        assert!(matches!(expander.expand(&zip), ZipExpansion::AlreadyExpanded));
    }

    #[test]
    fn forged_entry_size_is_over_budget() {
        assert!(over_budget(1, u64::MAX, 5000));
        assert!(over_budget(u64::MAX, u64::MAX, u64::MAX - 1));
        assert!(!over_budget(1000, 4000, 5000));
        assert!(over_budget(1000, 4001, 5000));
    }

    #[test]
    fn junk_detection() {
        assert!(is_junk_entry("__MACOSX/x"));
        assert!(is_junk_entry("a/.DS_Store"));
        assert!(is_junk_entry(".gitkeep"));
        assert!(!is_junk_entry("a/b.pdf"));
    }
}
