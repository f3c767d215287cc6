pub mod format;
pub mod hash;
pub mod intake;
pub mod archive;

pub use format::*;
pub use hash::*;
pub use intake::*;
pub use archive::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Run too large: {total_mb:.1}MB exceeds {max_mb}MB total limit")]
    RunTooLarge { total_mb: f64, max_mb: u64 },

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("Archive has {count} entries, limit is {max}")]
    ZipTooManyEntries { count: usize, max: usize },

    #[error("Archive expands past {max_mb}MB uncompressed")]
    ZipTooLarge { max_mb: u64 },

    #[error("Archive contained no supported documents")]
    ZipEmpty,

    #[error("Archive could not be read: {0}")]
    ZipRead(#[from] ::zip::result::ZipError),
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}
