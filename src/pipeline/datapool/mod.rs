pub mod types;
pub mod doc_id;
pub mod provenance;
pub mod quality;
pub mod builder;

pub use types::*;
pub use doc_id::*;
pub use provenance::*;
pub use quality::*;
pub use builder::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataPoolError {
    #[error("No input files were provided")]
    NoInput,

    #[error("Import error: {0}")]
    Import(#[from] crate::pipeline::import::ImportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
