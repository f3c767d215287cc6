pub mod contextual;
pub mod engine;
pub mod fields;
pub mod market;
pub mod notify;
pub mod report;
pub mod scores;
pub mod store;
pub mod types;
pub mod validator;

pub use contextual::*;
pub use engine::*;
pub use fields::*;
pub use market::*;
pub use notify::*;
pub use report::*;
pub use scores::*;
pub use store::*;
pub use types::*;
pub use validator::*;

use thiserror::Error;

use crate::pipeline::llm::LlmError;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Price source '{source_name}' failed: {message}")]
    PriceSource {
        source_name: String,
        message: String,
    },

    #[error("Nothing to analyze: {0}")]
    EmptyInput(String),

    #[error("Stage task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not persist {path}: {message}")]
    Persist { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
