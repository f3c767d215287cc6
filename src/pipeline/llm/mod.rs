pub mod client;
pub mod ollama;
pub mod parser;

pub use client::*;
pub use ollama::*;
pub use parser::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),
}
