pub mod import;
pub mod extraction;
pub mod cleaning;
pub mod chunking;
pub mod patterns;
pub mod datapool;
pub mod llm; // Local Ollama client used by the contextual stage
pub mod types;
