pub mod types;
pub mod chunker;

pub use types::*;
pub use chunker::*;
