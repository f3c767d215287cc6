//! Boilerplate removal and section detection for extracted document text.

pub mod cleaner;
pub mod sections;

pub use cleaner::*;
pub use sections::*;
