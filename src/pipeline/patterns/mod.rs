//! Regex and keyword extraction of dates, amounts and entities from
//! Turkish tender text. Every match carries its source id and a fixed
//! confidence for the rule that produced it.

pub mod types;
pub mod number;
pub mod dates;
pub mod amounts;
pub mod entities;

pub use types::*;
pub use number::*;
pub use dates::*;
pub use amounts::*;
pub use entities::*;

use crate::pipeline::extraction::turkish_lowercase;
use crate::pipeline::types::ProcessingOptions;

/// Run the extractors enabled in `options` over one piece of text.
pub fn extract_patterns(text: &str, source: &str, options: &ProcessingOptions) -> PatternMatches {
    let mut matches = PatternMatches::default();
    if options.extract_dates {
        matches.dates = extract_dates(text, source);
    }
    if options.extract_amounts {
        matches.amounts = extract_amounts(text, source);
    }
    if options.extract_entities {
        matches.entities = extract_entities(text, source);
    }
    matches
}

/// Lowercased text around `start..end`, widened by whole characters.
pub(crate) fn context_window(text: &str, start: usize, end: usize, before: usize, after: usize) -> String {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(before)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(after)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    turkish_lowercase(&text[from..to])
}
