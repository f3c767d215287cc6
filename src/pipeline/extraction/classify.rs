//! Document type guessing.
//!
//! Two passes: filename alone, then filename plus content. The higher
//! confidence wins; a tie goes to the content pass.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeGuess {
    pub doc_type: DocumentType,
    pub confidence: f32,
}

impl TypeGuess {
    const UNKNOWN: TypeGuess = TypeGuess {
        doc_type: DocumentType::Bilinmeyen,
        confidence: 0.0,
    };

    fn new(doc_type: DocumentType, confidence: f32) -> Self {
        Self {
            doc_type,
            confidence,
        }
    }
}

const CONTENT_MATCH_CONFIDENCE: f32 = 0.7;
/// Only the head of a document is scanned for type keywords.
const CONTENT_SCAN_CHARS: usize = 5000;

/// "ek" as a standalone token (EK-1, ek_2, Ek 3), not inside a word like "teknik".
static APPENDIX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^a-z])(?:ek|appendix)(?:[^a-z]|$)").unwrap());

/// Filename keyword rules, checked in order.
const FILENAME_RULES: &[(&[&str], DocumentType, f32)] = &[
    (&["idari", "administrative"], DocumentType::Idari, 0.9),
    (&["teknik", "technical"], DocumentType::Teknik, 0.9),
    (&["ilan", "announcement"], DocumentType::Ilan, 0.9),
    (&["sozlesme", "contract"], DocumentType::Sozlesme, 0.9),
    (&["menu", "yemek"], DocumentType::Menu, 0.85),
    (&["gramaj", "portion"], DocumentType::Gramaj, 0.85),
];

/// Content keyword rules, checked in order.
const CONTENT_RULES: &[(&[&str], DocumentType)] = &[
    (&["idari şartname", "idari sartname"], DocumentType::Idari),
    (&["teknik şartname", "teknik sartname"], DocumentType::Teknik),
    (&["ihale ilanı", "ihale ilani"], DocumentType::Ilan),
    (&["sözleşme tasarısı", "sözleşme", "sozlesme"], DocumentType::Sozlesme),
    (&["yemek listesi", "menü"], DocumentType::Menu),
    (&["gramaj"], DocumentType::Gramaj),
];

/// Lowercase with Turkish letters folded to ASCII, for filename matching.
pub fn fold_turkish(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            'İ' | 'I' | 'ı' => vec!['i'],
            'Ş' | 'ş' => vec!['s'],
            'Ğ' | 'ğ' => vec!['g'],
            'Ü' | 'ü' => vec!['u'],
            'Ö' | 'ö' => vec!['o'],
            'Ç' | 'ç' => vec!['c'],
            other => other.to_lowercase().collect(),
        })
        .collect()
}

/// Turkish-aware lowercase: `İ` → `i`, `I` → `ı`.
pub fn turkish_lowercase(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            'İ' => vec!['i'],
            'I' => vec!['ı'],
            other => other.to_lowercase().collect(),
        })
        .collect()
}

/// Pass one: filename only.
pub fn guess_from_filename(name: &str) -> TypeGuess {
    let folded = fold_turkish(name);
    for (keywords, doc_type, confidence) in FILENAME_RULES {
        if keywords.iter().any(|k| folded.contains(k)) {
            return TypeGuess::new(*doc_type, *confidence);
        }
    }
    if APPENDIX_TOKEN.is_match(&folded) {
        return TypeGuess::new(DocumentType::Ek, 0.8);
    }
    TypeGuess::UNKNOWN
}

/// Pass two: filename rules first, then content keywords at lower confidence.
pub fn guess_from_content(name: &str, content: &str) -> TypeGuess {
    let by_name = guess_from_filename(name);
    if by_name.doc_type != DocumentType::Bilinmeyen {
        return by_name;
    }

    let head: String = content.chars().take(CONTENT_SCAN_CHARS).collect();
    let lower = turkish_lowercase(&head);
    for (keywords, doc_type) in CONTENT_RULES {
        if keywords.iter().any(|k| lower.contains(k)) {
            return TypeGuess::new(*doc_type, CONTENT_MATCH_CONFIDENCE);
        }
    }
    TypeGuess::UNKNOWN
}

/// Keep the higher-confidence guess; ties prefer the content pass.
pub fn classify_document(name: &str, content: &str) -> TypeGuess {
    let by_name = guess_from_filename(name);
    let by_content = guess_from_content(name, content);
    if by_content.confidence >= by_name.confidence {
        by_content
    } else {
        by_name
    }
}
