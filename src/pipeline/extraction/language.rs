//! Lightweight language detection for extracted tender text.
//!
//! Turkish vs English by keyword frequency and Turkish-specific letters.
//! Tender documents are overwhelmingly Turkish, so Turkish wins ties.

/// Common Turkish words and tender vocabulary.
const TURKISH_INDICATORS: &[&str] = &[
    " ve ", " ile ", " bir ", " bu ", " için ", " olarak ", " olan ", " veya ",
    " göre ", " kadar ", " her ", " tarafından ", " edilecek", " yapılacak",
    "ihale", "şartname", "yüklenici", "idare", "teklif", "sözleşme",
    "yemek", "öğün", "kişi", "madde", "tarihi", "bedel",
];

/// Common English words rarely found in Turkish text.
const ENGLISH_INDICATORS: &[&str] = &[
    " the ", " and ", " for ", " are ", " with ", " that ", " this ", " from ",
    " shall ", " will ", " be ", " of ", " to ", " is ",
    "tender", "contract", "supplier", "meal", "price", "date",
];

/// ISO 639-1 code of the dominant language: `"tr"` or `"en"`.
pub fn detect_language(text: &str) -> &'static str {
    if text.trim().chars().count() < 20 {
        return "tr";
    }

    let lower = format!(" {} ", text.replace('İ', "i").to_lowercase());
    let turkish_score = count_indicators(&lower, TURKISH_INDICATORS) + count_turkish_letters(&lower);
    let english_score = count_indicators(&lower, ENGLISH_INDICATORS);

    if turkish_score >= english_score {
        "tr"
    } else {
        "en"
    }
}

fn count_indicators(lower_text: &str, indicators: &[&str]) -> u32 {
    indicators
        .iter()
        .map(|indicator| lower_text.matches(indicator).count() as u32)
        .sum()
}

/// Letters that only Turkish uses among the two; every two count one point.
fn count_turkish_letters(lower_text: &str) -> u32 {
    let count = lower_text
        .chars()
        .filter(|c| matches!(c, 'ı' | 'ğ' | 'ş' | 'ç' | 'ö' | 'ü'))
        .count() as u32;
    count / 2
}
