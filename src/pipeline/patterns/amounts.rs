use std::sync::LazyLock;

use regex::Regex;

use super::context_window;
use super::number::parse_turkish_number;
use super::types::{AmountKind, ExtractedAmount};
use crate::pipeline::extraction::turkish_lowercase;

/// Money with a labelled kind ("yaklaşık maliyet", "geçici teminat", ...).
const LABELLED_MONEY_CONFIDENCE: f32 = 0.9;
/// Money with no label nearby, kept as an estimated-cost candidate.
const UNLABELLED_MONEY_CONFIDENCE: f32 = 0.6;
const QUANTITY_CONFIDENCE: f32 = 0.8;
const RATE_CONFIDENCE: f32 = 0.8;

const MONEY_CONTEXT_CHARS: usize = 100;
const RATE_CONTEXT_CHARS: usize = 100;

static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?|\d+(?:,\d{1,2})?)\s*(TL\b|₺|TRY\b|EUR\b|€|USD\b|\$)").unwrap()
});
static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,3}(?:\.\d{3})+(?:,\d+)?|\d+(?:,\d+)?)\s*(kişi|gün|öğün|porsiyon|adet|kg|gr|lt|ml)\b").unwrap()
});
static PERCENTAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\s*(\d+(?:[.,]\d+)?)|(\d+(?:[.,]\d+)?)\s*%").unwrap());

/// Labels looked for in the text before a money amount.
const MONEY_LABELS: &[(&str, AmountKind)] = &[
    ("geçici teminat", AmountKind::GeciciTeminat),
    ("kesin teminat", AmountKind::KesinTeminat),
    ("yaklaşık maliyet", AmountKind::TahminiBedel),
    ("tahmini bedel", AmountKind::TahminiBedel),
];

pub fn normalize_currency(symbol: &str) -> &'static str {
    match symbol.to_uppercase().as_str() {
        "€" | "EUR" => "EUR",
        "$" | "USD" => "USD",
        _ => "TRY",
    }
}

fn quantity_kind(unit: &str) -> AmountKind {
    match turkish_lowercase(unit).as_str() {
        "kişi" => AmountKind::KisiSayisi,
        "gün" => AmountKind::GunSayisi,
        "öğün" => AmountKind::OgunSayisi,
        "kg" | "gr" => AmountKind::Gramaj,
        _ => AmountKind::Porsiyon,
    }
}

/// Money, quantities with unit keywords, and penalty rates.
pub fn extract_amounts(text: &str, source: &str) -> Vec<ExtractedAmount> {
    let mut amounts = Vec::new();

    for caps in MONEY.captures_iter(text) {
        let (Some(whole), Some(number), Some(currency)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(value) = parse_turkish_number(number.as_str()) else { continue };
        let before = context_window(text, whole.start(), whole.start(), MONEY_CONTEXT_CHARS, 0);
        // The closest label wins
        let label = MONEY_LABELS
            .iter()
            .filter_map(|(label, kind)| before.rfind(label).map(|pos| (pos, *kind)))
            .max_by_key(|(pos, _)| *pos);
        let (kind, confidence) = match label {
            Some((_, kind)) => (kind, LABELLED_MONEY_CONFIDENCE),
            None => (AmountKind::TahminiBedel, UNLABELLED_MONEY_CONFIDENCE),
        };
        amounts.push(ExtractedAmount {
            kind,
            value,
            currency: Some(normalize_currency(currency.as_str()).to_string()),
            unit: None,
            original: whole.as_str().to_string(),
            source: source.to_string(),
            confidence,
        });
    }

    for caps in QUANTITY.captures_iter(text) {
        let (Some(whole), Some(number), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let Some(value) = parse_turkish_number(number.as_str()) else { continue };
        amounts.push(ExtractedAmount {
            kind: quantity_kind(unit.as_str()),
            value,
            currency: None,
            unit: Some(turkish_lowercase(unit.as_str())),
            original: whole.as_str().to_string(),
            source: source.to_string(),
            confidence: QUANTITY_CONFIDENCE,
        });
    }

    for caps in PERCENTAGE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(value) = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| parse_turkish_number(&m.as_str().replace('.', ",")))
        else {
            continue;
        };
        let window = context_window(text, whole.start(), whole.end(), RATE_CONTEXT_CHARS, RATE_CONTEXT_CHARS);
        if window.contains("ceza") || window.contains("gecikme") {
            amounts.push(ExtractedAmount {
                kind: AmountKind::CezaOrani,
                value,
                currency: None,
                unit: Some("%".into()),
                original: whole.as_str().to_string(),
                source: source.to_string(),
                confidence: RATE_CONFIDENCE,
            });
        }
    }

    amounts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_cost_in_turkish_notation() {
        let amounts = extract_amounts("Yaklaşık Maliyet: 1.234.567,89 TL", "A:1.0");
        assert_eq!(amounts.len(), 1);
        let a = &amounts[0];
        assert_eq!(a.kind, AmountKind::TahminiBedel);
        assert_eq!(a.value, 1_234_567.89);
        assert_eq!(a.currency.as_deref(), Some("TRY"));
        assert_eq!(a.confidence, 0.9);
    }

    #[test]
    fn guarantees_and_currencies() {
        let amounts = extract_amounts("Geçici teminat 30.000 ₺ olup kesin teminat 5.000 EUR", "B");
        assert_eq!(amounts[0].kind, AmountKind::GeciciTeminat);
        assert_eq!(amounts[0].value, 30_000.0);
        assert_eq!(amounts[0].currency.as_deref(), Some("TRY"));
        assert_eq!(amounts[1].kind, AmountKind::KesinTeminat);
        assert_eq!(amounts[1].currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn unlabelled_money_has_lower_confidence() {
        let amounts = extract_amounts("Toplam 2.500 TL", "C");
        assert_eq!(amounts[0].kind, AmountKind::TahminiBedel);
        assert_eq!(amounts[0].confidence, 0.6);
    }

    #[test]
    fn quantities_by_unit() {
        let amounts = extract_amounts("1.500 kişi, 365 gün, 3 öğün, 250 gr, 10 adet", "D");
        let kinds: Vec<(AmountKind, f64)> = amounts.iter().map(|a| (a.kind, a.value)).collect();
        assert_eq!(
            kinds,
            vec![
                (AmountKind::KisiSayisi, 1500.0),
                (AmountKind::GunSayisi, 365.0),
                (AmountKind::OgunSayisi, 3.0),
                (AmountKind::Gramaj, 250.0),
                (AmountKind::Porsiyon, 10.0),
            ]
        );
        assert_eq!(amounts[0].unit.as_deref(), Some("kişi"));
    }

    #[test]
    fn percentages_only_near_penalty_words() {
        let near = extract_amounts("Gecikme halinde günlük %0,5 ceza uygulanır", "E");
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].kind, AmountKind::CezaOrani);
        assert_eq!(near[0].value, 0.5);

        let far = extract_amounts("Yüklenici kârı %10 olarak hesaplanır", "E");
        assert!(far.is_empty());
    }

    #[test]
    fn unit_prefix_words_are_not_quantities() {
        assert!(extract_amounts("500 kişilik yemekhane", "F").is_empty());
    }
}
