use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::types::{EntityKind, ExtractedEntity};

const IKN_CONFIDENCE: f32 = 0.95;
const ILAN_CONFIDENCE: f32 = 0.95;
const EMAIL_CONFIDENCE: f32 = 0.98;
const PHONE_CONFIDENCE: f32 = 0.9;
const LABELLED_ORG_CONFIDENCE: f32 = 0.85;
const SUFFIX_ORG_CONFIDENCE: f32 = 0.7;
const MAX_ORG_CHARS: usize = 120;

static IKN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[İi]hale\s+Kay[ıi]t\s+(?:No|Numaras[ıi])|[İI]KN)\s*:?\s*(\d{4}/\d+|\d{4,})").unwrap()
});
static ILAN_NO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[İi]lan\s+(?:No|Numaras[ıi])\s*:?\s*(\d[\d/\-]*)").unwrap()
});
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap());
/// Landline area codes of the larger provinces plus 5xx mobile prefixes.
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\+90[\s\-]*|\b0[\s\-]*)?\(?\b(?:212|216|312|232|224|262|264|322|342|352|362|382|384|414|422|424|432|434|442|462|472|482|484|488|5\d{2})\)?[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2}\b",
    )
    .unwrap()
});
/// Capitalised words ending in an institutional suffix.
static ORG_BY_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:\p{Lu}[\p{L}.]*\s+){1,6}(?:Belediye\s+Başkanlığı|Belediyesi|Üniversitesi|Hastanesi|Müdürlüğü|Başkanlığı|Bakanlığı|Rektörlüğü|Valiliği|Kaymakamlığı|Komutanlığı))",
    )
    .unwrap()
});
/// "İdare adı: ...", "Kurum adı: ...", "İdarenin adı: ..."
static ORG_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[İi]dare(?:nin)?|Kurum(?:un)?)\s+ad[ıi]\s*:\s*([^\n;]+)").unwrap()
});

fn entity(kind: EntityKind, value: &str, normalized: Option<String>, source: &str, confidence: f32) -> ExtractedEntity {
    ExtractedEntity {
        kind,
        value: value.trim().to_string(),
        normalized,
        source: source.to_string(),
        confidence,
    }
}

/// Digits only, as a 10-digit national number when a country or trunk
/// prefix is present.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 12 && digits.starts_with("90") {
        digits[2..].to_string()
    } else if digits.len() == 11 && digits.starts_with('0') {
        digits[1..].to_string()
    } else {
        digits
    }
}

fn clean_org_name(raw: &str) -> Option<String> {
    let name = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | ';'))
        .trim();
    if name.is_empty() || name.chars().count() > MAX_ORG_CHARS {
        return None;
    }
    Some(name.to_string())
}

/// IKN, announcement numbers, emails, phones and organization names.
/// Duplicates by `(kind, value)` are dropped.
pub fn extract_entities(text: &str, source: &str) -> Vec<ExtractedEntity> {
    let mut entities = Vec::new();

    for caps in IKN.captures_iter(text) {
        if let Some(number) = caps.get(1) {
            entities.push(entity(EntityKind::Ikn, number.as_str(), None, source, IKN_CONFIDENCE));
        }
    }

    for caps in ILAN_NO.captures_iter(text) {
        if let Some(number) = caps.get(1) {
            let value = number.as_str().trim_end_matches(['/', '-']);
            entities.push(entity(EntityKind::IlanNo, value, None, source, ILAN_CONFIDENCE));
        }
    }

    for m in EMAIL.find_iter(text) {
        let normalized = Some(m.as_str().to_lowercase());
        entities.push(entity(EntityKind::Email, m.as_str(), normalized, source, EMAIL_CONFIDENCE));
    }

    for m in PHONE.find_iter(text) {
        let normalized = normalize_phone(m.as_str());
        if normalized.len() != 10 {
            continue;
        }
        entities.push(entity(EntityKind::Telefon, m.as_str(), Some(normalized), source, PHONE_CONFIDENCE));
    }

    for caps in ORG_LABEL.captures_iter(text) {
        if let Some(name) = caps.get(1).and_then(|m| clean_org_name(m.as_str())) {
            entities.push(entity(EntityKind::Kurum, &name, None, source, LABELLED_ORG_CONFIDENCE));
        }
    }

    for caps in ORG_BY_SUFFIX.captures_iter(text) {
        if let Some(name) = caps.get(1).and_then(|m| clean_org_name(m.as_str())) {
            let normalized = Some(name.split_whitespace().collect::<Vec<_>>().join(" "));
            entities.push(entity(EntityKind::Kurum, &name, normalized, source, SUFFIX_ORG_CONFIDENCE));
        }
    }

    let mut seen = HashSet::new();
    entities.retain(|e| seen.insert((e.kind, e.value.clone())));
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(entities: &[ExtractedEntity], kind: EntityKind) -> Vec<&str> {
        entities
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.value.as_str())
            .collect()
    }

    #[test]
    fn labelled_organization() {
        let entities = extract_entities("İdare adı: ABC Belediyesi", "A:1.0");
        assert_eq!(values(&entities, EntityKind::Kurum), vec!["ABC Belediyesi"]);
        assert_eq!(entities[0].confidence, 0.85);
    }

    #[test]
    fn organization_by_suffix() {
        let entities = extract_entities("Hizmet T.C. Ankara Üniversitesi Rektörlüğü için yapılacaktır.", "B");
        let orgs = values(&entities, EntityKind::Kurum);
        assert_eq!(orgs, vec!["Hizmet T.C. Ankara Üniversitesi Rektörlüğü"]);
        assert_eq!(entities[0].confidence, 0.7);
    }

    #[test]
    fn ikn_and_announcement_numbers() {
        let entities = extract_entities("İhale Kayıt No: 2025/123456 — İlan No: 2025-44/", "C");
        assert_eq!(values(&entities, EntityKind::Ikn), vec!["2025/123456"]);
        assert_eq!(values(&entities, EntityKind::IlanNo), vec!["2025-44"]);
        assert_eq!(extract_entities("İKN 20250001", "C")[0].value, "20250001");
    }

    #[test]
    fn emails_and_phones() {
        let entities = extract_entities("E-posta: Satin.Alma@abc.bel.tr Tel: 0 (312) 555 12 34", "D");
        let email = entities.iter().find(|e| e.kind == EntityKind::Email).unwrap();
        assert_eq!(email.value, "Satin.Alma@abc.bel.tr");
        assert_eq!(email.normalized.as_deref(), Some("satin.alma@abc.bel.tr"));
        assert_eq!(email.confidence, 0.98);

        let phone = entities.iter().find(|e| e.kind == EntityKind::Telefon).unwrap();
        assert_eq!(phone.normalized.as_deref(), Some("3125551234"));
        assert_eq!(phone.confidence, 0.9);
    }

    #[test]
    fn mobile_with_country_code() {
        assert_eq!(normalize_phone("+90 532 111 22 33"), "5321112233");
        let entities = extract_entities("GSM: +90 532 111 22 33", "E");
        assert_eq!(entities[0].normalized.as_deref(), Some("5321112233"));
    }

    #[test]
    fn duplicates_dropped() {
        let entities = extract_entities("info@abc.gov.tr ve info@abc.gov.tr", "F");
        assert_eq!(entities.len(), 1);
    }
}
