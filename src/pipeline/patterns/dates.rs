use std::collections::HashSet;
use std::ops::Range;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime};
use regex::{Captures, Regex};

use super::context_window;
use super::types::{DateKind, ExtractedDate};
use crate::pipeline::extraction::fold_turkish;

const DATE_CONFIDENCE: f32 = 0.9;
const CONTEXT_CHARS: usize = 50;
/// Offset assumed for times written in tender documents (Turkey, no DST).
const TURKEY_OFFSET: &str = "+03:00";

static NUMERIC_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})[./](\d{1,2})[./](\d{4})\s+(?:saat\s*:?\s*)?(\d{1,2})[:.](\d{2})\b").unwrap()
});
static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[./](\d{1,2})[./](\d{4})\b").unwrap());
static NAMED_MONTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\s+(Ocak|Şubat|Mart|Nisan|May[ıi]s|Haziran|Temmuz|A[ğg]ustos|Eyl[üu]l|Ekim|Kas[ıi]m|Aral[ıi]k)\s+(\d{4})\b").unwrap()
});

/// Context keywords in priority order; the first one found decides the kind.
const KIND_KEYWORDS: &[(&str, DateKind)] = &[
    ("son teklif", DateKind::SonTeklif),
    ("teklif verme", DateKind::SonTeklif),
    ("başvuru tarihi", DateKind::SonTeklif),
    ("sözleşme başlangıç", DateKind::SozlesmeBaslangic),
    ("işe başlama", DateKind::SozlesmeBaslangic),
    ("ihale tarihi", DateKind::IhaleTarihi),
    ("teslim tarihi", DateKind::Teslim),
    ("yayın tarihi", DateKind::Yayin),
    ("ilan tarihi", DateKind::Yayin),
];

fn month_number(name: &str) -> Option<u32> {
    let month = match fold_turkish(name).as_str() {
        "ocak" => 1,
        "subat" => 2,
        "mart" => 3,
        "nisan" => 4,
        "mayis" => 5,
        "haziran" => 6,
        "temmuz" => 7,
        "agustos" => 8,
        "eylul" => 9,
        "ekim" => 10,
        "kasim" => 11,
        "aralik" => 12,
        _ => return None,
    };
    Some(month)
}

fn capture_u32(caps: &Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}

fn iso_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Classify a date by the keywords around it.
pub fn classify_date(text: &str, span: Range<usize>) -> DateKind {
    let window = context_window(text, span.start, span.end, CONTEXT_CHARS, CONTEXT_CHARS);
    KIND_KEYWORDS
        .iter()
        .find(|(keyword, _)| window.contains(keyword))
        .map(|(_, kind)| *kind)
        .unwrap_or(DateKind::Diger)
}

/// Extract dates, most specific pattern first. A span claimed by a
/// date-time is not matched again as a bare date. Calendar-invalid dates
/// (31.02.2025) are dropped.
pub fn extract_dates(text: &str, source: &str) -> Vec<ExtractedDate> {
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut found = Vec::new();

    let mut push = |span: Range<usize>, value: String, claimed: &mut Vec<Range<usize>>| {
        if claimed.iter().any(|c| c.start < span.end && span.start < c.end) {
            return;
        }
        found.push(ExtractedDate {
            kind: classify_date(text, span.clone()),
            value,
            original: text[span.clone()].to_string(),
            source: source.to_string(),
            confidence: DATE_CONFIDENCE,
        });
        claimed.push(span);
    };

    for caps in NUMERIC_DATE_TIME.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let date = (capture_u32(&caps, 1), capture_u32(&caps, 2), capture_u32(&caps, 3));
        let time = (capture_u32(&caps, 4), capture_u32(&caps, 5));
        let (Some(day), Some(month), Some(year)) = date else { continue };
        let (Some(hour), Some(minute)) = time else { continue };
        let (Some(date), Some(time)) = (iso_date(year, month, day), NaiveTime::from_hms_opt(hour, minute, 0)) else {
            continue;
        };
        let value = format!("{}T{}{TURKEY_OFFSET}", date.format("%Y-%m-%d"), time.format("%H:%M:%S"));
        push(whole.range(), value, &mut claimed);
    }

    for caps in NUMERIC_DATE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (Some(day), Some(month), Some(year)) =
            (capture_u32(&caps, 1), capture_u32(&caps, 2), capture_u32(&caps, 3))
        else {
            continue;
        };
        if let Some(date) = iso_date(year, month, day) {
            push(whole.range(), date.format("%Y-%m-%d").to_string(), &mut claimed);
        }
    }

    for caps in NAMED_MONTH_DATE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let month = caps.get(2).and_then(|m| month_number(m.as_str()));
        let (Some(day), Some(month), Some(year)) = (capture_u32(&caps, 1), month, capture_u32(&caps, 3)) else {
            continue;
        };
        if let Some(date) = iso_date(year, month, day) {
            push(whole.range(), date.format("%Y-%m-%d").to_string(), &mut claimed);
        }
    }

    let mut seen = HashSet::new();
    found.retain(|d| seen.insert((d.kind, d.value.clone())));
    found
}
