use std::sync::LazyLock;

use regex::Regex;

use super::types::{ExtractedFields, SourcedStatement, TenderType};
use crate::pipeline::datapool::DataPool;
use crate::pipeline::extraction::turkish_lowercase;
use crate::pipeline::patterns::{AmountKind, DateKind, EntityKind, ExtractedAmount};

const PENALTY_KEYWORDS: &[&str] = &["ceza", "gecikme", "tazminat", "kesinti", "müeyyide"];
const PENALTY_CONFIDENCE: f32 = 0.9;
const PENALTY_CONTEXT_CHARS: usize = 200;

/// First keyword found in a block decides the tender type.
const TENDER_TYPE_KEYWORDS: &[(&str, TenderType)] = &[
    ("hizmet alımı", TenderType::HizmetAlimi),
    ("mal alımı", TenderType::MalAlimi),
    ("yapım işi", TenderType::YapimIsi),
    ("yemek hizmeti", TenderType::YemekHizmeti),
    ("catering", TenderType::Catering),
];

/// Sentence boundary: terminal punctuation followed by whitespace or end of
/// text, so `1.500` and `%0,5` stay intact.
static SENTENCE_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").unwrap());

/// Derive the tender's key facts from the DataPool's pattern matches.
pub fn extract_fields(pool: &DataPool) -> ExtractedFields {
    let entity = |kind: EntityKind| {
        pool.entities
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.normalized.clone().unwrap_or_else(|| e.value.clone()))
    };
    let date = |kind: DateKind| pool.dates.iter().filter(|d| d.kind == kind).find_map(|d| d.day());

    let fields = ExtractedFields {
        kurum: entity(EntityKind::Kurum),
        kurum_adres: entity(EntityKind::Adres),
        ihale_turu: detect_tender_type(pool),
        ihale_no: entity(EntityKind::IlanNo),
        ikn: entity(EntityKind::Ikn),
        ihale_tarihi: date(DateKind::IhaleTarihi),
        son_teklif_tarihi: date(DateKind::SonTeklif),
        sozlesme_baslangic: date(DateKind::SozlesmeBaslangic),
        tahmini_butce: best_amount(&pool.amounts, AmountKind::TahminiBedel),
        gecici_teminat: best_amount(&pool.amounts, AmountKind::GeciciTeminat),
        kesin_teminat: best_amount(&pool.amounts, AmountKind::KesinTeminat),
        kisi_sayisi: count(&pool.amounts, AmountKind::KisiSayisi),
        gun_sayisi: count(&pool.amounts, AmountKind::GunSayisi),
        ogun_sayisi: count(&pool.amounts, AmountKind::OgunSayisi),
        cezai_sartlar: penalty_clauses(pool),
    };

    tracing::debug!(
        kurum = fields.kurum.is_some(),
        ihale_tarihi = fields.ihale_tarihi.is_some(),
        butce = fields.tahmini_butce.is_some(),
        penalties = fields.cezai_sartlar.len(),
        "Fields extracted"
    );
    fields
}

/// Highest-confidence amount of a kind; the earliest wins ties, so a
/// labelled estimate beats a bare money figure.
fn best_amount(amounts: &[ExtractedAmount], kind: AmountKind) -> Option<f64> {
    amounts
        .iter()
        .filter(|a| a.kind == kind)
        .fold(None::<&ExtractedAmount>, |best, a| match best {
            Some(b) if b.confidence >= a.confidence => Some(b),
            _ => Some(a),
        })
        .map(|a| a.value)
}

fn count(amounts: &[ExtractedAmount], kind: AmountKind) -> Option<u32> {
    amounts
        .iter()
        .find(|a| a.kind == kind && a.value.is_finite() && a.value >= 0.0)
        .map(|a| a.value.round() as u32)
}

fn detect_tender_type(pool: &DataPool) -> Option<TenderType> {
    pool.text_blocks.iter().find_map(|block| {
        let lower = turkish_lowercase(&block.text);
        TENDER_TYPE_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, kind)| *kind)
    })
}

/// Sentences mentioning penalties, each sourced to its block.
fn penalty_clauses(pool: &DataPool) -> Vec<SourcedStatement> {
    let mut clauses = Vec::new();

    for block in &pool.text_blocks {
        if !contains_penalty_keyword(&block.text) {
            continue;
        }
        let context: String = block.text.chars().take(PENALTY_CONTEXT_CHARS).collect();

        for sentence in SENTENCE_END.split(&block.text) {
            let sentence = sentence.trim();
            if sentence.is_empty() || !contains_penalty_keyword(sentence) {
                continue;
            }
            clauses.push(SourcedStatement {
                text: sentence.to_string(),
                source_ref: vec![block.block_id.clone()],
                confidence: PENALTY_CONFIDENCE,
                context: Some(context.clone()),
            });
        }
    }

    clauses
}

fn contains_penalty_keyword(text: &str) -> bool {
    let lower = turkish_lowercase(text);
    PENALTY_KEYWORDS.iter().any(|k| lower.contains(k))
}
