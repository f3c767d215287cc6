use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateKind {
    IhaleTarihi,
    SonTeklif,
    SozlesmeBaslangic,
    Teslim,
    Yayin,
    Diger,
}

impl DateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IhaleTarihi => "ihale_tarihi",
            Self::SonTeklif => "son_teklif",
            Self::SozlesmeBaslangic => "sozlesme_baslangic",
            Self::Teslim => "teslim",
            Self::Yayin => "yayin",
            Self::Diger => "diger",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountKind {
    TahminiBedel,
    GeciciTeminat,
    KesinTeminat,
    CezaOrani,
    KisiSayisi,
    GunSayisi,
    OgunSayisi,
    Porsiyon,
    Gramaj,
}

impl AmountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TahminiBedel => "tahmini_bedel",
            Self::GeciciTeminat => "gecici_teminat",
            Self::KesinTeminat => "kesin_teminat",
            Self::CezaOrani => "ceza_orani",
            Self::KisiSayisi => "kisi_sayisi",
            Self::GunSayisi => "gun_sayisi",
            Self::OgunSayisi => "ogun_sayisi",
            Self::Porsiyon => "porsiyon",
            Self::Gramaj => "gramaj",
        }
    }

    pub fn is_money(&self) -> bool {
        matches!(self, Self::TahminiBedel | Self::GeciciTeminat | Self::KesinTeminat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Kurum,
    Adres,
    Telefon,
    Email,
    Ikn,
    IlanNo,
    Yetkili,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kurum => "kurum",
            Self::Adres => "adres",
            Self::Telefon => "telefon",
            Self::Email => "email",
            Self::Ikn => "ikn",
            Self::IlanNo => "ilan_no",
            Self::Yetkili => "yetkili",
        }
    }
}

/// A date found in text. `value` is ISO-8601: `YYYY-MM-DD`, or
/// `YYYY-MM-DDTHH:MM:00+03:00` when a time was present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDate {
    pub kind: DateKind,
    pub value: String,
    pub original: String,
    /// Block or table id the date was read from.
    pub source: String,
    pub confidence: f32,
}

impl ExtractedDate {
    /// Calendar date part of `value`.
    pub fn day(&self) -> Option<chrono::NaiveDate> {
        self.value
            .get(..10)
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAmount {
    pub kind: AmountKind,
    pub value: f64,
    /// ISO code for money (`TRY`, `EUR`, `USD`).
    pub currency: Option<String>,
    /// Unit keyword for quantities and `%` for rates.
    pub unit: Option<String>,
    pub original: String,
    pub source: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub kind: EntityKind,
    pub value: String,
    pub normalized: Option<String>,
    pub source: String,
    pub confidence: f32,
}

/// Everything pattern extraction found in one piece of text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMatches {
    pub dates: Vec<ExtractedDate>,
    pub amounts: Vec<ExtractedAmount>,
    pub entities: Vec<ExtractedEntity>,
}

impl PatternMatches {
    pub fn extend(&mut self, other: PatternMatches) {
        self.dates.extend(other.dates);
        self.amounts.extend(other.amounts);
        self.entities.extend(other.entities);
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.amounts.is_empty() && self.entities.is_empty()
    }
}
