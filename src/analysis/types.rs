use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::datapool::DataPool;

/// A claim together with the block, table or row ids it rests on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcedStatement {
    pub text: String,
    #[serde(default)]
    pub source_ref: Vec<String>,
    #[serde(default = "default_statement_confidence")]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

fn default_statement_confidence() -> f32 {
    0.5
}

impl SourcedStatement {
    pub fn new(text: impl Into<String>, source_ref: Vec<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            source_ref,
            confidence,
            context: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderType {
    HizmetAlimi,
    MalAlimi,
    YapimIsi,
    YemekHizmeti,
    Catering,
}

impl TenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HizmetAlimi => "hizmet_alimi",
            Self::MalAlimi => "mal_alimi",
            Self::YapimIsi => "yapim_isi",
            Self::YemekHizmeti => "yemek_hizmeti",
            Self::Catering => "catering",
        }
    }
}

/// Tender facts read straight off the DataPool, no model involved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub kurum: Option<String>,
    pub kurum_adres: Option<String>,
    pub ihale_turu: Option<TenderType>,
    pub ihale_no: Option<String>,
    pub ikn: Option<String>,
    pub ihale_tarihi: Option<NaiveDate>,
    pub son_teklif_tarihi: Option<NaiveDate>,
    pub sozlesme_baslangic: Option<NaiveDate>,
    pub tahmini_butce: Option<f64>,
    pub gecici_teminat: Option<f64>,
    pub kesin_teminat: Option<f64>,
    pub kisi_sayisi: Option<u32>,
    pub gun_sayisi: Option<u32>,
    pub ogun_sayisi: Option<u32>,
    pub cezai_sartlar: Vec<SourcedStatement>,
}

// ---------------------------------------------------------------------------
// Contextual analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "düşük")]
    Dusuk,
    Orta,
    #[serde(alias = "yüksek")]
    Yuksek,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dusuk => "dusuk",
            Self::Orta => "orta",
            Self::Yuksek => "yuksek",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalRisks {
    pub seviye: RiskLevel,
    #[serde(default)]
    pub nedenler: Vec<SourcedStatement>,
    /// 0-100, higher is riskier.
    pub skor: u32,
    #[serde(default)]
    pub onlemler: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDeviation {
    /// Probability in [0, 1].
    pub oran: f64,
    #[serde(default)]
    pub faktorler: Vec<SourcedStatement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tahmini_sapma_miktari: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalDate {
    pub tarih: String,
    pub aciklama: String,
    #[serde(default)]
    pub kaynak: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAdequacy {
    pub yeterli: bool,
    #[serde(default)]
    pub gun_analizi: Vec<SourcedStatement>,
    #[serde(default)]
    pub kritik_tarihler: Vec<CriticalDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffRequirement {
    pub tahmini_sayi: u32,
    #[serde(default)]
    pub detay: Vec<SourcedStatement>,
    #[serde(default)]
    pub kritik_pozisyonlar: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentNeeds {
    #[serde(default)]
    pub kritik_ekipmanlar: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tahmini_maliyet: Option<f64>,
    #[serde(default)]
    pub kaynak: Vec<SourcedStatement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    /// 0-100, higher is a better opportunity.
    pub puan: u32,
    pub ozet: String,
    #[serde(default)]
    pub oneriler: Vec<String>,
}

/// Model-produced reading of the tender. Field names are the JSON contract
/// the prompt asks the model to answer in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualAnalysis {
    pub operasyonel_riskler: OperationalRisks,
    pub maliyet_sapma_olasiligi: CostDeviation,
    pub zaman_uygunlugu: TimeAdequacy,
    pub personel_gereksinimi: StaffRequirement,
    pub ekipman_ihtiyaci: EquipmentNeeds,
    pub genel_degerlendirme: OverallAssessment,
}

impl ContextualAnalysis {
    /// Every statement in the analysis, for provenance passes.
    pub fn statements_mut(&mut self) -> impl Iterator<Item = &mut SourcedStatement> {
        self.operasyonel_riskler
            .nedenler
            .iter_mut()
            .chain(self.maliyet_sapma_olasiligi.faktorler.iter_mut())
            .chain(self.zaman_uygunlugu.gun_analizi.iter_mut())
            .chain(self.personel_gereksinimi.detay.iter_mut())
            .chain(self.ekipman_ihtiyaci.kaynak.iter_mut())
    }

    pub fn statements(&self) -> impl Iterator<Item = &SourcedStatement> {
        self.operasyonel_riskler
            .nedenler
            .iter()
            .chain(self.maliyet_sapma_olasiligi.faktorler.iter())
            .chain(self.zaman_uygunlugu.gun_analizi.iter())
            .chain(self.personel_gereksinimi.detay.iter())
            .chain(self.ekipman_ihtiyaci.kaynak.iter())
    }
}

// ---------------------------------------------------------------------------
// Market analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    EtGrubu,
    TahilGrubu,
    Baklagil,
    Sebze,
    YagGrubu,
    SutGrubu,
    Diger,
}

impl FoodCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EtGrubu => "et_grubu",
            Self::TahilGrubu => "tahil_grubu",
            Self::Baklagil => "baklagil",
            Self::Sebze => "sebze",
            Self::YagGrubu => "yag_grubu",
            Self::SutGrubu => "sut_grubu",
            Self::Diger => "diger",
        }
    }

    /// Grams per person per meal when the documents give no portion.
    pub fn default_portion_grams(&self) -> f64 {
        match self {
            Self::EtGrubu => 120.0,
            Self::TahilGrubu => 80.0,
            Self::Baklagil => 60.0,
            Self::Sebze => 150.0,
            Self::YagGrubu => 20.0,
            Self::SutGrubu => 200.0,
            Self::Diger => 50.0,
        }
    }
}

/// A menu line as found in the documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub portion: Option<f64>,
    pub unit: Option<String>,
    /// Table row (`T1:row0`) or block id the item was read from.
    pub source_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceData {
    pub value: f64,
    pub currency: String,
    pub date: NaiveDate,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPrices {
    pub tuik: Option<PriceData>,
    pub web: Option<PriceData>,
    pub db: Option<PriceData>,
    pub manual: Option<PriceData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    pub product_key: String,
    pub name_original: String,
    pub name_normalized: String,
    pub category: FoodCategory,
    pub unit: String,
    /// Total quantity over the contract, in `unit`.
    pub quantity: f64,
    pub prices: ItemPrices,
    pub unit_price: f64,
    pub confidence: f32,
    pub total_price: f64,
    pub source_ref: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub food_cost: f64,
    pub labor_cost: f64,
    pub operational_cost: f64,
    pub overhead: f64,
    pub profit_margin: f64,
}

impl CostBreakdown {
    pub fn sum(&self) -> f64 {
        self.food_cost + self.labor_cost + self.operational_cost + self.overhead + self.profit_margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub current: f64,
    pub next_month: f64,
    pub next_quarter: f64,
    pub trend: Trend,
    pub seasonal_factor: f64,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRisk {
    Safe,
    Tight,
    Risky,
}

impl BudgetRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Tight => "tight",
            Self::Risky => "risky",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetComparison {
    pub budget: f64,
    pub calculated_cost: f64,
    pub difference: f64,
    pub margin_percentage: f64,
    pub risk_level: BudgetRisk,
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSources {
    pub tuik_used: bool,
    pub web_used: bool,
    pub db_used: bool,
    pub manual_used: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketAnalysis {
    pub cost_items: Vec<CostItem>,
    pub total_cost: f64,
    pub breakdown: CostBreakdown,
    pub forecast: Forecast,
    pub comparison: BudgetComparison,
    pub warnings: Vec<String>,
    pub price_sources: PriceSources,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Points taken off the data-quality score per error.
    pub fn penalty(&self) -> i32 {
        match self {
            Self::Critical => 20,
            Self::High => 10,
            Self::Medium => 5,
            Self::Low => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: Severity,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub missing_fields: Vec<String>,
    pub data_quality_score: u32,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Result of a stage that never fails outright: either the real value or a
/// documented fallback together with why it was used.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ok(T),
    Degraded { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStage {
    Extraction,
    Contextual,
    Market,
    Validation,
    Deep,
    Done,
}

impl AnalysisStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Contextual => "contextual",
            Self::Market => "market",
            Self::Validation => "validation",
            Self::Deep => "deep",
            Self::Done => "done",
        }
    }
}

/// Per-run stage switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub enable_contextual: bool,
    pub enable_market: bool,
    pub enable_deep: bool,
    pub parallel_processing: bool,
    pub save_to_db: bool,
    pub generate_report: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            enable_contextual: true,
            enable_market: true,
            enable_deep: false,
            parallel_processing: true,
            save_to_db: true,
            generate_report: false,
        }
    }
}

/// Headline numbers for downstream consumers, each 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisScores {
    pub risk: u32,
    pub opportunity: u32,
    pub feasibility: u32,
    pub confidence: u32,
}

/// A stage that returned its fallback value instead of a real result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedStage {
    pub stage: AnalysisStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenderAnalysisResult {
    pub analysis_id: String,
    pub created_at: DateTime<Utc>,
    pub status: AnalysisStatus,
    pub current_stage: AnalysisStage,
    pub data_pool: DataPool,
    pub extracted_fields: ExtractedFields,
    pub contextual: Option<ContextualAnalysis>,
    pub market: Option<MarketAnalysis>,
    pub validation: Option<ValidationResult>,
    pub scores: Option<AnalysisScores>,
    pub degraded: Vec<DegradedStage>,
    pub processing_time_ms: u64,
    /// Stage-level failures that left the result incomplete.
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub report: Option<String>,
}

impl TenderAnalysisResult {
    pub fn new(analysis_id: &str, data_pool: DataPool) -> Self {
        Self {
            analysis_id: analysis_id.to_string(),
            created_at: Utc::now(),
            status: AnalysisStatus::Pending,
            current_stage: AnalysisStage::Extraction,
            data_pool,
            extracted_fields: ExtractedFields::default(),
            contextual: None,
            market: None,
            validation: None,
            scores: None,
            degraded: Vec::new(),
            processing_time_ms: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            report: None,
        }
    }

    pub fn is_degraded(&self, stage: AnalysisStage) -> bool {
        self.degraded.iter().any(|d| d.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_accepts_turkish_spelling() {
        let level: RiskLevel = serde_json::from_str("\"yüksek\"").unwrap();
        assert_eq!(level, RiskLevel::Yuksek);
        let level: RiskLevel = serde_json::from_str("\"dusuk\"").unwrap();
        assert_eq!(level, RiskLevel::Dusuk);
        assert_eq!(serde_json::to_string(&RiskLevel::Orta).unwrap(), "\"orta\"");
    }

    #[test]
    fn statement_defaults() {
        let s: SourcedStatement = serde_json::from_str(r#"{"text": "Gecikme cezası yüksek"}"#).unwrap();
        assert!(s.source_ref.is_empty());
        assert_eq!(s.confidence, 0.5);
        assert!(s.context.is_none());
    }

    #[test]
    fn stage_outcome_accessors() {
        let ok: StageOutcome<u32> = StageOutcome::Ok(3);
        assert!(!ok.is_degraded());
        assert_eq!(ok.reason(), None);
        assert_eq!(*ok.value(), 3);

        let degraded = StageOutcome::degraded(0u32, "timeout");
        assert!(degraded.is_degraded());
        assert_eq!(degraded.reason(), Some("timeout"));
        assert_eq!(degraded.into_value(), 0);
    }

    #[test]
    fn analysis_option_defaults() {
        let options = AnalysisOptions::default();
        assert!(options.enable_contextual && options.enable_market);
        assert!(!options.enable_deep);
        assert!(options.parallel_processing && options.save_to_db);
        assert!(!options.generate_report);

        let partial: AnalysisOptions = serde_json::from_str(r#"{"enable_market": false}"#).unwrap();
        assert!(!partial.enable_market);
        assert!(partial.enable_contextual);
    }

    #[test]
    fn breakdown_sum() {
        let b = CostBreakdown {
            food_cost: 100.0,
            labor_cost: 35.0,
            operational_cost: 20.0,
            overhead: 15.0,
            profit_margin: 10.0,
        };
        assert_eq!(b.sum(), 180.0);
    }

    #[test]
    fn result_serializes_status_lowercase() {
        let result = TenderAnalysisResult::new("a1", DataPool::default());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["current_stage"], "extraction");
    }
}
