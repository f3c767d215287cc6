use super::types::{
    BudgetRisk, ContextualAnalysis, ExtractedFields, MarketAnalysis, RiskLevel, Severity,
    ValidationError, ValidationResult, ValidationWarning,
};

const MIN_HEADCOUNT: u32 = 10;
const MAX_HEADCOUNT: u32 = 10_000;
const MAX_DAYS: u32 = 730;
const MIN_BUDGET: f64 = 10_000.0;
const MIN_LEAD_DAYS: i64 = 7;
const MAX_PEOPLE_PER_STAFF: f64 = 200.0;
const MAX_COST_DEVIATION: f64 = 0.5;
const BREAKDOWN_TOLERANCE: f64 = 0.10;
const LOW_PRICE_CONFIDENCE: f32 = 0.6;
/// Monthly gross cost of one catering worker, TRY.
const AVERAGE_MONTHLY_SALARY: f64 = 15_000.0;
const LABOR_TOLERANCE: f64 = 0.30;
const DEFAULT_DAYS: u32 = 365;

const MISSING_FIELD_PENALTY: i32 = 10;
const WARNING_PENALTY: i32 = 2;

#[derive(Default)]
struct Findings {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl Findings {
    fn error(&mut self, field: &str, message: impl Into<String>, severity: Severity) {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
            severity,
            source: None,
        });
    }

    fn warning(&mut self, field: &str, message: impl Into<String>, suggestion: Option<&str>) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.into(),
            suggestion: suggestion.map(str::to_string),
            source: None,
        });
    }
}

/// Required fields the score is charged for when absent.
pub fn missing_fields(fields: &ExtractedFields) -> Vec<String> {
    [
        ("kurum", fields.kurum.is_none()),
        ("ihale_tarihi", fields.ihale_tarihi.is_none()),
        ("ihale_turu", fields.ihale_turu.is_none()),
        ("kisi_sayisi", fields.kisi_sayisi.is_none()),
        ("gun_sayisi", fields.gun_sayisi.is_none()),
        ("tahmini_butce", fields.tahmini_butce.is_none()),
    ]
    .into_iter()
    .filter(|(_, missing)| *missing)
    .map(|(name, _)| name.to_string())
    .collect()
}

fn check_fields(fields: &ExtractedFields, findings: &mut Findings) {
    if fields.kurum.is_none() {
        findings.warning("kurum", "Kurum bilgisi bulunamadı", Some("İdari şartnamede idare adını kontrol edin"));
    }
    if fields.ihale_tarihi.is_none() {
        findings.error("ihale_tarihi", "İhale tarihi bulunamadı", Severity::High);
    }

    if let Some(kisi) = fields.kisi_sayisi {
        if kisi < MIN_HEADCOUNT {
            findings.warning("kisi_sayisi", format!("Kişi sayısı çok düşük: {kisi}"), Some("Değerin doğru okunduğunu kontrol edin"));
        } else if kisi > MAX_HEADCOUNT {
            findings.warning("kisi_sayisi", format!("Kişi sayısı çok yüksek: {kisi}"), Some("Değerin doğru okunduğunu kontrol edin"));
        }
    }

    if let Some(gun) = fields.gun_sayisi {
        if gun < 1 {
            findings.error("gun_sayisi", "Gün sayısı geçersiz", Severity::High);
        } else if gun > MAX_DAYS {
            findings.warning("gun_sayisi", format!("Sözleşme süresi çok uzun: {gun} gün"), None);
        }
    }

    if let Some(budget) = fields.tahmini_butce {
        if budget < MIN_BUDGET {
            findings.warning("tahmini_butce", format!("Tahmini bütçe çok düşük: {budget:.2} TL"), Some("Tutarın birimini kontrol edin"));
        }
    }

    if let (Some(tender), Some(start)) = (fields.ihale_tarihi, fields.sozlesme_baslangic) {
        let lead = (start - tender).num_days();
        if lead < 0 {
            findings.error("sozlesme_baslangic", "Sözleşme başlangıcı ihale tarihinden önce", Severity::High);
        } else if lead < MIN_LEAD_DAYS {
            findings.warning(
                "sozlesme_baslangic",
                format!("İhale ile sözleşme başlangıcı arasında yalnızca {lead} gün var"),
                Some("Hazırlık süresinin yeterliliğini değerlendirin"),
            );
        }
    }
}

fn check_contextual(fields: &ExtractedFields, contextual: &ContextualAnalysis, findings: &mut Findings) {
    let risks = &contextual.operasyonel_riskler;
    if risks.seviye == RiskLevel::Yuksek && contextual.genel_degerlendirme.puan > 80 {
        findings.warning(
            "genel_degerlendirme.puan",
            "Yüksek operasyonel risk ile yüksek genel puan çelişiyor",
            None,
        );
    }

    let staff = contextual.personel_gereksinimi.tahmini_sayi;
    if let Some(kisi) = fields.kisi_sayisi {
        if staff > 0 && f64::from(kisi) / f64::from(staff) > MAX_PEOPLE_PER_STAFF {
            findings.warning(
                "personel_gereksinimi.tahmini_sayi",
                format!("Personel başına {} kişi düşüyor, personel tahmini düşük olabilir", kisi / staff),
                None,
            );
        }
    }

    if contextual.maliyet_sapma_olasiligi.oran > MAX_COST_DEVIATION {
        findings.warning(
            "maliyet_sapma_olasiligi.oran",
            "Maliyet sapma olasılığı yüksek",
            Some("Fiyat farkı ve enflasyon maddelerini inceleyin"),
        );
    }
}

fn check_market(fields: &ExtractedFields, market: &MarketAnalysis, findings: &mut Findings) {
    if market.cost_items.is_empty() {
        findings.error("market.cost_items", "Maliyet kalemi hesaplanamadı", Severity::High);
    }
    if market.total_cost <= 0.0 {
        findings.error("market.total_cost", "Toplam maliyet sıfır veya negatif", Severity::Critical);
    }

    let breakdown_total = market.breakdown.sum();
    if market.total_cost > 0.0
        && (breakdown_total - market.total_cost).abs() / market.total_cost > BREAKDOWN_TOLERANCE
    {
        findings.warning("market.breakdown", "Maliyet dağılımı toplam maliyetle uyuşmuyor", None);
    }

    let low_confidence = market
        .cost_items
        .iter()
        .filter(|i| i.confidence < LOW_PRICE_CONFIDENCE)
        .count();
    if low_confidence > 0 {
        findings.warning(
            "market.cost_items",
            format!("{low_confidence} kalemin fiyat güvenilirliği düşük"),
            Some("Güncel piyasa fiyatlarıyla doğrulayın"),
        );
    }

    if fields.tahmini_butce.is_some() && market.comparison.risk_level == BudgetRisk::Risky {
        findings.error("market.comparison", "Hesaplanan maliyet bütçeyi aşıyor veya marj çok düşük", Severity::High);
    }
}

fn check_cross(fields: &ExtractedFields, contextual: &ContextualAnalysis, market: &MarketAnalysis, findings: &mut Findings) {
    if contextual.operasyonel_riskler.seviye == RiskLevel::Yuksek
        && market.comparison.risk_level == BudgetRisk::Safe
    {
        findings.warning(
            "risk",
            "Operasyonel risk yüksek ancak bütçe güvenli görünüyor",
            Some("Risk maliyetlerinin bütçeye yansıtıldığını kontrol edin"),
        );
    }

    let staff = contextual.personel_gereksinimi.tahmini_sayi;
    let labor = market.breakdown.labor_cost;
    if staff > 0 && labor > 0.0 {
        let months = f64::from(fields.gun_sayisi.unwrap_or(DEFAULT_DAYS)) / 30.0;
        let estimated = f64::from(staff) * AVERAGE_MONTHLY_SALARY * months;
        if (estimated - labor).abs() / labor > LABOR_TOLERANCE {
            findings.warning(
                "market.breakdown.labor_cost",
                format!("Tahmini işçilik maliyeti ({estimated:.0} TL) hesaplanan değerden ({labor:.0} TL) belirgin farklı"),
                None,
            );
        }
    }
}

fn quality_score(missing: usize, findings: &Findings) -> u32 {
    let mut score = 100i32;
    score -= MISSING_FIELD_PENALTY * missing as i32;
    score -= findings.errors.iter().map(|e| e.severity.penalty()).sum::<i32>();
    score -= WARNING_PENALTY * findings.warnings.len() as i32;
    score.clamp(0, 100) as u32
}

/// Consistency checks over the extracted fields and whichever analyses
/// succeeded. Reports problems as data and never fails.
pub fn validate(
    fields: &ExtractedFields,
    contextual: Option<&ContextualAnalysis>,
    market: Option<&MarketAnalysis>,
) -> ValidationResult {
    let mut findings = Findings::default();

    check_fields(fields, &mut findings);
    if let Some(contextual) = contextual {
        check_contextual(fields, contextual, &mut findings);
    }
    if let Some(market) = market {
        check_market(fields, market, &mut findings);
    }
    if let (Some(contextual), Some(market)) = (contextual, market) {
        check_cross(fields, contextual, market, &mut findings);
    }

    let missing = missing_fields(fields);
    let data_quality_score = quality_score(missing.len(), &findings);
    let is_valid = !findings.errors.iter().any(|e| e.severity == Severity::Critical);

    tracing::info!(
        errors = findings.errors.len(),
        warnings = findings.warnings.len(),
        score = data_quality_score,
        is_valid,
        "Validation complete"
    );

    ValidationResult {
        is_valid,
        errors: findings.errors,
        warnings: findings.warnings,
        missing_fields: missing,
        data_quality_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::contextual::default_contextual_analysis;
    use crate::analysis::market::{compare_with_budget, cost_breakdown, forecast};
    use crate::analysis::types::{CostItem, FoodCategory, ItemPrices, PriceSources, TenderType};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn complete_fields() -> ExtractedFields {
        ExtractedFields {
            kurum: Some("Ankara Büyükşehir Belediyesi".into()),
            ihale_turu: Some(TenderType::YemekHizmeti),
            ihale_tarihi: Some(day(2024, 3, 1)),
            sozlesme_baslangic: Some(day(2024, 4, 1)),
            tahmini_butce: Some(5_000_000.0),
            kisi_sayisi: Some(500),
            gun_sayisi: Some(365),
            ogun_sayisi: Some(3),
            ..ExtractedFields::default()
        }
    }

    fn item(total: f64, confidence: f32) -> CostItem {
        CostItem {
            product_key: "tavuk".into(),
            name_original: "Tavuk".into(),
            name_normalized: "tavuk".into(),
            category: FoodCategory::EtGrubu,
            unit: "kg".into(),
            quantity: 1.0,
            prices: ItemPrices::default(),
            unit_price: total,
            confidence,
            total_price: total,
            source_ref: vec!["T1:row0".into()],
        }
    }

    fn market(food: f64, budget: f64, items: Vec<CostItem>) -> MarketAnalysis {
        let breakdown = cost_breakdown(food);
        let total = breakdown.sum();
        MarketAnalysis {
            cost_items: items,
            total_cost: total,
            comparison: compare_with_budget(total, budget),
            forecast: forecast(total),
            breakdown,
            warnings: Vec::new(),
            price_sources: PriceSources::default(),
        }
    }

    #[test]
    fn complete_fields_score_full_marks() {
        let result = validate(&complete_fields(), None, None);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.missing_fields.is_empty());
        assert_eq!(result.data_quality_score, 100);
    }

    #[test]
    fn empty_fields() {
        let result = validate(&ExtractedFields::default(), None, None);
        // Six missing fields, one high error, one warning.
        assert_eq!(result.missing_fields.len(), 6);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "ihale_tarihi");
        assert_eq!(result.warnings[0].message, "Kurum bilgisi bulunamadı");
        assert_eq!(result.data_quality_score, 100 - 60 - 10 - 2);
        assert!(result.is_valid);
    }

    #[test]
    fn implausible_values() {
        let mut fields = complete_fields();
        fields.kisi_sayisi = Some(5);
        fields.gun_sayisi = Some(0);
        fields.tahmini_butce = Some(900.0);
        fields.sozlesme_baslangic = Some(day(2024, 2, 20));

        let result = validate(&fields, None, None);
        let error_fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(error_fields, vec!["gun_sayisi", "sozlesme_baslangic"]);
        assert!(result.errors.iter().all(|e| e.severity == Severity::High));
        let warning_fields: Vec<&str> = result.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(warning_fields, vec!["kisi_sayisi", "tahmini_butce"]);
    }

    #[test]
    fn short_lead_time_warns() {
        let mut fields = complete_fields();
        fields.sozlesme_baslangic = Some(day(2024, 3, 5));
        fields.gun_sayisi = Some(800);
        let result = validate(&fields, None, None);
        assert!(result.errors.is_empty());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn contextual_consistency() {
        let mut contextual = default_contextual_analysis("test");
        contextual.operasyonel_riskler.seviye = RiskLevel::Yuksek;
        contextual.genel_degerlendirme.puan = 85;
        contextual.personel_gereksinimi.tahmini_sayi = 2;
        contextual.maliyet_sapma_olasiligi.oran = 0.7;

        let result = validate(&complete_fields(), Some(&contextual), None);
        let fields: Vec<&str> = result.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "genel_degerlendirme.puan",
                "personel_gereksinimi.tahmini_sayi",
                "maliyet_sapma_olasiligi.oran"
            ]
        );
    }

    #[test]
    fn empty_market_is_critical() {
        let result = validate(&complete_fields(), None, Some(&market(0.0, 5_000_000.0, vec![])));
        assert!(!result.is_valid);
        assert!(result.errors.iter().any(|e| e.severity == Severity::Critical));
        assert!(result.errors.iter().any(|e| e.field == "market.cost_items" && e.severity == Severity::High));
    }

    #[test]
    fn risky_budget_is_an_error_only_with_budget() {
        let mut fields = complete_fields();
        fields.tahmini_butce = Some(100_000.0);
        let over = market(100_000.0, 100_000.0, vec![item(100_000.0, 0.4)]);
        let result = validate(&fields, None, Some(&over));
        assert!(result.errors.iter().any(|e| e.field == "market.comparison"));
        assert!(result.warnings.iter().any(|w| w.message == "1 kalemin fiyat güvenilirliği düşük"));
        assert!(result.is_valid);

        fields.tahmini_butce = None;
        let result = validate(&fields, None, Some(&over));
        assert!(!result.errors.iter().any(|e| e.field == "market.comparison"));
    }

    #[test]
    fn breakdown_drift_warns() {
        let mut analysis = market(100_000.0, 5_000_000.0, vec![item(100_000.0, 0.8)]);
        analysis.total_cost = 100_000.0;
        let result = validate(&complete_fields(), None, Some(&analysis));
        assert!(result.warnings.iter().any(|w| w.field == "market.breakdown"));
    }

    #[test]
    fn cross_checks() {
        let mut contextual = default_contextual_analysis("test");
        contextual.operasyonel_riskler.seviye = RiskLevel::Yuksek;
        contextual.genel_degerlendirme.puan = 50;
        // 10 staff x 15000 x 365/30 = 1.825M, far above 35% of 100k.
        contextual.personel_gereksinimi.tahmini_sayi = 10;
        contextual.maliyet_sapma_olasiligi.oran = 0.2;
        let analysis = market(100_000.0, 5_000_000.0, vec![item(100_000.0, 0.8)]);
        assert_eq!(analysis.comparison.risk_level, BudgetRisk::Safe);

        let result = validate(&complete_fields(), Some(&contextual), Some(&analysis));
        let fields: Vec<&str> = result.warnings.iter().map(|w| w.field.as_str()).collect();
        assert_eq!(fields, vec!["risk", "market.breakdown.labor_cost"]);
    }

    #[test]
    fn score_is_clamped_and_validity_tracks_critical() {
        let mut fields = ExtractedFields::default();
        fields.kisi_sayisi = Some(1);
        fields.gun_sayisi = Some(0);
        let analysis = market(0.0, 0.0, vec![]);
        let result = validate(&fields, Some(&default_contextual_analysis("x")), Some(&analysis));
        assert_eq!(result.data_quality_score, 0);
        assert_eq!(
            result.is_valid,
            !result.errors.iter().any(|e| e.severity == Severity::Critical)
        );
        assert!(!result.is_valid);
    }
}
