//! Push-style updates for a live view of a running analysis. The engine
//! only ever writes to the sink.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::{AnalysisScores, AnalysisStatus, ContextualAnalysis, MarketAnalysis, RiskLevel, SourcedStatement, Trend};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFinding {
    pub text: String,
    pub sources: Vec<String>,
}

fn summarize(statements: &[SourcedStatement]) -> SummaryFinding {
    SummaryFinding {
        text: statements.first().map(|s| s.text.clone()).unwrap_or_default(),
        sources: statements.iter().flat_map(|s| s.source_ref.iter().cloned()).collect(),
    }
}

/// Flattened contextual result for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualSummary {
    pub risk_level: RiskLevel,
    pub risk_reasons: Vec<String>,
    pub risk: SummaryFinding,
    pub cost_deviation: f64,
    pub cost: SummaryFinding,
    pub time_adequate: bool,
    pub time: SummaryFinding,
    pub recommendation: String,
}

impl From<&ContextualAnalysis> for ContextualSummary {
    fn from(c: &ContextualAnalysis) -> Self {
        Self {
            risk_level: c.operasyonel_riskler.seviye,
            risk_reasons: c.operasyonel_riskler.nedenler.iter().map(|s| s.text.clone()).collect(),
            risk: summarize(&c.operasyonel_riskler.nedenler),
            cost_deviation: c.maliyet_sapma_olasiligi.oran,
            cost: summarize(&c.maliyet_sapma_olasiligi.faktorler),
            time_adequate: c.zaman_uygunlugu.yeterli,
            time: summarize(&c.zaman_uygunlugu.gun_analizi),
            recommendation: c.genel_degerlendirme.ozet.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub product_key: String,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub total_price: f64,
    pub confidence: f32,
    pub source_mix: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub cost_items: Vec<CostLine>,
    pub total_cost: f64,
    pub next_month_total: f64,
    pub forecast_confidence: f32,
    pub trend: Trend,
}

impl From<&MarketAnalysis> for MarketSummary {
    fn from(m: &MarketAnalysis) -> Self {
        let cost_items = m
            .cost_items
            .iter()
            .map(|item| {
                let prices = &item.prices;
                let source_mix = [
                    ("tuik", prices.tuik.is_some()),
                    ("web", prices.web.is_some()),
                    ("db", prices.db.is_some()),
                    ("manual", prices.manual.is_some()),
                ]
                .into_iter()
                .filter(|(_, used)| *used)
                .map(|(name, _)| name.to_string())
                .collect();
                CostLine {
                    product_key: item.product_key.clone(),
                    name: item.name_normalized.clone(),
                    unit: item.unit.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    confidence: item.confidence,
                    source_mix,
                }
            })
            .collect();

        Self {
            cost_items,
            total_cost: m.total_cost,
            next_month_total: m.forecast.next_month,
            forecast_confidence: m.forecast.confidence,
            trend: m.forecast.trend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisUpdate {
    pub status: AnalysisStatus,
    pub scores: Option<AnalysisScores>,
    pub degraded_stages: Vec<String>,
}

pub trait LiveUpdateSink: Send + Sync {
    fn set_contextual_analysis(&self, analysis_id: &str, summary: &ContextualSummary);

    fn set_market_analysis(&self, analysis_id: &str, summary: &MarketSummary);

    fn update_analysis(&self, analysis_id: &str, update: &AnalysisUpdate);
}

/// Logs every update; the CLI's sink.
pub struct TracingNotifier;

impl LiveUpdateSink for TracingNotifier {
    fn set_contextual_analysis(&self, analysis_id: &str, summary: &ContextualSummary) {
        tracing::info!(
            analysis_id,
            risk = summary.risk_level.as_str(),
            reasons = summary.risk_reasons.len(),
            "Contextual analysis ready"
        );
    }

    fn set_market_analysis(&self, analysis_id: &str, summary: &MarketSummary) {
        tracing::info!(
            analysis_id,
            items = summary.cost_items.len(),
            total_cost = summary.total_cost,
            "Market analysis ready"
        );
    }

    fn update_analysis(&self, analysis_id: &str, update: &AnalysisUpdate) {
        tracing::info!(analysis_id, status = ?update.status, scores = ?update.scores, "Analysis updated");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiveUpdate {
    Contextual(String, ContextualSummary),
    Market(String, MarketSummary),
    Analysis(String, AnalysisUpdate),
}

/// Keeps every update in order, for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<LiveUpdate>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LiveUpdate> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn record(&self, event: LiveUpdate) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl LiveUpdateSink for RecordingNotifier {
    fn set_contextual_analysis(&self, analysis_id: &str, summary: &ContextualSummary) {
        self.record(LiveUpdate::Contextual(analysis_id.to_string(), summary.clone()));
    }

    fn set_market_analysis(&self, analysis_id: &str, summary: &MarketSummary) {
        self.record(LiveUpdate::Market(analysis_id.to_string(), summary.clone()));
    }

    fn update_analysis(&self, analysis_id: &str, update: &AnalysisUpdate) {
        self.record(LiveUpdate::Analysis(analysis_id.to_string(), update.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::contextual::default_contextual_analysis;

    #[test]
    fn contextual_summary_flattens_statements() {
        let mut c = default_contextual_analysis("x");
        c.operasyonel_riskler.nedenler = vec![
            SourcedStatement::new("Gecikme cezası ağır", vec!["A:1.1".into()], 0.9),
            SourcedStatement::new("Ölçek büyük", vec!["T1".into(), "T1:row0".into()], 0.8),
        ];
        let summary = ContextualSummary::from(&c);
        assert_eq!(summary.risk_reasons.len(), 2);
        assert_eq!(summary.risk.text, "Gecikme cezası ağır");
        assert_eq!(summary.risk.sources, vec!["A:1.1", "T1", "T1:row0"]);
        assert_eq!(summary.cost.text, "");
        assert!(summary.recommendation.starts_with("Analiz tamamlanamadı"));
    }

    #[test]
    fn recorder_keeps_order() {
        let notifier = RecordingNotifier::new();
        let c = default_contextual_analysis("x");
        notifier.set_contextual_analysis("a1", &ContextualSummary::from(&c));
        notifier.update_analysis(
            "a1",
            &AnalysisUpdate {
                status: AnalysisStatus::Completed,
                scores: None,
                degraded_stages: vec![],
            },
        );

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], LiveUpdate::Contextual(id, _) if id == "a1"));
        assert!(matches!(&events[1], LiveUpdate::Analysis(_, u) if u.status == AnalysisStatus::Completed));
    }
}
