use super::types::{AnalysisScores, BudgetRisk, ContextualAnalysis, MarketAnalysis, ValidationResult};

/// Used for any score whose input stage is missing.
const NEUTRAL: u32 = 50;

fn feasibility(risk: BudgetRisk) -> u32 {
    match risk {
        BudgetRisk::Safe => 80,
        BudgetRisk::Tight => 50,
        BudgetRisk::Risky => 20,
    }
}

/// Headline scores from whichever stages produced real results.
pub fn compute_scores(
    contextual: Option<&ContextualAnalysis>,
    market: Option<&MarketAnalysis>,
    validation: Option<&ValidationResult>,
) -> AnalysisScores {
    AnalysisScores {
        risk: contextual
            .map(|c| 100u32.saturating_sub(c.operasyonel_riskler.skor))
            .unwrap_or(NEUTRAL),
        opportunity: contextual
            .map(|c| c.genel_degerlendirme.puan.min(100))
            .unwrap_or(NEUTRAL),
        feasibility: market
            .map(|m| feasibility(m.comparison.risk_level))
            .unwrap_or(NEUTRAL),
        confidence: validation.map(|v| v.data_quality_score).unwrap_or(NEUTRAL),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::contextual::default_contextual_analysis;

    #[test]
    fn neutral_without_inputs() {
        let scores = compute_scores(None, None, None);
        assert_eq!(
            scores,
            AnalysisScores {
                risk: 50,
                opportunity: 50,
                feasibility: 50,
                confidence: 50
            }
        );
    }

    #[test]
    fn derived_from_contextual_and_validation() {
        let mut contextual = default_contextual_analysis("x");
        contextual.operasyonel_riskler.skor = 30;
        contextual.genel_degerlendirme.puan = 72;
        let validation = ValidationResult {
            is_valid: true,
            errors: vec![],
            warnings: vec![],
            missing_fields: vec![],
            data_quality_score: 88,
        };

        let scores = compute_scores(Some(&contextual), None, Some(&validation));
        assert_eq!(scores.risk, 70);
        assert_eq!(scores.opportunity, 72);
        assert_eq!(scores.feasibility, 50);
        assert_eq!(scores.confidence, 88);
    }

    #[test]
    fn feasibility_tiers() {
        assert_eq!(feasibility(BudgetRisk::Safe), 80);
        assert_eq!(feasibility(BudgetRisk::Tight), 50);
        assert_eq!(feasibility(BudgetRisk::Risky), 20);
    }
}
