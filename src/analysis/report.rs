use std::fmt::Write;

use super::types::{SourcedStatement, TenderAnalysisResult};

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

fn money(value: f64) -> String {
    format!("{value:.2} TL")
}

fn statements(out: &mut String, items: &[SourcedStatement]) {
    for s in items {
        if s.source_ref.is_empty() {
            let _ = writeln!(out, "- {}", s.text);
        } else {
            let _ = writeln!(out, "- {} _({})_", s.text, s.source_ref.join(", "));
        }
    }
}

/// Markdown summary of a finished analysis.
pub fn render_report(result: &TenderAnalysisResult) -> String {
    let mut out = String::new();
    let fields = &result.extracted_fields;

    let _ = writeln!(out, "# İhale Analiz Raporu\n");
    let _ = writeln!(out, "- Analiz: `{}`", result.analysis_id);
    let _ = writeln!(out, "- Tarih: {}", result.created_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out, "- Doküman sayısı: {}", result.data_pool.documents.len());
    let _ = writeln!(out, "- Süre: {} ms\n", result.processing_time_ms);

    let _ = writeln!(out, "## Temel Bilgiler\n");
    let _ = writeln!(out, "| Alan | Değer |\n|---|---|");
    let _ = writeln!(out, "| Kurum | {} |", opt(fields.kurum.as_deref()));
    let _ = writeln!(out, "| İKN | {} |", opt(fields.ikn.as_deref()));
    let _ = writeln!(out, "| İhale türü | {} |", opt(fields.ihale_turu.map(|t| t.as_str())));
    let _ = writeln!(out, "| İhale tarihi | {} |", opt(fields.ihale_tarihi));
    let _ = writeln!(out, "| Sözleşme başlangıcı | {} |", opt(fields.sozlesme_baslangic));
    let _ = writeln!(out, "| Tahmini bütçe | {} |", opt(fields.tahmini_butce.map(money)));
    let _ = writeln!(out, "| Kişi / gün / öğün | {} / {} / {} |\n",
        opt(fields.kisi_sayisi), opt(fields.gun_sayisi), opt(fields.ogun_sayisi));

    if !fields.cezai_sartlar.is_empty() {
        let _ = writeln!(out, "### Cezai Şartlar\n");
        statements(&mut out, &fields.cezai_sartlar);
        out.push('\n');
    }

    if let Some(scores) = &result.scores {
        let _ = writeln!(out, "## Skorlar\n");
        let _ = writeln!(
            out,
            "- Risk: {}\n- Fırsat: {}\n- Yapılabilirlik: {}\n- Güven: {}\n",
            scores.risk, scores.opportunity, scores.feasibility, scores.confidence
        );
    }

    if let Some(c) = &result.contextual {
        let _ = writeln!(out, "## Bağlamsal Analiz\n");
        if let Some(d) = result.degraded.iter().find(|d| d.stage == super::AnalysisStage::Contextual) {
            let _ = writeln!(out, "> Varsayılan değerler kullanıldı: {}\n", d.reason);
        }
        let _ = writeln!(
            out,
            "- Operasyonel risk: **{}** (skor {})",
            c.operasyonel_riskler.seviye.as_str(),
            c.operasyonel_riskler.skor
        );
        statements(&mut out, &c.operasyonel_riskler.nedenler);
        let _ = writeln!(out, "- Maliyet sapma olasılığı: {:.0}%", c.maliyet_sapma_olasiligi.oran * 100.0);
        statements(&mut out, &c.maliyet_sapma_olasiligi.faktorler);
        let _ = writeln!(
            out,
            "- Zaman: {}",
            if c.zaman_uygunlugu.yeterli { "yeterli" } else { "yetersiz" }
        );
        statements(&mut out, &c.zaman_uygunlugu.gun_analizi);
        let _ = writeln!(out, "- Tahmini personel: {}", c.personel_gereksinimi.tahmini_sayi);
        let _ = writeln!(out, "\n**Genel puan:** {}/100\n", c.genel_degerlendirme.puan);
        let _ = writeln!(out, "{}\n", c.genel_degerlendirme.ozet);
        for tip in &c.genel_degerlendirme.oneriler {
            let _ = writeln!(out, "- {tip}");
        }
        out.push('\n');
    }

    if let Some(m) = &result.market {
        let _ = writeln!(out, "## Maliyet Analizi\n");
        let _ = writeln!(out, "| Ürün | Miktar (kg) | Birim fiyat | Toplam |\n|---|---|---|---|");
        for item in &m.cost_items {
            let _ = writeln!(
                out,
                "| {} | {:.2} | {} | {} |",
                item.name_normalized,
                item.quantity,
                money(item.unit_price),
                money(item.total_price)
            );
        }
        let _ = writeln!(out, "\n- Gıda maliyeti: {}", money(m.breakdown.food_cost));
        let _ = writeln!(out, "- İşçilik: {}", money(m.breakdown.labor_cost));
        let _ = writeln!(out, "- Toplam maliyet: **{}**", money(m.total_cost));
        let _ = writeln!(
            out,
            "- Bütçe marjı: {:.1}% ({}): {}\n",
            m.comparison.margin_percentage,
            m.comparison.risk_level.as_str(),
            m.comparison.recommendation
        );
        for warning in &m.warnings {
            let _ = writeln!(out, "- ⚠ {warning}");
        }
        out.push('\n');
    }

    if let Some(v) = &result.validation {
        let _ = writeln!(out, "## Doğrulama\n");
        let _ = writeln!(
            out,
            "- Geçerli: {}\n- Veri kalitesi: {}/100",
            if v.is_valid { "evet" } else { "hayır" },
            v.data_quality_score
        );
        if !v.missing_fields.is_empty() {
            let _ = writeln!(out, "- Eksik alanlar: {}", v.missing_fields.join(", "));
        }
        for e in &v.errors {
            let _ = writeln!(out, "- Hata ({:?}): {}", e.severity, e.message);
        }
        for w in &v.warnings {
            let _ = writeln!(out, "- Uyarı: {}", w.message);
        }
        out.push('\n');
    }

    if !result.errors.is_empty() || !result.warnings.is_empty() {
        let _ = writeln!(out, "## Notlar\n");
        for e in &result.errors {
            let _ = writeln!(out, "- Hata: {e}");
        }
        for w in &result.warnings {
            let _ = writeln!(out, "- {w}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::contextual::default_contextual_analysis;
    use crate::analysis::types::{AnalysisStage, DegradedStage};
    use crate::pipeline::datapool::DataPool;

    #[test]
    fn report_sections_follow_available_results() {
        let mut result = TenderAnalysisResult::new("a1", DataPool::default());
        result.extracted_fields.kurum = Some("Çankaya Belediyesi".into());
        let report = render_report(&result);
        assert!(report.starts_with("# İhale Analiz Raporu"));
        assert!(report.contains("| Kurum | Çankaya Belediyesi |"));
        assert!(report.contains("| İKN | - |"));
        assert!(!report.contains("## Bağlamsal Analiz"));
        assert!(!report.contains("## Maliyet Analizi"));

        result.contextual = Some(default_contextual_analysis("timeout"));
        result.degraded.push(DegradedStage {
            stage: AnalysisStage::Contextual,
            reason: "timeout".into(),
        });
        let report = render_report(&result);
        assert!(report.contains("## Bağlamsal Analiz"));
        assert!(report.contains("> Varsayılan değerler kullanıldı: timeout"));
        assert!(report.contains("Analiz tamamlanamadı: timeout"));
    }
}
