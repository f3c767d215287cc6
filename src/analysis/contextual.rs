use std::sync::Arc;

use super::types::{
    ContextualAnalysis, CostDeviation, EquipmentNeeds, ExtractedFields, OperationalRisks,
    OverallAssessment, RiskLevel, StaffRequirement, StageOutcome, TimeAdequacy,
};
use super::AnalysisError;
use crate::pipeline::datapool::{is_resolvable, source_context, DataPool};
use crate::pipeline::extraction::turkish_lowercase;
use crate::pipeline::llm::{parse_json_response, LlmClient};

const KEY_BLOCK_KEYWORDS: &[&str] = &["şart", "ceza", "personel", "ekipman", "teslim", "risk"];
const MAX_KEY_BLOCKS: usize = 10;
const MAX_TABLES: usize = 5;
const BLOCK_EXCERPT_CHARS: usize = 300;
const STATEMENT_CONTEXT_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "Sen kamu ihalelerinde uzman bir analistsin. Yalnızca istenen JSON \
nesnesiyle yanıt ver; açıklama veya markdown ekleme.";

const RESPONSE_CONTRACT: &str = r#"{
  "operasyonel_riskler": {
    "seviye": "dusuk | orta | yuksek",
    "nedenler": [{"text": "...", "source_ref": ["A:1.0"], "confidence": 0.9}],
    "skor": 0,
    "onlemler": ["..."]
  },
  "maliyet_sapma_olasiligi": {
    "oran": 0.0,
    "faktorler": [{"text": "...", "source_ref": ["T1"], "confidence": 0.8}],
    "tahmini_sapma_miktari": 0
  },
  "zaman_uygunlugu": {
    "yeterli": true,
    "gun_analizi": [{"text": "...", "source_ref": ["A:2.3"], "confidence": 0.9}],
    "kritik_tarihler": [{"tarih": "YYYY-MM-DD", "aciklama": "...", "kaynak": "A:2.3"}]
  },
  "personel_gereksinimi": {
    "tahmini_sayi": 0,
    "detay": [{"text": "...", "source_ref": ["B:0.4"], "confidence": 0.8}],
    "kritik_pozisyonlar": ["..."]
  },
  "ekipman_ihtiyaci": {
    "kritik_ekipmanlar": ["..."],
    "tahmini_maliyet": 0,
    "kaynak": [{"text": "...", "source_ref": ["B:1.2"], "confidence": 0.8}]
  },
  "genel_degerlendirme": {
    "puan": 0,
    "ozet": "...",
    "oneriler": ["..."]
  }
}"#;

/// Bounded context for the model: extracted fields, keyword-matched block
/// excerpts and table summaries, each tagged with its id.
pub fn build_context(pool: &DataPool, fields: &ExtractedFields) -> Result<String, AnalysisError> {
    let mut context = String::from("## EXTRACTED FIELDS:\n");
    context.push_str(&serde_json::to_string_pretty(fields)?);
    context.push_str("\n\n## KEY TEXT BLOCKS:\n");

    let key_blocks = pool
        .text_blocks
        .iter()
        .filter(|block| {
            let lower = turkish_lowercase(&block.text);
            KEY_BLOCK_KEYWORDS.iter().any(|k| lower.contains(k))
        })
        .take(MAX_KEY_BLOCKS);
    for block in key_blocks {
        let excerpt: String = block.text.chars().take(BLOCK_EXCERPT_CHARS).collect();
        context.push_str(&format!("[{}]: {}...\n\n", block.block_id, excerpt));
    }

    if !pool.tables.is_empty() {
        context.push_str("## TABLES:\n");
        for table in pool.tables.iter().take(MAX_TABLES) {
            context.push_str(&format!(
                "[{}]: {}\nRows: {}\n\n",
                table.table_id,
                table.headers.join(" | "),
                table.rows.len()
            ));
        }
    }

    Ok(context)
}

pub fn build_prompt(context: &str) -> String {
    format!(
        "Aşağıdaki ihale dokümanlarından çıkarılan bilgileri incele ve risk/fırsat değerlendirmesi yap.\n\n\
{context}\n\
Değerlendirilecek başlıklar:\n\
1. Operasyonel riskler (personel, ekipman, lojistik); seviye dusuk, orta veya yuksek; skor 0-100.\n\
2. Maliyet sapma olasılığı (0-1 arası oran) ve sapma faktörleri.\n\
3. Zaman uygunluğu: hazırlık süresi yeterli mi, kritik tarihler.\n\
4. Personel gereksinimi: tahmini sayı ve kritik pozisyonlar.\n\
5. Ekipman ihtiyacı: kritik ekipmanlar ve tahmini maliyet.\n\
6. Genel değerlendirme: 0-100 puan, özet ve öneriler.\n\n\
Her tespit için source_ref alanına yukarıdaki köşeli parantezli kimliklerden en az birini yaz \
(örn. \"A:1.0\", \"T1\" veya \"T1:row2\"). Kimliği olmayan bilgi uydurma.\n\n\
Yanıtı yalnızca şu JSON biçiminde ver:\n{RESPONSE_CONTRACT}\n"
    )
}

/// Fixed fallback when the model cannot produce a usable answer.
pub fn default_contextual_analysis(reason: &str) -> ContextualAnalysis {
    ContextualAnalysis {
        operasyonel_riskler: OperationalRisks {
            seviye: RiskLevel::Orta,
            nedenler: Vec::new(),
            skor: 50,
            onlemler: Vec::new(),
        },
        maliyet_sapma_olasiligi: CostDeviation {
            oran: 0.5,
            faktorler: Vec::new(),
            tahmini_sapma_miktari: None,
        },
        zaman_uygunlugu: TimeAdequacy {
            yeterli: false,
            gun_analizi: Vec::new(),
            kritik_tarihler: Vec::new(),
        },
        personel_gereksinimi: StaffRequirement {
            tahmini_sayi: 0,
            detay: Vec::new(),
            kritik_pozisyonlar: Vec::new(),
        },
        ekipman_ihtiyaci: EquipmentNeeds {
            kritik_ekipmanlar: Vec::new(),
            tahmini_maliyet: None,
            kaynak: Vec::new(),
        },
        genel_degerlendirme: OverallAssessment {
            puan: 0,
            ozet: format!("Analiz tamamlanamadı: {reason}"),
            oneriler: Vec::new(),
        },
    }
}

/// Drop references the DataPool cannot resolve, fill missing statement
/// context from the first surviving reference, and clamp scores.
pub fn ground_analysis(analysis: &mut ContextualAnalysis, pool: &DataPool) {
    let mut dropped = 0usize;
    for statement in analysis.statements_mut() {
        let before = statement.source_ref.len();
        statement.source_ref.retain(|id| is_resolvable(pool, id));
        dropped += before - statement.source_ref.len();

        if statement.context.is_none() {
            statement.context = statement
                .source_ref
                .first()
                .and_then(|id| source_context(pool, id, STATEMENT_CONTEXT_CHARS));
        }
        statement.confidence = statement.confidence.clamp(0.0, 1.0);
    }
    for date in &mut analysis.zaman_uygunlugu.kritik_tarihler {
        if !date.kaynak.is_empty() && !is_resolvable(pool, &date.kaynak) {
            date.kaynak.clear();
            dropped += 1;
        }
    }
    if dropped > 0 {
        tracing::debug!(dropped, "Unresolvable source refs removed from model output");
    }

    analysis.operasyonel_riskler.skor = analysis.operasyonel_riskler.skor.min(100);
    analysis.genel_degerlendirme.puan = analysis.genel_degerlendirme.puan.min(100);
    let oran = analysis.maliyet_sapma_olasiligi.oran;
    analysis.maliyet_sapma_olasiligi.oran = if oran.is_finite() { oran.clamp(0.0, 1.0) } else { 0.5 };
}

/// Risk and opportunity reading of the tender by the text-generation model.
pub struct ContextualAnalyzer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl ContextualAnalyzer {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    /// Never fails: model or parse errors yield the default analysis.
    pub fn analyze(&self, pool: &DataPool, fields: &ExtractedFields) -> StageOutcome<ContextualAnalysis> {
        match self.try_analyze(pool, fields) {
            Ok(analysis) => {
                tracing::info!(
                    risk = analysis.operasyonel_riskler.seviye.as_str(),
                    score = analysis.genel_degerlendirme.puan,
                    "Contextual analysis complete"
                );
                StageOutcome::Ok(analysis)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "Contextual analysis failed — continuing with default");
                StageOutcome::degraded(default_contextual_analysis(&reason), reason)
            }
        }
    }

    fn try_analyze(&self, pool: &DataPool, fields: &ExtractedFields) -> Result<ContextualAnalysis, AnalysisError> {
        let prompt = build_prompt(&build_context(pool, fields)?);
        let response = self.client.generate(&self.model, &prompt, SYSTEM_PROMPT)?;
        let mut analysis: ContextualAnalysis = parse_json_response(&response)?;
        ground_analysis(&mut analysis, pool);
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::datapool::provenance::{record_blocks, record_tables};
    use crate::pipeline::extraction::{ExtractedTable, TextBlock};
    use crate::pipeline::llm::MockLlmClient;

    fn pool() -> DataPool {
        let mut pool = DataPool::default();
        pool.text_blocks = vec![
            TextBlock::new("A", Some(1), 0, "İhale konusu: yemek hizmeti"),
            TextBlock::new("A", Some(1), 1, "Gecikme halinde ceza uygulanır."),
            TextBlock::new("B", None, 0, "Personel sayısı en az 20 olacaktır."),
        ];
        pool.tables = vec![ExtractedTable {
            table_id: "T1".into(),
            doc_id: "B".into(),
            headers: vec!["Yemek".into(), "Gramaj".into()],
            rows: vec![vec!["Pilav".into(), "80".into()]],
            title: None,
            page: None,
        }];
        let (blocks, tables) = (pool.text_blocks.clone(), pool.tables.clone());
        record_blocks(&mut pool.provenance, &blocks);
        record_tables(&mut pool.provenance, &tables);
        pool
    }

    const RESPONSE: &str = r#"```json
{
  "operasyonel_riskler": {
    "seviye": "yüksek",
    "nedenler": [
      {"text": "Gecikme cezası ağır", "source_ref": ["A:1.1", "Z:9.9"], "confidence": 0.9},
      {"text": "Ölçek büyük", "source_ref": ["calculated"], "confidence": 1.4}
    ],
    "skor": 140,
    "onlemler": ["Yedek personel"]
  },
  "maliyet_sapma_olasiligi": {"oran": 0.3, "faktorler": []},
  "zaman_uygunlugu": {
    "yeterli": true,
    "gun_analizi": [],
    "kritik_tarihler": [{"tarih": "2024-04-01", "aciklama": "Başlangıç", "kaynak": "X:1.0"}]
  },
  "personel_gereksinimi": {
    "tahmini_sayi": 20,
    "detay": [{"text": "En az 20 personel", "source_ref": ["B:0.0"], "confidence": 0.8}],
    "kritik_pozisyonlar": ["Aşçıbaşı"]
  },
  "ekipman_ihtiyaci": {
    "kritik_ekipmanlar": ["Soğuk oda"],
    "kaynak": [{"text": "Menü tablosu", "source_ref": ["T1:row0", "T1:row7"], "confidence": 0.7}]
  },
  "genel_degerlendirme": {"puan": 68, "ozet": "Dikkatli planlama gerekli", "oneriler": []}
}
```"#;

    #[test]
    fn context_lists_key_blocks_and_tables() {
        let context = build_context(&pool(), &ExtractedFields::default()).unwrap();
        assert!(context.starts_with("## EXTRACTED FIELDS:\n"));
        assert!(context.contains("[A:1.1]: Gecikme halinde ceza uygulanır....\n"));
        assert!(context.contains("[B:0.0]: Personel"));
        assert!(!context.contains("[A:1.0]"));
        assert!(context.contains("## TABLES:\n[T1]: Yemek | Gramaj\nRows: 1\n"));
    }

    #[test]
    fn context_is_bounded() {
        let mut pool = DataPool::default();
        pool.text_blocks = (0..15)
            .map(|i| TextBlock::new("A", None, i, format!("Teslim şartı {i} {}", "x".repeat(400))))
            .collect();
        pool.tables = (0..7)
            .map(|i| ExtractedTable::from_grid("A", i, vec![vec![format!("Kolon{i}")], vec!["1".into()]]).unwrap())
            .collect();

        let context = build_context(&pool, &ExtractedFields::default()).unwrap();
        assert_eq!(context.matches("]: Teslim").count(), 10);
        assert!(!context.contains("x".repeat(300).as_str()));
        assert!(context.contains("[T5]"));
        assert!(!context.contains("[T6]"));
    }

    #[test]
    fn prompt_embeds_context_and_contract() {
        let prompt = build_prompt("## EXTRACTED FIELDS:\n{}");
        assert!(prompt.contains("## EXTRACTED FIELDS:"));
        assert!(prompt.contains("\"operasyonel_riskler\""));
        assert!(prompt.contains("source_ref"));
    }

    #[test]
    fn parsed_analysis_is_grounded() {
        let client = Arc::new(MockLlmClient::new(RESPONSE));
        let analyzer = ContextualAnalyzer::new(client.clone(), "llama3.1");
        let pool = pool();

        let outcome = analyzer.analyze(&pool, &ExtractedFields::default());
        assert!(!outcome.is_degraded());
        let analysis = outcome.into_value();

        let risks = &analysis.operasyonel_riskler;
        assert_eq!(risks.seviye, RiskLevel::Yuksek);
        assert_eq!(risks.skor, 100);
        assert_eq!(risks.nedenler[0].source_ref, vec!["A:1.1".to_string()]);
        assert_eq!(risks.nedenler[0].context.as_deref(), Some("Gecikme halinde ceza uygulanır."));
        assert!(risks.nedenler[1].source_ref.is_empty());
        assert_eq!(risks.nedenler[1].confidence, 1.0);

        assert_eq!(analysis.zaman_uygunlugu.kritik_tarihler[0].kaynak, "");
        assert_eq!(analysis.ekipman_ihtiyaci.kaynak[0].source_ref, vec!["T1:row0".to_string()]);
        assert_eq!(analysis.ekipman_ihtiyaci.kaynak[0].context.as_deref(), Some("Yemek: Pilav, Gramaj: 80"));
        assert_eq!(analysis.genel_degerlendirme.puan, 68);

        for statement in analysis.statements() {
            assert!(statement.source_ref.iter().all(|id| is_resolvable(&pool, id)));
        }
        assert_eq!(client.prompts().len(), 1);
    }

    #[test]
    fn client_failure_degrades_to_default() {
        let analyzer = ContextualAnalyzer::new(Arc::new(MockLlmClient::failing("bağlantı reddedildi")), "llama3.1");
        let outcome = analyzer.analyze(&pool(), &ExtractedFields::default());

        assert!(outcome.is_degraded());
        assert!(outcome.reason().unwrap().contains("bağlantı reddedildi"));
        let analysis = outcome.value();
        assert_eq!(analysis.genel_degerlendirme.puan, 0);
        assert_eq!(analysis.operasyonel_riskler.seviye, RiskLevel::Orta);
        assert!(analysis.genel_degerlendirme.ozet.starts_with("Analiz tamamlanamadı: "));
        assert_eq!(analysis.statements().count(), 0);
    }

    #[test]
    fn malformed_response_degrades() {
        let analyzer = ContextualAnalyzer::new(Arc::new(MockLlmClient::new("{\"genel\": 5}")), "llama3.1");
        assert!(analyzer.analyze(&pool(), &ExtractedFields::default()).is_degraded());

        let analyzer = ContextualAnalyzer::new(Arc::new(MockLlmClient::new("Üzgünüm, yardımcı olamam.")), "llama3.1");
        assert!(analyzer.analyze(&pool(), &ExtractedFields::default()).is_degraded());
    }

    #[test]
    fn default_analysis_summary() {
        let analysis = default_contextual_analysis("timeout");
        assert_eq!(analysis.genel_degerlendirme.ozet, "Analiz tamamlanamadı: timeout");
        assert_eq!(analysis.operasyonel_riskler.skor, 50);
        assert!(!analysis.zaman_uygunlugu.yeterli);
    }
}
