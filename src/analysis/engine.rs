use std::sync::Arc;
use std::time::{Duration, Instant};

use super::contextual::{default_contextual_analysis, ContextualAnalyzer};
use super::fields::extract_fields;
use super::market::{MarketAnalyzer, PriceSource};
use super::notify::{AnalysisUpdate, ContextualSummary, LiveUpdateSink, MarketSummary};
use super::report::render_report;
use super::scores::compute_scores;
use super::store::AnalysisStore;
use super::types::{
    AnalysisOptions, AnalysisStage, AnalysisStatus, ContextualAnalysis, DegradedStage, ExtractedFields,
    MarketAnalysis, StageOutcome, TenderAnalysisResult,
};
use super::validator::validate;
use crate::config::EngineConfig;
use crate::pipeline::datapool::DataPool;
use crate::pipeline::llm::LlmClient;

/// Fresh id for one analysis run.
pub fn new_analysis_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Runs the analysis stages over a built DataPool.
///
/// Field extraction runs first, then the contextual and market stages
/// (concurrently or one after the other), then validation. A failing stage
/// never aborts the run: the contextual stage falls back to its default
/// analysis, the market stage is left out and its error recorded.
pub struct TenderAnalysisEngine {
    contextual: Arc<ContextualAnalyzer>,
    market: Arc<MarketAnalyzer>,
    store: Option<Arc<dyn AnalysisStore>>,
    notifier: Option<Arc<dyn LiveUpdateSink>>,
    llm_timeout: Duration,
}

impl TenderAnalysisEngine {
    pub fn new(config: &EngineConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            contextual: Arc::new(ContextualAnalyzer::new(llm, &config.model)),
            market: Arc::new(MarketAnalyzer::default()),
            store: None,
            notifier: None,
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
        }
    }

    pub fn with_price_source(mut self, prices: Arc<dyn PriceSource>) -> Self {
        self.market = Arc::new(MarketAnalyzer::new(prices));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn AnalysisStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn LiveUpdateSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub async fn run(&self, analysis_id: &str, pool: DataPool, options: &AnalysisOptions) -> TenderAnalysisResult {
        let started = Instant::now();
        let mut result = TenderAnalysisResult::new(analysis_id, DataPool::default());
        result.status = AnalysisStatus::Processing;

        tracing::info!(
            analysis_id,
            documents = pool.documents.len(),
            blocks = pool.text_blocks.len(),
            tables = pool.tables.len(),
            "Analysis started"
        );

        if pool.is_empty() {
            tracing::warn!(analysis_id, "DataPool has no content, analysis failed");
            result.data_pool = pool;
            result.status = AnalysisStatus::Failed;
            result.current_stage = AnalysisStage::Done;
            result.errors.push("DataPool boş: analiz edilecek içerik bulunamadı".into());
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            if options.save_to_db {
                self.persist(&result).await;
            }
            self.notify(&result);
            return result;
        }

        let fields = Arc::new(extract_fields(&pool));
        let pool = Arc::new(pool);

        let (contextual, market) = if options.parallel_processing {
            tokio::join!(
                self.contextual_stage(analysis_id, options.enable_contextual, &pool, &fields),
                self.market_stage(analysis_id, options.enable_market, &pool, &fields),
            )
        } else {
            let contextual = self.contextual_stage(analysis_id, options.enable_contextual, &pool, &fields).await;
            let market = self.market_stage(analysis_id, options.enable_market, &pool, &fields).await;
            (contextual, market)
        };

        match contextual {
            Some(StageOutcome::Ok(analysis)) => result.contextual = Some(analysis),
            Some(StageOutcome::Degraded { value, reason }) => {
                result
                    .warnings
                    .push(format!("Bağlamsal analiz varsayılan değerlerle tamamlandı: {reason}"));
                result.degraded.push(DegradedStage {
                    stage: AnalysisStage::Contextual,
                    reason,
                });
                result.contextual = Some(value);
            }
            None => {}
        }
        match market {
            Some(Ok(analysis)) => result.market = Some(analysis),
            Some(Err(error)) => result.errors.push(format!("Piyasa analizi başarısız: {error}")),
            None => {}
        }

        if options.enable_deep {
            tracing::warn!(analysis_id, "Deep analysis requested but not available — continuing");
            result
                .warnings
                .push("Derin analiz bu sürümde desteklenmiyor, aşama atlandı".into());
        }

        result.current_stage = AnalysisStage::Validation;
        let usable_contextual = if result.is_degraded(AnalysisStage::Contextual) {
            None
        } else {
            result.contextual.as_ref()
        };
        let validation = validate(&fields, usable_contextual, result.market.as_ref());
        let scores = compute_scores(usable_contextual, result.market.as_ref(), Some(&validation));
        result.validation = Some(validation);
        result.scores = Some(scores);

        result.extracted_fields = Arc::try_unwrap(fields).unwrap_or_else(|shared| (*shared).clone());
        // A timed-out stage task may still hold a reference.
        result.data_pool = Arc::try_unwrap(pool).unwrap_or_else(|shared| (*shared).clone());
        result.status = AnalysisStatus::Completed;
        result.current_stage = AnalysisStage::Done;
        result.processing_time_ms = started.elapsed().as_millis() as u64;

        if options.generate_report {
            result.report = Some(render_report(&result));
        }
        if options.save_to_db {
            self.persist(&result).await;
        }
        self.notify(&result);

        tracing::info!(
            analysis_id,
            duration_ms = result.processing_time_ms,
            degraded = result.degraded.len(),
            errors = result.errors.len(),
            "Analysis completed"
        );
        result
    }

    async fn contextual_stage(
        &self,
        analysis_id: &str,
        enabled: bool,
        pool: &Arc<DataPool>,
        fields: &Arc<ExtractedFields>,
    ) -> Option<StageOutcome<ContextualAnalysis>> {
        if !enabled {
            return None;
        }

        let analyzer = Arc::clone(&self.contextual);
        let (pool, fields) = (Arc::clone(pool), Arc::clone(fields));
        let task = tokio::task::spawn_blocking(move || analyzer.analyze(&pool, &fields));

        let outcome = match tokio::time::timeout(self.llm_timeout, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let reason = e.to_string();
                tracing::warn!(error = %reason, "Contextual stage task failed — continuing with default");
                StageOutcome::degraded(default_contextual_analysis(&reason), reason)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.llm_timeout.as_millis() as u64,
                    "Contextual analysis timed out — continuing with default"
                );
                StageOutcome::degraded(default_contextual_analysis("timeout"), "timeout")
            }
        };
        if let Some(notifier) = &self.notifier {
            notifier.set_contextual_analysis(analysis_id, &ContextualSummary::from(outcome.value()));
        }
        Some(outcome)
    }

    async fn market_stage(
        &self,
        analysis_id: &str,
        enabled: bool,
        pool: &Arc<DataPool>,
        fields: &Arc<ExtractedFields>,
    ) -> Option<Result<MarketAnalysis, String>> {
        if !enabled {
            return None;
        }

        let analyzer = Arc::clone(&self.market);
        let (pool, fields) = (Arc::clone(pool), Arc::clone(fields));
        let outcome = match tokio::task::spawn_blocking(move || analyzer.analyze(&pool, &fields)).await {
            Ok(Ok(analysis)) => Ok(analysis),
            Ok(Err(e)) => Err(e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match (&outcome, &self.notifier) {
            (Ok(analysis), Some(notifier)) => notifier.set_market_analysis(analysis_id, &MarketSummary::from(analysis)),
            (Err(error), _) => tracing::warn!(error = %error, "Market analysis failed — continuing without it"),
            _ => {}
        }
        Some(outcome)
    }

    /// Best-effort upserts of the result and its sub-results. Failures are
    /// logged only.
    async fn persist(&self, result: &TenderAnalysisResult) {
        let Some(store) = &self.store else {
            return;
        };

        let mut blobs = vec![("result", serde_json::to_value(result))];
        if let Some(contextual) = &result.contextual {
            blobs.push(("contextual", serde_json::to_value(contextual)));
        }
        if let Some(market) = &result.market {
            blobs.push(("market", serde_json::to_value(market)));
        }
        let blobs: Vec<(&'static str, serde_json::Value)> = blobs
            .into_iter()
            .filter_map(|(stage, value)| match value {
                Ok(value) => Some((stage, value)),
                Err(e) => {
                    tracing::warn!(stage, error = %e, "Could not serialize analysis blob — skipping");
                    None
                }
            })
            .collect();

        let store = Arc::clone(store);
        let analysis_id = result.analysis_id.clone();
        let task = tokio::task::spawn_blocking(move || {
            for (stage, payload) in &blobs {
                if let Err(e) = store.upsert(&analysis_id, stage, payload) {
                    tracing::warn!(analysis_id = %analysis_id, stage, error = %e, "Failed to persist analysis — continuing");
                }
            }
        });
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Persistence task failed — continuing");
        }
    }

    /// Final status push. Stage summaries are pushed as each stage settles.
    fn notify(&self, result: &TenderAnalysisResult) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        notifier.update_analysis(
            &result.analysis_id,
            &AnalysisUpdate {
                status: result.status,
                scores: result.scores,
                degraded_stages: result.degraded.iter().map(|d| d.stage.as_str().to_string()).collect(),
            },
        );
    }
}
