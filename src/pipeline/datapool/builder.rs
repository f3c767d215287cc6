//! DataPool builder: intake, ZIP expansion, per-file extraction, then
//! aggregation into one provenance-tracked pool.
//!
//! Files are extracted independently (in parallel when configured) and
//! aggregated in input order, so the result does not depend on which
//! worker finished first.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Instant;

use super::doc_id::doc_id;
use super::provenance::{record_blocks, record_tables};
use super::quality::quality_warnings;
use super::types::{DataPool, DataPoolBuild, DocumentCleaning};
use super::DataPoolError;
use crate::config::EngineConfig;
use crate::pipeline::chunking::{ChunkedDocument, ChunkerConfig, DocumentChunker};
use crate::pipeline::cleaning::{clean_text, detect_sections, CleaningOptions};
use crate::pipeline::extraction::{
    detect_language, BoundingBox, DocumentExtractor, ExtractedDocument, ExtractedTable,
    ExtractionError, TextBlock,
};
use crate::pipeline::import::{
    DocumentFormat, InputFile, IntakeGuard, IntakeLimits, ZipExpander, ZipExpansion, ZipLimits,
};
use crate::pipeline::patterns::{extract_patterns, PatternMatches};
use crate::pipeline::types::{ProcessingError, ProcessingOptions, ProcessingStage};

/// Language reported when detection is off or finds nothing to inspect.
const DEFAULT_LANGUAGE: &str = "tr";

pub struct DataPoolBuilder {
    extractor: DocumentExtractor,
    intake: IntakeLimits,
    zip: ZipLimits,
    parallel: bool,
}

impl DataPoolBuilder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            extractor: DocumentExtractor::default(),
            intake: IntakeLimits {
                max_file_bytes: config.max_file_bytes,
                max_total_bytes: config.max_total_bytes,
            },
            zip: ZipLimits {
                max_entries: config.zip_max_entries,
                max_uncompressed_bytes: config.zip_max_uncompressed_bytes,
            },
            parallel: config.parallel_extraction,
        }
    }

    /// Swap the extractor, e.g. to plug in an OCR engine.
    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Build a DataPool from the run's input files.
    ///
    /// Per-file failures are recorded in `errors` and never abort the run.
    /// Only an empty input list is an error.
    pub fn build(
        &self,
        files: Vec<InputFile>,
        options: &ProcessingOptions,
    ) -> Result<DataPoolBuild, DataPoolError> {
        let started = Instant::now();
        if files.is_empty() {
            return Err(DataPoolError::NoInput);
        }

        let mut errors = Vec::new();
        let mut notes = Vec::new();

        let queue = self.prepare_inputs(files, &mut errors, &mut notes);
        let inputs: Vec<(String, InputFile)> = queue
            .into_iter()
            .enumerate()
            .map(|(i, file)| (doc_id(i), file))
            .collect();
        let results = self.extract_all(&inputs, options);

        let mut pool = DataPool::default();
        let mut matches = PatternMatches::default();
        let mut raw_parts = Vec::new();
        let mut languages: Vec<&'static str> = Vec::new();
        let mut total_words = 0usize;
        let mut table_count = 0usize;

        for ((id, file), result) in inputs.iter().zip(results) {
            let ExtractedDocument { info, mut content } = match result {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(doc_id = %id, file = %file.name, error = %e, "Extraction failed — continuing");
                    errors.push(
                        ProcessingError::new(ProcessingStage::Extract, format!("{} işlenemedi", file.name))
                            .for_doc(id.clone())
                            .with_details(e.to_string()),
                    );
                    pool.documents.push(self.extractor.describe(file, id));
                    continue;
                }
            };

            notes.extend(content.warnings.drain(..).map(|w| format!("{}: {w}", info.name)));

            for table in &mut content.tables {
                table_count += 1;
                table.table_id = format!("T{table_count}");
            }

            let text = if options.clean_text && !content.raw_text.trim().is_empty() {
                let cleaned = clean_text(&content.raw_text, &CleaningOptions::default());
                pool.metadata.cleaning.push(DocumentCleaning {
                    doc_id: id.clone(),
                    statistics: cleaned.statistics,
                });
                cleaned.cleaned_text
            } else {
                std::mem::take(&mut content.raw_text)
            };

            if options.detect_language && !text.trim().is_empty() {
                let language = detect_language(&text);
                if !languages.contains(&language) {
                    languages.push(language);
                }
            }
            total_words += text.split_whitespace().count();
            raw_parts.push(format!("--- {} ---\n{}", info.name, text));

            matches.extend(collect_patterns(&content.text_blocks, &content.tables, options));
            pool.text_blocks.extend(content.text_blocks);
            pool.tables.extend(content.tables);
            pool.documents.push(info);
        }

        // Indexed before merging so absorbed block ids stay resolvable.
        record_blocks(&mut pool.provenance, &pool.text_blocks);
        record_tables(&mut pool.provenance, &pool.tables);

        if options.merge_blocks {
            let before = pool.text_blocks.len();
            pool.text_blocks = merge_adjacent_blocks(std::mem::take(&mut pool.text_blocks));
            tracing::debug!(before, after = pool.text_blocks.len(), "Adjacent blocks merged");
        }

        let PatternMatches {
            mut dates,
            amounts,
            mut entities,
        } = matches;
        let mut seen = HashSet::new();
        dates.retain(|d| seen.insert((d.kind, d.value.clone())));
        let mut seen = HashSet::new();
        entities.retain(|e| seen.insert((e.kind, e.value.clone())));
        dates.sort_by(|a, b| a.value.cmp(&b.value));
        pool.dates = dates;
        pool.amounts = amounts;
        pool.entities = entities;

        pool.raw_text = raw_parts.join("\n\n");

        let max_block_page = pool.text_blocks.iter().filter_map(|b| b.page).max();
        let max_table_page = pool.tables.iter().filter_map(|t| t.page).max();
        pool.metadata.total_pages = max_block_page.max(max_table_page).unwrap_or(0);
        pool.metadata.total_words = total_words;
        pool.metadata.ocr_used = options.ocr_enabled;
        pool.metadata.languages_detected = if languages.is_empty() {
            vec![DEFAULT_LANGUAGE.to_string()]
        } else {
            languages.iter().map(|l| l.to_string()).collect()
        };

        let mut warnings = quality_warnings(&pool);
        warnings.extend(notes);
        pool.metadata.warnings = warnings;

        let duration_ms = started.elapsed().as_millis() as u64;
        pool.metadata.extraction_time_ms = duration_ms;

        tracing::info!(
            documents = pool.documents.len(),
            blocks = pool.text_blocks.len(),
            tables = pool.tables.len(),
            dates = pool.dates.len(),
            amounts = pool.amounts.len(),
            entities = pool.entities.len(),
            errors = errors.len(),
            duration_ms,
            "DataPool built"
        );

        Ok(DataPoolBuild {
            pool,
            errors,
            duration_ms,
        })
    }

    /// Read files from disk, then [`build`](Self::build). An unreadable
    /// path fails the whole call.
    pub fn build_from_paths(
        &self,
        paths: &[PathBuf],
        options: &ProcessingOptions,
    ) -> Result<DataPoolBuild, DataPoolError> {
        let files = paths
            .iter()
            .map(|path| InputFile::from_path(path))
            .collect::<Result<Vec<_>, _>>()?;
        self.build(files, options)
    }

    /// Intake checks and a single ZIP expansion pass. Failed archives are
    /// queued as opaque inputs in place of their contents.
    fn prepare_inputs(
        &self,
        files: Vec<InputFile>,
        errors: &mut Vec<ProcessingError>,
        notes: &mut Vec<String>,
    ) -> Vec<InputFile> {
        let mut guard = IntakeGuard::new(self.intake);
        let mut expander = ZipExpander::new(self.zip);
        let mut queue = Vec::with_capacity(files.len());

        for file in files {
            if let Err(e) = guard.admit(&file) {
                tracing::warn!(file = %file.name, error = %e, "File rejected at intake");
                errors.push(
                    ProcessingError::new(ProcessingStage::Upload, e.to_string())
                        .with_details(file.name.clone()),
                );
                continue;
            }

            if file.format() != DocumentFormat::Zip {
                queue.push(file);
                continue;
            }

            match expander.expand(&file) {
                ZipExpansion::Expanded { files, warnings } => {
                    notes.extend(warnings.into_iter().map(|w| format!("{}: {w}", file.name)));
                    queue.extend(files);
                }
                ZipExpansion::Fallback { file, error } => {
                    errors.push(
                        ProcessingError::new(ProcessingStage::Upload, format!("Arşiv açılamadı: {}", file.name))
                            .with_details(error.to_string()),
                    );
                    queue.push(file);
                }
                ZipExpansion::AlreadyExpanded => {
                    notes.push(format!("{}: arşiv bu çalışmada zaten açıldı, atlandı", file.name));
                }
            }
        }

        queue
    }

    /// Results come back in input order regardless of scheduling.
    fn extract_all(
        &self,
        inputs: &[(String, InputFile)],
        options: &ProcessingOptions,
    ) -> Vec<Result<ExtractedDocument, ExtractionError>> {
        let extractor = &self.extractor;
        if !self.parallel || inputs.len() < 2 {
            return inputs
                .iter()
                .map(|(id, file)| {
                    std::panic::catch_unwind(AssertUnwindSafe(|| extractor.extract(file, id, options)))
                        .unwrap_or_else(|_| Err(ExtractionError::Panicked(file.name.clone())))
                })
                .collect();
        }

        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let mut results = Vec::with_capacity(inputs.len());

        for batch in inputs.chunks(workers) {
            std::thread::scope(|scope| {
                let handles: Vec<_> = batch
                    .iter()
                    .map(|(id, file)| (file, scope.spawn(move || extractor.extract(file, id, options))))
                    .collect();
                for (file, handle) in handles {
                    results.push(
                        handle
                            .join()
                            .unwrap_or_else(|_| Err(ExtractionError::Panicked(file.name.clone()))),
                    );
                }
            });
        }

        results
    }
}

/// Pattern extraction per block (source = block id) and per table row
/// (source = table id).
fn collect_patterns(
    blocks: &[TextBlock],
    tables: &[ExtractedTable],
    options: &ProcessingOptions,
) -> PatternMatches {
    let mut matches = PatternMatches::default();
    for block in blocks {
        matches.extend(extract_patterns(block.text.trim(), &block.block_id, options));
    }
    for table in tables {
        for row in &table.rows {
            let line = row
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            matches.extend(extract_patterns(&line, &table.table_id, options));
        }
    }
    matches
}

/// Merge consecutive blocks of the same `(doc_id, page)` whose line ranges
/// touch. The merged block keeps the first block's id.
pub fn merge_adjacent_blocks(blocks: Vec<TextBlock>) -> Vec<TextBlock> {
    let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
    for block in blocks {
        if let Some(current) = merged.last_mut() {
            if is_contiguous(current, &block) {
                current.text.push('\n');
                current.text.push_str(&block.text);
                current.line_end = block.line_end;
                current.bbox = match (current.bbox, block.bbox) {
                    (Some(a), Some(b)) => Some(union(a, b)),
                    _ => None,
                };
                continue;
            }
        }
        merged.push(block);
    }
    merged
}

fn is_contiguous(current: &TextBlock, next: &TextBlock) -> bool {
    if current.doc_id != next.doc_id || current.page != next.page {
        return false;
    }
    match (current.line_end, next.line_start) {
        (Some(end), Some(start)) => start >= end && start - end <= 1,
        _ => false,
    }
}

fn union(a: BoundingBox, b: BoundingBox) -> BoundingBox {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    let right = (a.x + a.width).max(b.x + b.width);
    let top = (a.y + a.height).max(b.y + b.height);
    BoundingBox {
        x,
        y,
        width: right - x,
        height: top - y,
    }
}

/// Section-aware chunks over the pool's combined raw text.
pub fn chunk_pool(pool: &DataPool, config: &ChunkerConfig) -> ChunkedDocument {
    let sections = detect_sections(&pool.raw_text);
    DocumentChunker::new(config.clone()).chunk(&pool.raw_text, &sections)
}
