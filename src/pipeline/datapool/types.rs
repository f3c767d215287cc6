use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::DataPoolError;
use crate::pipeline::cleaning::CleaningStatistics;
use crate::pipeline::extraction::{DocumentInfo, ExtractedTable, TextBlock};
use crate::pipeline::patterns::{ExtractedAmount, ExtractedDate, ExtractedEntity};
use crate::pipeline::types::ProcessingError;

/// Where a block or table came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub doc_id: String,
    pub page: Option<u32>,
    /// First 100 characters of the block, or `Table: <title>` for tables.
    pub snippet: String,
}

/// Serialized form of one provenance entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub id: String,
    #[serde(flatten)]
    pub location: SourceLocation,
}

/// Flat map from block/table id to its location. Serializes as an explicit
/// list of `{id, doc_id, page, snippet}` entries, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<ProvenanceEntry>", into = "Vec<ProvenanceEntry>")]
pub struct Provenance(BTreeMap<String, SourceLocation>);

impl Provenance {
    pub fn insert(&mut self, id: impl Into<String>, location: SourceLocation) {
        self.0.insert(id.into(), location);
    }

    pub fn get(&self, id: &str) -> Option<&SourceLocation> {
        self.0.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceLocation)> {
        self.0.iter()
    }
}

impl From<Vec<ProvenanceEntry>> for Provenance {
    fn from(entries: Vec<ProvenanceEntry>) -> Self {
        Self(entries.into_iter().map(|e| (e.id, e.location)).collect())
    }
}

impl From<Provenance> for Vec<ProvenanceEntry> {
    fn from(provenance: Provenance) -> Self {
        provenance
            .0
            .into_iter()
            .map(|(id, location)| ProvenanceEntry { id, location })
            .collect()
    }
}

/// Cleaning statistics for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentCleaning {
    pub doc_id: String,
    pub statistics: CleaningStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPoolMetadata {
    /// Highest page number seen on any block or table.
    pub total_pages: u32,
    pub total_words: usize,
    pub extraction_time_ms: u64,
    pub ocr_used: bool,
    pub languages_detected: Vec<String>,
    /// Soft data-quality warnings plus per-file extraction notes.
    pub warnings: Vec<String>,
    pub cleaning: Vec<DocumentCleaning>,
}

/// Everything extracted from one run's input files. Built once, then only
/// read by the analysis stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPool {
    pub documents: Vec<DocumentInfo>,
    pub text_blocks: Vec<TextBlock>,
    pub tables: Vec<ExtractedTable>,
    pub dates: Vec<ExtractedDate>,
    pub amounts: Vec<ExtractedAmount>,
    pub entities: Vec<ExtractedEntity>,
    pub raw_text: String,
    pub metadata: DataPoolMetadata,
    pub provenance: Provenance,
}

impl DataPool {
    pub fn document(&self, doc_id: &str) -> Option<&DocumentInfo> {
        self.documents.iter().find(|d| d.doc_id == doc_id)
    }

    pub fn block(&self, block_id: &str) -> Option<&TextBlock> {
        self.text_blocks.iter().find(|b| b.block_id == block_id)
    }

    pub fn table(&self, table_id: &str) -> Option<&ExtractedTable> {
        self.tables.iter().find(|t| t.table_id == table_id)
    }

    pub fn to_json_pretty(&self) -> Result<String, DataPoolError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// No extracted content at all: nothing for the analysis stages to read.
    pub fn is_empty(&self) -> bool {
        self.text_blocks.is_empty() && self.tables.is_empty() && self.raw_text.trim().is_empty()
    }
}

/// Builder output: the pool plus the stage errors that reduced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoolBuild {
    pub pool: DataPool,
    pub errors: Vec<ProcessingError>,
    pub duration_ms: u64,
}

impl DataPoolBuild {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}
