use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    Upload,
    Extract,
    Parse,
    Classify,
    Validate,
}

impl ProcessingStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Extract => "extract",
            Self::Parse => "parse",
            Self::Classify => "classify",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage-level failure that reduced the completeness of a run.
/// Recorded as data; the run itself continues.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingError {
    pub doc_id: Option<String>,
    pub stage: ProcessingStage,
    pub message: String,
    pub details: Option<String>,
}

impl ProcessingError {
    pub fn new(stage: ProcessingStage, message: impl Into<String>) -> Self {
        Self {
            doc_id: None,
            stage,
            message: message.into(),
            details: None,
        }
    }

    pub fn for_doc(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Per-run extraction switches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    /// OCR is a hook only; no engine ships with the crate.
    pub ocr_enabled: bool,
    pub extract_tables: bool,
    pub extract_dates: bool,
    pub extract_amounts: bool,
    pub extract_entities: bool,
    pub merge_blocks: bool,
    pub clean_text: bool,
    pub detect_language: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            ocr_enabled: false,
            extract_tables: true,
            extract_dates: true,
            extract_amounts: true,
            extract_entities: true,
            merge_blocks: true,
            clean_text: true,
            detect_language: false,
        }
    }
}
