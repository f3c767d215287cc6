use serde::{Deserialize, Serialize};

/// Size bounds in characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub overlap_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 12_000,
            min_chunk_size: 2_000,
            overlap_size: 500,
        }
    }
}

/// How a chunk was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    /// A whole section that fit within the size bound.
    Section,
    /// Paragraph accumulation (no sections, or an oversized section).
    Semantic,
}

/// A bounded slice of document text. `start`/`end` are character offsets
/// into the chunked text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    /// Back-filled once the full chunk list is known.
    pub total: usize,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub char_count: usize,
    pub word_count: usize,
    pub token_count: usize,
    pub has_table: bool,
    pub section_title: Option<String>,
    pub kind: ChunkKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStatistics {
    pub original_length: usize,
    pub total_chunks: usize,
    pub avg_size: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub total_tokens: usize,
    pub with_tables: usize,
    /// Characters shared between neighbouring chunks.
    pub overlap_total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkedDocument {
    pub chunks: Vec<Chunk>,
    pub statistics: ChunkStatistics,
}
