use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated upload. Lives only until it has been chunked.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub text: String,
    pub page_count: usize,
    pub word_count: usize,
}

/// Lowercase hex SHA-256 of the uploaded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn from_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub doc_hash: Fingerprint,
    pub chunk_id: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub doc_hash: String,
    pub chunk_id: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// Equality filter on the `doc_hash` metadata key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataFilter {
    pub doc_hash: String,
}

impl MetadataFilter {
    pub fn doc_hash(fingerprint: &Fingerprint) -> Self {
        Self {
            doc_hash: fingerprint.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Option<ChunkMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub score: f32,
    pub doc_hash: String,
    pub chunk_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Euclidean,
    Dotproduct,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::Dotproduct => "dotproduct",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    Created,
    Reused,
}

/// Result of the metadata-filtered existence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Found,
    NotFound,
    CheckFailed(String),
}

impl IndexStatus {
    /// Fail-open: only a positive match counts as indexed.
    pub fn is_indexed(&self) -> bool {
        matches!(self, IndexStatus::Found)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    AlreadyIndexed,
    Indexed { chunks: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_pages: usize,
    pub max_words: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_pages: 5,
            max_words: 10_000,
        }
    }
}
