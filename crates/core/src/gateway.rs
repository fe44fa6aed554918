//! Write and read paths over the vector index.
//!
//! The existence check and the ingestion that follows it are two separate
//! requests; two concurrent uploads of the same new file can both see
//! `NotFound` and both write. Callers that need exactly-once ingestion must
//! serialize on the fingerprint themselves.

use crate::embeddings::Embedder;
use crate::models::{
    Chunk, ChunkMetadata, EnsureOutcome, Fingerprint, IndexSpec, IndexStatus, IngestOutcome,
    MetadataFilter, RetrievedChunk, VectorRecord,
};
use crate::traits::VectorIndex;
use crate::GatewayError;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_TOP_K: usize = 5;
const DEFAULT_EMBED_BATCH: usize = 100;
const DEFAULT_UPSERT_BATCH: usize = 32;

pub struct VectorStoreGateway<I, E> {
    index: I,
    embedder: E,
    spec: IndexSpec,
    embed_batch_size: usize,
    upsert_batch_size: usize,
}

impl<I, E> VectorStoreGateway<I, E>
where
    I: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    pub fn new(index: I, embedder: E, spec: IndexSpec) -> Self {
        Self {
            index,
            embedder,
            spec,
            embed_batch_size: DEFAULT_EMBED_BATCH,
            upsert_batch_size: DEFAULT_UPSERT_BATCH,
        }
    }

    pub fn with_embed_batch_size(mut self, batch_size: usize) -> Self {
        self.embed_batch_size = batch_size.max(1);
        self
    }

    pub fn with_upsert_batch_size(mut self, batch_size: usize) -> Self {
        self.upsert_batch_size = batch_size.max(1);
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub async fn ensure_index(&self) -> Result<EnsureOutcome, GatewayError> {
        if self.embedder.dimensions() != self.spec.dimension {
            return Err(GatewayError::Dimension {
                expected: self.spec.dimension,
                actual: self.embedder.dimensions(),
            });
        }

        let outcome = self.index.ensure_index(&self.spec).await?;
        match outcome {
            EnsureOutcome::Created => info!(index = %self.spec.name, "created index"),
            EnsureOutcome::Reused => info!(index = %self.spec.name, "reusing index"),
        }
        Ok(outcome)
    }

    /// Only the filter matters, so the query vector is all zeros.
    pub async fn check_indexed(&self, doc_hash: &Fingerprint) -> IndexStatus {
        let placeholder = vec![0.0f32; self.spec.dimension];
        let filter = MetadataFilter::doc_hash(doc_hash);

        match self.index.query_by_filter(&filter, &placeholder, 1).await {
            Ok(matches) if matches.is_empty() => IndexStatus::NotFound,
            Ok(_) => IndexStatus::Found,
            Err(error) => IndexStatus::CheckFailed(error.to_string()),
        }
    }

    /// Embeds and upserts every chunk. Vectors are all computed before the first
    /// write, and a failed upsert batch deletes the batches already written.
    pub async fn ingest(&self, chunks: &[Chunk]) -> Result<usize, GatewayError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut records = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.embed_batch_size) {
            let inputs = batch.iter().map(|chunk| chunk.text.as_str()).collect::<Vec<_>>();
            let embeddings = self.embedder.embed_batch(&inputs).await?;

            if embeddings.len() != batch.len() {
                return Err(GatewayError::Request(format!(
                    "embedding count {} doesn't match chunk count {}",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (chunk, values) in batch.iter().zip(embeddings) {
                if values.len() != self.spec.dimension {
                    return Err(GatewayError::Dimension {
                        expected: self.spec.dimension,
                        actual: values.len(),
                    });
                }

                records.push(VectorRecord {
                    id: Uuid::new_v4().to_string(),
                    values,
                    metadata: ChunkMetadata {
                        doc_hash: chunk.doc_hash.as_str().to_string(),
                        chunk_id: chunk.chunk_id,
                        text: chunk.text.clone(),
                    },
                });
            }
        }

        let mut written: Vec<String> = Vec::with_capacity(records.len());
        for batch in records.chunks(self.upsert_batch_size) {
            if let Err(failure) = self.index.upsert(batch).await {
                self.roll_back(&written).await;
                return Err(failure);
            }
            written.extend(batch.iter().map(|record| record.id.clone()));
        }

        info!(chunk_count = records.len(), index = %self.spec.name, "stored chunks");
        Ok(records.len())
    }

    /// Removes the batches written before a failed upsert so a retry sees `NotFound`.
    async fn roll_back(&self, written: &[String]) {
        if written.is_empty() {
            return;
        }
        match self.index.delete(written).await {
            Ok(()) => warn!(removed = written.len(), "rolled back partial ingestion"),
            Err(error) => error!(
                %error,
                stranded = written.len(),
                "rollback failed, document is partially indexed"
            ),
        }
    }

    /// Existence check, then ingestion unless the fingerprint is already present.
    /// A failed check counts as not indexed.
    pub async fn ingest_document(
        &self,
        doc_hash: &Fingerprint,
        chunks: &[Chunk],
    ) -> Result<IngestOutcome, GatewayError> {
        match self.check_indexed(doc_hash).await {
            IndexStatus::Found => {
                info!(doc_hash = %doc_hash, "document already indexed, skipping");
                return Ok(IngestOutcome::AlreadyIndexed);
            }
            IndexStatus::CheckFailed(reason) => {
                warn!(doc_hash = %doc_hash, %reason, "existence check failed, ingesting anyway");
            }
            IndexStatus::NotFound => {}
        }

        let chunks = self.ingest(chunks).await?;
        Ok(IngestOutcome::Indexed { chunks })
    }

    /// Top-`k` stored chunks by similarity, in index order.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, GatewayError> {
        let vector = self.embedder.embed(query).await?;
        let matches = self.index.query_by_similarity(&vector, k).await?;

        Ok(matches
            .into_iter()
            .filter_map(|hit| {
                let score = hit.score;
                hit.metadata.map(|metadata| RetrievedChunk {
                    text: metadata.text,
                    score,
                    doc_hash: metadata.doc_hash,
                    chunk_id: metadata.chunk_id,
                })
            })
            .collect())
    }
}
