use crate::models::{EnsureOutcome, IndexMatch, IndexSpec, MetadataFilter, VectorRecord};
use crate::GatewayError;
use async_trait::async_trait;

/// Remote vector index: similarity search plus metadata-filtered lookup.
#[async_trait]
pub trait VectorIndex {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsureOutcome, GatewayError>;

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), GatewayError>;

    async fn delete(&self, ids: &[String]) -> Result<(), GatewayError>;

    async fn query_by_filter(
        &self,
        filter: &MetadataFilter,
        placeholder: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, GatewayError>;

    async fn query_by_similarity(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, GatewayError>;
}

#[async_trait]
pub trait ChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}
