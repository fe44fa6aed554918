use crate::config::Settings;
use crate::embeddings::join_path;
use crate::models::{
    ChunkMetadata, EnsureOutcome, IndexMatch, IndexSpec, MetadataFilter, VectorRecord,
};
use crate::traits::VectorIndex;
use crate::GatewayError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

const API_VERSION: &str = "2024-07";
const DELETE_BATCH_SIZE: usize = 1000;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const READY_POLL_ATTEMPTS: usize = 60;

pub struct PineconeStore {
    client: Client,
    control_url: Url,
    api_key: String,
    index_name: String,
    host: OnceCell<Url>,
}

impl PineconeStore {
    pub fn new(control_url: Url, api_key: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            control_url,
            api_key: api_key.into(),
            index_name: index_name.into(),
            host: OnceCell::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.pinecone_control_url.clone(),
            settings.credentials.pinecone_api_key.clone(),
            settings.index_name.clone(),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }

    /// `None` when the index does not exist.
    async fn describe(&self, name: &str) -> Result<Option<Value>, GatewayError> {
        let url = join_path(&self.control_url, &format!("indexes/{name}"))?;
        let response = self.authorized(self.client.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, "describe index").await?;
        Ok(Some(response.json().await?))
    }

    async fn create(&self, spec: &IndexSpec) -> Result<EnsureOutcome, GatewayError> {
        let url = join_path(&self.control_url, "indexes")?;
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({
                "name": spec.name,
                "dimension": spec.dimension,
                "metric": spec.metric,
                "spec": {
                    "serverless": {
                        "cloud": spec.cloud,
                        "region": spec.region,
                    }
                }
            }))
            .send()
            .await?;

        // Another client created it between our describe and create.
        if response.status() == StatusCode::CONFLICT {
            return Ok(EnsureOutcome::Reused);
        }
        check_status(response, "create index").await?;
        Ok(EnsureOutcome::Created)
    }

    async fn wait_until_ready(&self, name: &str) -> Result<Url, GatewayError> {
        for attempt in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe(name).await? {
                if is_ready(&description) {
                    return host_url(&description);
                }
            }
            debug!(index = name, attempt, "waiting for index to become ready");
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }

        Err(GatewayError::Request(format!(
            "index {name} was not ready after {READY_POLL_ATTEMPTS} polls"
        )))
    }

    async fn data_plane(&self) -> Result<&Url, GatewayError> {
        self.host
            .get_or_try_init(|| async {
                match self.describe(&self.index_name).await? {
                    Some(description) => host_url(&description),
                    None => Err(GatewayError::Request(format!(
                        "index {} does not exist",
                        self.index_name
                    ))),
                }
            })
            .await
    }

    fn remember_host(&self, name: &str, host: Url) {
        if name == self.index_name {
            let _ = self.host.set(host);
        }
    }

    async fn query(&self, body: Value) -> Result<Vec<IndexMatch>, GatewayError> {
        let url = join_path(self.data_plane().await?, "query")?;
        let response = self.authorized(self.client.post(url)).json(&body).send().await?;
        let response = check_status(response, "query").await?;
        let parsed: Value = response.json().await?;
        Ok(parse_matches(&parsed))
    }
}

#[async_trait]
impl VectorIndex for PineconeStore {
    async fn ensure_index(&self, spec: &IndexSpec) -> Result<EnsureOutcome, GatewayError> {
        if let Some(description) = self.describe(&spec.name).await? {
            check_compatible(&description, spec)?;
            if !is_ready(&description) {
                let host = self.wait_until_ready(&spec.name).await?;
                self.remember_host(&spec.name, host);
            }
            info!(index = %spec.name, "index already exists");
            return Ok(EnsureOutcome::Reused);
        }

        let outcome = self.create(spec).await?;
        let host = self.wait_until_ready(&spec.name).await?;
        self.remember_host(&spec.name, host);
        info!(index = %spec.name, ?outcome, "index ready");
        Ok(outcome)
    }

    /// One request per call; the caller sizes the batches.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), GatewayError> {
        if records.is_empty() {
            return Ok(());
        }

        let url = join_path(self.data_plane().await?, "vectors/upsert")?;
        let response = self
            .authorized(self.client.post(url))
            .json(&json!({ "vectors": records }))
            .send()
            .await?;
        check_status(response, "upsert").await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), GatewayError> {
        if ids.is_empty() {
            return Ok(());
        }

        let url = join_path(self.data_plane().await?, "vectors/delete")?;
        for batch in ids.chunks(DELETE_BATCH_SIZE) {
            let response = self
                .authorized(self.client.post(url.clone()))
                .json(&json!({ "ids": batch }))
                .send()
                .await?;
            check_status(response, "delete").await?;
        }
        Ok(())
    }

    async fn query_by_filter(
        &self,
        filter: &MetadataFilter,
        placeholder: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, GatewayError> {
        self.query(json!({
            "vector": placeholder,
            "topK": top_k,
            "filter": { "doc_hash": { "$eq": filter.doc_hash } },
            "includeMetadata": false,
            "includeValues": false,
        }))
        .await
    }

    async fn query_by_similarity(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexMatch>, GatewayError> {
        self.query(json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
            "includeValues": false,
        }))
        .await
    }
}

async fn check_status(response: Response, operation: &str) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(GatewayError::BackendResponse {
        backend: "pinecone".to_string(),
        details: format!("{operation} returned {status}: {body}"),
    })
}

/// An existing index must match the requested dimension and metric.
fn check_compatible(description: &Value, spec: &IndexSpec) -> Result<(), GatewayError> {
    if let Some(dimension) = description.pointer("/dimension").and_then(Value::as_u64) {
        if dimension as usize != spec.dimension {
            return Err(GatewayError::Dimension {
                expected: spec.dimension,
                actual: dimension as usize,
            });
        }
    }

    if let Some(metric) = description.pointer("/metric").and_then(Value::as_str) {
        let expected = spec.metric.as_str();
        if !metric.eq_ignore_ascii_case(expected) {
            return Err(GatewayError::Metric {
                expected: expected.to_string(),
                actual: metric.to_string(),
            });
        }
    }

    Ok(())
}

fn is_ready(description: &Value) -> bool {
    description
        .pointer("/status/ready")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn host_url(description: &Value) -> Result<Url, GatewayError> {
    let host = description
        .pointer("/host")
        .and_then(Value::as_str)
        .filter(|host| !host.is_empty())
        .ok_or_else(|| GatewayError::BackendResponse {
            backend: "pinecone".to_string(),
            details: "index description has no host".to_string(),
        })?;

    if host.starts_with("http://") || host.starts_with("https://") {
        Ok(Url::parse(host)?)
    } else {
        Ok(Url::parse(&format!("https://{host}"))?)
    }
}

fn parse_matches(parsed: &Value) -> Vec<IndexMatch> {
    parsed
        .pointer("/matches")
        .and_then(Value::as_array)
        .map(|matches| matches.iter().map(parse_match).collect())
        .unwrap_or_default()
}

fn parse_match(hit: &Value) -> IndexMatch {
    let id = hit
        .pointer("/id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
    let metadata = hit.pointer("/metadata").and_then(parse_metadata);

    IndexMatch {
        id,
        score,
        metadata,
    }
}

/// Pinecone hands numeric metadata back as floats, so `chunk_id` may arrive as `3.0`.
fn parse_metadata(metadata: &Value) -> Option<ChunkMetadata> {
    let doc_hash = metadata.pointer("/doc_hash").and_then(Value::as_str)?;
    let chunk_id = metadata.pointer("/chunk_id").and_then(|value| {
        value
            .as_u64()
            .or_else(|| value.as_f64().filter(|id| *id >= 0.0).map(|id| id as u64))
    })?;
    let text = metadata
        .pointer("/text")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Some(ChunkMetadata {
        doc_hash: doc_hash.to_string(),
        chunk_id,
        text: text.to_string(),
    })
}
