use crate::config::Settings;
use crate::error::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

#[async_trait]
pub trait Embedder {
    fn dimensions(&self) -> usize;

    /// One vector per input, in input order.
    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, GatewayError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Request("embedding response was empty".to_string()))
    }
}

/// Client for OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::new(),
            endpoint: join_path(base_url, "embeddings")?,
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GatewayError> {
        Self::new(
            &settings.openai_base_url,
            settings.credentials.openai_api_key.clone(),
            settings.embedding_model.clone(),
            settings.dimension,
        )
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>, GatewayError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: requested_dimensions(&self.model, self.dimensions),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GatewayError::BackendResponse {
                backend: "openai".to_string(),
                details: format!("embeddings returned {status}: {body}"),
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        vectors_in_input_order(parsed, inputs.len(), self.dimensions)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// Only the `text-embedding-3` family accepts a `dimensions` override.
fn requested_dimensions(model: &str, dimensions: usize) -> Option<usize> {
    model
        .starts_with("text-embedding-3")
        .then_some(dimensions)
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

fn vectors_in_input_order(
    mut parsed: EmbeddingResponse,
    expected: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>, GatewayError> {
    if parsed.data.len() != expected {
        return Err(GatewayError::Request(format!(
            "openai returned {} embeddings for {} inputs",
            parsed.data.len(),
            expected
        )));
    }

    parsed.data.sort_by_key(|entry| entry.index);
    parsed
        .data
        .into_iter()
        .map(|entry| {
            if entry.embedding.len() == dimensions {
                Ok(entry.embedding)
            } else {
                Err(GatewayError::Dimension {
                    expected: dimensions,
                    actual: entry.embedding.len(),
                })
            }
        })
        .collect()
}

/// Appends a path segment to a base URL that may or may not end in `/`.
pub(crate) fn join_path(base: &Url, segment: &str) -> Result<Url, GatewayError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(segment)?)
}
