use crate::config::Settings;
use crate::embeddings::join_path;
use crate::traits::ChatModel;
use crate::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Chat completions against an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(
        base_url: &Url,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            client: Client::new(),
            endpoint: join_path(base_url, "chat/completions")?,
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, GatewayError> {
        Self::new(
            &settings.openai_base_url,
            settings.credentials.openai_api_key.clone(),
            settings.chat_model.clone(),
            settings.temperature,
        )
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GatewayError::BackendResponse {
                backend: "openai".to_string(),
                details: format!("chat completion returned {status}: {text}"),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

fn first_choice(parsed: ChatResponse) -> Result<String, GatewayError> {
    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .ok_or_else(|| GatewayError::BackendResponse {
            backend: "openai".to_string(),
            details: "chat completion had no content".to_string(),
        })
}
