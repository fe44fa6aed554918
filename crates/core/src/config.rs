use crate::error::ConfigError;
use crate::models::{IndexSpec, Metric, ValidationLimits};
use url::Url;

pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const DEFAULT_INDEX_NAME: &str = "rag-index";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_PINECONE_CONTROL_URL: &str = "https://api.pinecone.io";

/// API keys for the remote services, loaded once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub pinecone_api_key: String,
    pub openai_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("pinecone_api_key", &"<redacted>")
            .field("openai_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(
        pinecone_api_key: Option<String>,
        openai_api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            pinecone_api_key: require(PINECONE_API_KEY, pinecone_api_key)?,
            openai_api_key: require(OPENAI_API_KEY, openai_api_key)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            std::env::var(PINECONE_API_KEY).ok(),
            std::env::var(OPENAI_API_KEY).ok(),
        )
    }
}

fn require(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub index_name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    pub embedding_model: String,
    pub embedding_batch_size: usize,
    pub chat_model: String,
    pub temperature: f32,
    pub openai_base_url: Url,
    pub pinecone_control_url: Url,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub limits: ValidationLimits,
}

impl Settings {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dimension: 1536,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_batch_size: 100,
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.7,
            openai_base_url: default_url(DEFAULT_OPENAI_BASE_URL),
            pinecone_control_url: default_url(DEFAULT_PINECONE_CONTROL_URL),
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 5,
            limits: ValidationLimits::default(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(Credentials::from_env()?))
    }

    pub fn with_openai_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.openai_base_url = parse_url("openai_base_url", raw)?;
        Ok(self)
    }

    pub fn with_pinecone_control_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.pinecone_control_url = parse_url("pinecone_control_url", raw)?;
        Ok(self)
    }

    pub fn index_spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.index_name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            cloud: self.cloud.clone(),
            region: self.region.clone(),
        }
    }

    /// Rejects combinations that would fail on the first request anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_name.trim().is_empty() {
            return Err(ConfigError::InvalidSetting("index name is empty".to_string()));
        }
        if self.dimension == 0 {
            return Err(ConfigError::InvalidSetting("dimension must be positive".to_string()));
        }
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidSetting(format!(
                "chunk overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(ConfigError::InvalidSetting("top_k must be positive".to_string()));
        }
        if self.embedding_batch_size == 0 {
            return Err(ConfigError::InvalidSetting(
                "embedding batch size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { field, source })
}

fn default_url(raw: &'static str) -> Url {
    match Url::parse(raw) {
        Ok(url) => url,
        Err(error) => unreachable!("built-in url {raw} is invalid: {error}"),
    }
}
