use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential {0}; set it in the environment before starting")]
    MissingCredential(&'static str),

    #[error("invalid url for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

/// User-facing rejection of an uploaded PDF. `Display` is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("PDF has {pages} pages. Maximum allowed is {max}.")]
    TooManyPages { pages: usize, max: usize },

    #[error("PDF has {words} words. Maximum allowed is {}.", group_thousands(.max))]
    TooManyWords { words: usize, max: usize },

    #[error("Error reading PDF: {0}")]
    Unreadable(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("metric mismatch: expected {expected}, got {actual}")]
    Metric { expected: String, actual: String },

    #[error("gateway request failed: {0}")]
    Request(String),
}

/// Failure while wiring the pipeline from settings.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

fn group_thousands(value: &usize) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
