pub mod chat;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod fingerprint;
pub mod gateway;
pub mod models;
pub mod orchestrator;
pub mod stores;
pub mod synthesizer;
pub mod traits;
pub mod validator;

pub use chat::OpenAiChat;
pub use chunking::{chunk_document, ChunkingConfig, RecursiveSplitter, DEFAULT_SEPARATORS};
pub use config::{Credentials, Settings};
pub use embeddings::{Embedder, OpenAiEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{ConfigError, GatewayError, IngestError, SetupError, ValidationError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use fingerprint::fingerprint;
pub use gateway::{VectorStoreGateway, DEFAULT_TOP_K};
pub use models::{
    Chunk, ChunkMetadata, Document, EnsureOutcome, Fingerprint, IndexMatch, IndexSpec,
    IndexStatus, IngestOutcome, MetadataFilter, Metric, RetrievedChunk, ValidationLimits,
    VectorRecord,
};
pub use orchestrator::{DocuChat, HostedDocuChat, IngestReport};
pub use stores::PineconeStore;
pub use synthesizer::{build_prompt, AnswerSynthesizer};
pub use traits::{ChatModel, VectorIndex};
pub use validator::{count_words, validate_pdf};
