use crate::chat::OpenAiChat;
use crate::chunking::{chunk_document, ChunkingConfig, RecursiveSplitter};
use crate::config::Settings;
use crate::embeddings::{Embedder, OpenAiEmbedder};
use crate::error::SetupError;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::fingerprint::fingerprint;
use crate::gateway::{VectorStoreGateway, DEFAULT_TOP_K};
use crate::models::{Document, EnsureOutcome, Fingerprint, IngestOutcome, ValidationLimits};
use crate::stores::PineconeStore;
use crate::synthesizer::{error_answer, AnswerSynthesizer};
use crate::traits::{ChatModel, VectorIndex};
use crate::validator::validate_pdf;
use crate::{GatewayError, IngestError, ValidationError};
use tracing::{info, warn};

pub const EMPTY_QUESTION_REPLY: &str = "Please ask a question about the uploaded document.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestReport {
    Rejected { reason: String },
    AlreadyIndexed { fingerprint: Fingerprint },
    Indexed { fingerprint: Fingerprint, chunks: usize },
}

/// Upload-to-answer pipeline over pluggable extraction, index, embedding and chat services.
pub struct DocuChat<X, I, E, M> {
    extractor: X,
    gateway: VectorStoreGateway<I, E>,
    synthesizer: AnswerSynthesizer<M>,
    splitter: RecursiveSplitter,
    limits: ValidationLimits,
    top_k: usize,
}

impl<X, I, E, M> DocuChat<X, I, E, M>
where
    X: PdfExtractor + Send + Sync,
    I: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
    M: ChatModel + Send + Sync,
{
    pub fn new(
        extractor: X,
        gateway: VectorStoreGateway<I, E>,
        synthesizer: AnswerSynthesizer<M>,
        chunking: ChunkingConfig,
    ) -> Result<Self, IngestError> {
        Ok(Self {
            extractor,
            gateway,
            synthesizer,
            splitter: RecursiveSplitter::new(chunking)?,
            limits: ValidationLimits::default(),
            top_k: DEFAULT_TOP_K,
        })
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn gateway(&self) -> &VectorStoreGateway<I, E> {
        &self.gateway
    }

    pub async fn prepare(&self) -> Result<EnsureOutcome, GatewayError> {
        self.gateway.ensure_index().await
    }

    pub fn validate(&self, bytes: &[u8]) -> Result<Document, ValidationError> {
        validate_pdf(&self.extractor, bytes, self.limits)
    }

    /// Validation failures come back as `Rejected`; index failures propagate.
    pub async fn ingest_pdf(&self, bytes: &[u8]) -> Result<IngestReport, GatewayError> {
        let document = match self.validate(bytes) {
            Ok(document) => document,
            Err(rejection) => {
                warn!(reason = %rejection, "rejected upload");
                return Ok(IngestReport::Rejected {
                    reason: rejection.to_string(),
                });
            }
        };

        let doc_hash = fingerprint(&document.bytes);
        let chunks = chunk_document(&self.splitter, &doc_hash, &document.text);
        info!(
            doc_hash = %doc_hash,
            pages = document.page_count,
            words = document.word_count,
            chunk_count = chunks.len(),
            "validated upload"
        );

        match self.gateway.ingest_document(&doc_hash, &chunks).await? {
            IngestOutcome::AlreadyIndexed => Ok(IngestReport::AlreadyIndexed {
                fingerprint: doc_hash,
            }),
            IngestOutcome::Indexed { chunks } => Ok(IngestReport::Indexed {
                fingerprint: doc_hash,
                chunks,
            }),
        }
    }

    pub async fn ask(&self, question: &str) -> String {
        self.ask_with_top_k(question, self.top_k).await
    }

    /// Retrieval and model failures are both reported in the returned text.
    pub async fn ask_with_top_k(&self, question: &str, top_k: usize) -> String {
        let question = question.trim();
        if question.is_empty() {
            return EMPTY_QUESTION_REPLY.to_string();
        }

        match self.gateway.retrieve(question, top_k.max(1)).await {
            Ok(chunks) => self.synthesizer.answer(question, &chunks).await,
            Err(failure) => {
                warn!(error = %failure, "retrieval failed");
                error_answer(failure)
            }
        }
    }
}

pub type HostedDocuChat = DocuChat<LopdfExtractor, PineconeStore, OpenAiEmbedder, OpenAiChat>;

impl HostedDocuChat {
    /// lopdf extraction, Pinecone storage, OpenAI embeddings and chat.
    pub fn from_settings(settings: &Settings) -> Result<Self, SetupError> {
        settings.validate()?;

        let gateway = VectorStoreGateway::new(
            PineconeStore::from_settings(settings),
            OpenAiEmbedder::from_settings(settings)?,
            settings.index_spec(),
        )
        .with_embed_batch_size(settings.embedding_batch_size);
        let synthesizer = AnswerSynthesizer::new(OpenAiChat::from_settings(settings)?);
        let chunking = ChunkingConfig {
            chunk_size: settings.chunk_size,
            overlap: settings.chunk_overlap,
        };

        Ok(DocuChat::new(LopdfExtractor, gateway, synthesizer, chunking)?
            .with_limits(settings.limits)
            .with_top_k(settings.top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageText;
    use crate::gateway::tests::{test_spec, FakeIndex, LetterEmbedder};
    use crate::synthesizer::tests::RecordingModel;
    use crate::synthesizer::NO_CONTEXT;

    struct TextExtractor {
        pages: Vec<&'static str>,
    }

    impl PdfExtractor for TextExtractor {
        fn page_count(&self, bytes: &[u8]) -> Result<usize, ValidationError> {
            if bytes.starts_with(b"%PDF") {
                Ok(self.pages.len())
            } else {
                Err(ValidationError::Unreadable("invalid file header".to_string()))
            }
        }

        fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<PageText>, ValidationError> {
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(index, text)| PageText {
                    number: index as u32 + 1,
                    text: (*text).to_string(),
                })
                .collect())
        }
    }

    type TestChat = DocuChat<TextExtractor, FakeIndex, LetterEmbedder, RecordingModel>;

    fn build(pages: Vec<&'static str>, index: FakeIndex, model: RecordingModel) -> TestChat {
        DocuChat::new(
            TextExtractor { pages },
            VectorStoreGateway::new(index, LetterEmbedder, test_spec()),
            AnswerSynthesizer::new(model),
            ChunkingConfig {
                chunk_size: 40,
                overlap: 10,
            },
        )
        .expect("valid chunking config")
    }

    #[tokio::test]
    async fn upload_is_indexed_once() {
        let chat = build(
            vec!["The pump runs at thirty bar.\n\n", "The valve opens at five bar."],
            FakeIndex::default(),
            RecordingModel::default(),
        );

        let first = chat.ingest_pdf(b"%PDF-1.4 manual").await.unwrap();
        let (fingerprint, chunks) = match first {
            IngestReport::Indexed { fingerprint, chunks } => (fingerprint, chunks),
            other => panic!("expected a fresh ingestion, got {other:?}"),
        };
        assert_eq!(fingerprint, crate::fingerprint(b"%PDF-1.4 manual"));
        assert_eq!(chunks, 2);

        let second = chat.ingest_pdf(b"%PDF-1.4 manual").await.unwrap();
        assert_eq!(second, IngestReport::AlreadyIndexed { fingerprint });
        assert_eq!(chat.gateway().index().upserts(), 1);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_as_data() {
        let chat = build(vec!["p"; 6], FakeIndex::default(), RecordingModel::default());
        let report = chat.ingest_pdf(b"%PDF-1.4").await.unwrap();
        assert_eq!(
            report,
            IngestReport::Rejected {
                reason: "PDF has 6 pages. Maximum allowed is 5.".to_string()
            }
        );
        assert_eq!(chat.gateway().index().upserts(), 0);
    }

    #[tokio::test]
    async fn unreadable_upload_is_rejected_as_data() {
        let chat = build(vec!["p"], FakeIndex::default(), RecordingModel::default());
        let report = chat.ingest_pdf(b"not a pdf").await.unwrap();
        assert_eq!(
            report,
            IngestReport::Rejected {
                reason: "Error reading PDF: invalid file header".to_string()
            }
        );
    }

    #[tokio::test]
    async fn question_is_answered_from_retrieved_context() {
        let chat = build(
            vec!["The pump runs at thirty bar.\n\nThe valve opens at five bar."],
            FakeIndex::default(),
            RecordingModel::default(),
        )
        .with_top_k(1);
        chat.ingest_pdf(b"%PDF-1.4 manual").await.unwrap();

        let answer = chat.ask("  pump pressure?  ").await;
        assert_eq!(answer, "- **Pressure**: 30 bar");

        let prompt = chat.synthesizer_prompts().pop().expect("model was called");
        assert!(prompt.contains("Question:\npump pressure?\n"));
        assert!(!prompt.contains(NO_CONTEXT));
    }

    #[tokio::test]
    async fn empty_index_still_reaches_the_model() {
        let chat = build(vec![], FakeIndex::default(), RecordingModel::default());
        let answer = chat.ask("anything?").await;
        assert!(!answer.is_empty());
        let prompt = chat.synthesizer_prompts().pop().expect("model was called");
        assert!(prompt.contains(NO_CONTEXT));
    }

    #[tokio::test]
    async fn retrieval_failure_is_returned_as_text() {
        let index = FakeIndex {
            fail_similarity: true,
            ..FakeIndex::default()
        };
        let chat = build(vec![], index, RecordingModel::default());
        let answer = chat.ask("anything?").await;
        assert!(answer.starts_with("Error querying LLM: "));
        assert!(chat.synthesizer_prompts().is_empty());
    }

    #[tokio::test]
    async fn blank_question_skips_services() {
        let chat = build(vec![], FakeIndex::default(), RecordingModel::default());
        assert_eq!(chat.ask("   ").await, EMPTY_QUESTION_REPLY);
        assert!(chat.synthesizer_prompts().is_empty());
    }

    impl TestChat {
        fn synthesizer_prompts(&self) -> Vec<String> {
            self.synthesizer.model().prompts.lock().unwrap().clone()
        }
    }
}
