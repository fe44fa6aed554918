use crate::models::RetrievedChunk;
use crate::traits::ChatModel;
use tracing::error;

pub const NO_CONTEXT: &str = "No relevant context found.";
pub const ERROR_PREFIX: &str = "Error querying LLM";

const INSTRUCTIONS: &str = r#"
You are **DocuChat**, an AI assistant that answers questions about an uploaded PDF.
Follow these rules strictly:

1. *Grounding*: Base your answer primarily on the *Context* below.
2. *Enrichment*: You *may* add short, widely accepted background facts if they make the answer clearer.
   - Prefix each extra fact with *💡 Extra insight:* so the user knows it is outside the document.
3. *Formatting*: Reply in *Markdown*:
   - Use bullet points or numbered lists for multiple items
   - Bold key terms or section names
4. *Unknowns*: If the document doesn't help answer the question, you may still use your general knowledge to provide a helpful answer.
   - Do **not** respond with: "The document doesn't contain that information." unless instructed to.
---
"#;

/// Retrieved texts joined by blank lines, or the placeholder when nothing matched.
pub fn render_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT.to_string();
    }
    chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_prompt(question: &str, chunks: &[RetrievedChunk]) -> String {
    let context = render_context(chunks);
    format!("{INSTRUCTIONS}Context:\n{context}\n\nQuestion:\n{question}\n\nAnswer:\n")
}

pub fn error_answer(detail: impl std::fmt::Display) -> String {
    format!("{ERROR_PREFIX}: {detail}")
}

pub struct AnswerSynthesizer<M> {
    model: M,
}

impl<M> AnswerSynthesizer<M>
where
    M: ChatModel + Send + Sync,
{
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Always yields displayable text; model failures come back as an error message.
    pub async fn answer(&self, question: &str, chunks: &[RetrievedChunk]) -> String {
        let prompt = build_prompt(question, chunks);
        match self.model.complete(&prompt).await {
            Ok(response) => response.trim().to_string(),
            Err(failure) => {
                error!(error = %failure, "chat completion failed");
                error_answer(failure)
            }
        }
    }
}
