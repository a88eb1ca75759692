// Embeddings module
// OpenAI-compatible embedding client and the shared token estimate

pub mod openai;
pub mod tokens;

use async_trait::async_trait;

pub use openai::{EmbeddingResult, OpenAiClient};
pub use tokens::estimate_token_count;

/// Turns text into vectors. Implemented by the HTTP client and by test doubles.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in input order
    async fn embed_documents(&self, texts: Vec<String>) -> crate::Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> crate::Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}
