
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::embeddings::Embedder;
use crate::store::{SearchResult, VectorStore};

/// Finds the stored documents most relevant to a question
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str, top_k: usize) -> crate::Result<Vec<SearchResult>>;
}

/// Embeds the query and runs a nearest-neighbour search over the collection
pub struct VectorRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<VectorStore>,
}

impl VectorRetriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<VectorStore>) -> Self {
        Self { embedder, store }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> crate::Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed_query(query).await?;
        let results = self.store.search_similar(&query_vector, top_k).await?;

        debug!(
            "Retrieved {} documents for query: {}",
            results.len(),
            query.chars().take(80).collect::<String>()
        );
        Ok(results)
    }
}
