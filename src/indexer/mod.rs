// Indexer module
// Embeds the formatted corpus and rebuilds the persisted collection from scratch


use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::AssistantError;
use crate::config::StoreConfig;
use crate::embeddings::{Embedder, estimate_token_count};
use crate::openapi::{DocumentMetadata, FormattedDocument};
use crate::store::{EmbeddingRecord, IndexManifest, VectorStore};

/// Builds the vector collection for one OpenAPI document
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    store: StoreConfig,
    batch_size: usize,
    show_progress: bool,
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub collection: String,
    pub documents: usize,
    pub stored: usize,
    pub dimension: usize,
    pub estimated_tokens: usize,
    pub duration: Duration,
}

/// Per-kind document counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CorpusSummary {
    pub general_info: usize,
    pub operations: usize,
    pub schemas: usize,
    pub estimated_tokens: usize,
}

impl CorpusSummary {
    #[inline]
    pub fn of(documents: &[FormattedDocument]) -> Self {
        documents.iter().fold(Self::default(), |mut summary, doc| {
            match doc.metadata {
                DocumentMetadata::GeneralInfo { .. } => summary.general_info += 1,
                DocumentMetadata::Operation { .. } => summary.operations += 1,
                DocumentMetadata::SchemaDefinition { .. } => summary.schemas += 1,
            }
            summary.estimated_tokens += estimate_token_count(&doc.text);
            summary
        })
    }

    #[inline]
    pub const fn total(&self) -> usize {
        self.general_info + self.operations + self.schemas
    }
}

impl IndexBuilder {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: StoreConfig, batch_size: usize) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
            show_progress: false,
        }
    }

    /// Draw a progress bar over embedding batches when stderr is a terminal
    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[inline]
    pub fn manifest_path(&self) -> PathBuf {
        self.store.path.join("manifest.json")
    }

    /// Whether a previous build left anything at the store path
    #[inline]
    pub fn store_exists(&self) -> bool {
        std::fs::read_dir(&self.store.path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false)
    }

    /// Embed every document, then replace the collection with the results.
    ///
    /// The store is only touched after all embeddings are available, so a provider
    /// failure leaves the previous collection in place.
    #[inline]
    pub async fn build(
        &self,
        documents: Vec<FormattedDocument>,
        source: &str,
    ) -> Result<IndexStats, AssistantError> {
        if documents.is_empty() {
            return Err(AssistantError::Source(
                "The OpenAPI document produced no documents to index".to_string(),
            ));
        }

        let started = Instant::now();
        let summary = CorpusSummary::of(&documents);
        info!(
            "Indexing {} documents ({} operations, {} schemas) into '{}'",
            documents.len(),
            summary.operations,
            summary.schemas,
            self.store.collection
        );

        let vectors = self.embed_documents(&documents).await?;
        let dimension = vectors.first().map_or(0, Vec::len);

        let built_at = Utc::now();
        let records: Vec<EmbeddingRecord> = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| EmbeddingRecord::new(document, vector, built_at))
            .collect();
        let documents = records.len();

        let store = VectorStore::rebuild(&self.store.path, &self.store.collection, records).await?;
        let stored = store.count().await?;

        if stored != documents {
            warn!(
                "Collection holds {} rows but {} documents were indexed",
                stored, documents
            );
        }

        let manifest = IndexManifest {
            collection: self.store.collection.clone(),
            source: source.to_string(),
            document_count: stored,
            embedding_model: self.embedder.model_name().to_string(),
            dimension,
            estimated_tokens: summary.estimated_tokens,
            built_at,
        };
        manifest.write(&self.manifest_path())?;

        let stats = IndexStats {
            collection: self.store.collection.clone(),
            documents,
            stored,
            dimension,
            estimated_tokens: summary.estimated_tokens,
            duration: started.elapsed(),
        };

        info!(
            "Index build finished: {} documents stored in {:?}",
            stats.stored, stats.duration
        );
        Ok(stats)
    }

    async fn embed_documents(
        &self,
        documents: &[FormattedDocument],
    ) -> Result<Vec<Vec<f32>>, AssistantError> {
        let bar = if self.show_progress {
            ProgressBar::new(documents.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(documents.len());

        for batch in documents.chunks(self.batch_size) {
            if let Some(first) = batch.first() {
                bar.set_message(first.metadata.label());
            }

            let texts = batch.iter().map(|doc| doc.text.clone()).collect();
            let embedded = self.embedder.embed_documents(texts).await?;

            if embedded.len() != batch.len() {
                bar.abandon();
                return Err(AssistantError::Embedding(format!(
                    "Mismatch between request and response counts: {} vs {}",
                    batch.len(),
                    embedded.len()
                )));
            }

            debug!("Embedded batch of {} documents", batch.len());
            vectors.extend(embedded);
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        Ok(vectors)
    }
}
