// Vector store module
// Persisted LanceDB collection of embedded documents plus the build manifest


pub mod vector_store;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::AssistantError;
use crate::openapi::{DocumentMetadata, FormattedDocument};

pub use vector_store::{SearchResult, VectorStore};

/// Embedded document as stored in the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Random UUID v4
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: DocumentMetadata,
    /// RFC 3339 timestamp of the build that produced this record
    pub created_at: String,
}

impl EmbeddingRecord {
    #[inline]
    pub fn new(document: FormattedDocument, vector: Vec<f32>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vector,
            text: document.text,
            metadata: document.metadata,
            created_at: created_at.to_rfc3339(),
        }
    }
}

/// Summary written next to the collection after a successful build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub collection: String,
    pub source: String,
    pub document_count: usize,
    pub embedding_model: String,
    pub dimension: usize,
    pub estimated_tokens: usize,
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    #[inline]
    pub fn write(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize index manifest")?;
        fs::write(path, content).map_err(|e| {
            AssistantError::Database(format!(
                "Failed to write manifest {}: {e}",
                path.display()
            ))
        })
    }

    #[inline]
    pub fn read(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AssistantError::Database(format!(
                "Failed to read manifest {}: {e}",
                path.display()
            ))
        })?;
        let manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Missing or unreadable manifests are reported as `None`
    #[inline]
    pub fn read_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        Self::read(path)
            .map_err(|e| tracing::warn!("Ignoring unreadable manifest: {}", e))
            .ok()
    }
}
