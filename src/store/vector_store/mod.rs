
use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::EmbeddingRecord;
use crate::AssistantError;
use crate::openapi::DocumentMetadata;

/// Handle on one named collection inside a LanceDB directory
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    path: PathBuf,
}

/// One hit of a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub text: String,
    pub metadata: DocumentMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("table_name", &self.table_name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open an existing, non-empty collection for querying.
    ///
    /// Fails when the directory is missing or empty, when the collection does not
    /// exist, or when it holds no rows.
    #[inline]
    pub async fn open_read_only(path: &Path, collection: &str) -> Result<Self, AssistantError> {
        let is_empty_dir = std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true);
        if is_empty_dir {
            return Err(AssistantError::Database(format!(
                "Vector database directory '{}' does not exist or is empty. Run `api-assistant build` first.",
                path.display()
            )));
        }

        let store = Self::connect(path, collection).await?;

        if !store.collection_exists().await? {
            return Err(AssistantError::Database(format!(
                "Collection '{collection}' was not found in '{}'. Run `api-assistant build` first.",
                path.display()
            )));
        }

        let count = store.count().await?;
        if count == 0 {
            return Err(AssistantError::Database(format!(
                "Collection '{collection}' in '{}' is empty. Run `api-assistant build` first.",
                path.display()
            )));
        }

        info!(
            "Opened collection '{}' with {} documents from {}",
            collection,
            count,
            path.display()
        );
        Ok(store)
    }

    /// Replace whatever lives at `path` with a fresh collection holding `records`
    #[inline]
    pub async fn rebuild(
        path: &Path,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<Self, AssistantError> {
        let Some(first) = records.first() else {
            return Err(AssistantError::Database(
                "Refusing to build an empty collection".to_string(),
            ));
        };
        let vector_dim = first.vector.len();
        if vector_dim == 0 {
            return Err(AssistantError::Database(
                "Embeddings have zero dimensions".to_string(),
            ));
        }

        if path.exists() {
            warn!("Deleting existing vector database at {}", path.display());
            std::fs::remove_dir_all(path).map_err(|e| {
                AssistantError::Database(format!(
                    "Failed to delete existing vector database {}: {e}",
                    path.display()
                ))
            })?;
        }

        std::fs::create_dir_all(path).map_err(|e| {
            AssistantError::Database(format!(
                "Failed to create vector database directory: {e}"
            ))
        })?;

        let store = Self::connect(path, collection).await?;

        store
            .connection
            .create_empty_table(&store.table_name, create_schema(vector_dim))
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to create table: {e}")))?;

        store.store_embeddings_batch(&records, vector_dim).await?;

        info!(
            "Collection '{}' rebuilt with {} records ({} dimensions)",
            collection,
            records.len(),
            vector_dim
        );
        Ok(store)
    }

    async fn connect(path: &Path, collection: &str) -> Result<Self, AssistantError> {
        let absolute = std::path::absolute(path).map_err(|e| {
            AssistantError::Database(format!("Invalid vector database path: {e}"))
        })?;
        let uri = format!("file://{}", absolute.display());
        debug!("Connecting to LanceDB at {}", uri);

        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to connect to LanceDB: {e}")))?;

        Ok(Self {
            connection,
            table_name: collection.to_string(),
            path: path.to_path_buf(),
        })
    }

    #[inline]
    pub async fn collection_exists(&self) -> Result<bool, AssistantError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to list tables: {e}")))?;

        Ok(table_names.contains(&self.table_name))
    }

    async fn open_table(&self) -> Result<Table, AssistantError> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to open table: {e}")))
    }

    async fn store_embeddings_batch(
        &self,
        records: &[EmbeddingRecord],
        vector_dim: usize,
    ) -> Result<(), AssistantError> {
        debug!("Storing batch of {} embeddings", records.len());

        let record_batch = create_record_batch(records, vector_dim)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to insert embeddings: {e}")))?;

        Ok(())
    }

    /// Nearest neighbours of `query_vector`, closest first
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>, AssistantError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;

        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| AssistantError::Database(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .limit(limit)
            .execute()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to execute search: {e}")))?;

        let mut search_results = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to read result stream: {e}")))?
        {
            search_results.extend(parse_search_batch(&batch)?);
        }

        debug!("Found {} similar documents", search_results.len());
        Ok(search_results)
    }

    #[inline]
    pub async fn count(&self) -> Result<usize, AssistantError> {
        let table = self.open_table().await?;
        table
            .count_rows(None)
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to count rows: {e}")))
    }

    /// Width of the stored vectors, read from the table schema
    #[inline]
    pub async fn vector_dimension(&self) -> Result<usize, AssistantError> {
        let table = self.open_table().await?;
        let schema = table
            .schema()
            .await
            .map_err(|e| AssistantError::Database(format!("Failed to get table schema: {e}")))?;

        schema
            .fields()
            .iter()
            .find(|field| field.name() == "vector")
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
                _ => None,
            })
            .ok_or_else(|| {
                AssistantError::Database(
                    "Could not find vector column or determine dimension".to_string(),
                )
            })
    }
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("doc_type", DataType::Utf8, false),
        Field::new("label", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(
    records: &[EmbeddingRecord],
    vector_dim: usize,
) -> Result<RecordBatch, AssistantError> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut doc_types = Vec::with_capacity(len);
    let mut labels = Vec::with_capacity(len);
    let mut texts = Vec::with_capacity(len);
    let mut metadata = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        if record.vector.len() != vector_dim {
            return Err(AssistantError::Database(format!(
                "Embedding dimension mismatch: expected {vector_dim}, got {}",
                record.vector.len()
            )));
        }

        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        doc_types.push(record.metadata.kind());
        labels.push(record.metadata.label());
        texts.push(record.text.as_str());
        metadata.push(serde_json::to_string(&record.metadata).map_err(|e| {
            AssistantError::Database(format!("Failed to serialize metadata: {e}"))
        })?);
        created_ats.push(record.created_at.as_str());
    }

    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| AssistantError::Database(format!("Failed to create vector array: {e}")))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(doc_types)),
        Arc::new(StringArray::from(labels)),
        Arc::new(StringArray::from(texts)),
        Arc::new(StringArray::from(metadata)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| AssistantError::Database(format!("Failed to create record batch: {e}")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, AssistantError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| AssistantError::Database(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AssistantError::Database(format!("Invalid {name} column type")))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, AssistantError> {
    let texts = string_column(batch, "text")?;
    let metadata = string_column(batch, "metadata")?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    (0..batch.num_rows())
        .map(|row| {
            let metadata: DocumentMetadata = serde_json::from_str(metadata.value(row))
                .map_err(|e| AssistantError::Database(format!("Invalid metadata in row {row}: {e}")))?;

            let distance =
                distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            Ok(SearchResult {
                text: texts.value(row).to_string(),
                metadata,
                similarity_score: 1.0 - distance,
                distance,
            })
        })
        .collect()
}
