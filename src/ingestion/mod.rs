//! Ingestion pipeline: file → segments → embeddings → persisted chunk set.
//!
//! For each submitted file the pipeline runs Received → Converted →
//! Embedded → Persisted → Completed, failing the whole invocation on the
//! first error at any step. No partial chunk set is ever persisted or
//! signalled: a file's chunks reach the state store only after every
//! segment embedded successfully.

pub mod chunker;
pub mod key;

pub use chunker::{DocumentChunker, RestChunkerClient, Segment};
pub use key::{StateKey, file_stem, sanitize_name};

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clients::EmbeddingsClient;
use crate::stores::VectorStore;
use crate::types::{Chunk, RagError};
use crate::workflow::{EventSink, StateStore, TOPIC_CHUNKS_READY};

/// One file submitted for ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInput {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
}

impl FileInput {
    pub fn new(file_path: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            file_name: file_name.into(),
        }
    }
}

/// Readiness signal payload for one ingested file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestionReceipt {
    #[serde(rename = "stateKey")]
    pub state_key: StateKey,
    pub filename: String,
    #[serde(rename = "chunkCount")]
    pub chunk_count: usize,
}

/// Orchestrates chunking, batched embedding, and chunk-set persistence.
pub struct IngestionPipeline {
    chunker: Arc<dyn DocumentChunker>,
    embeddings: EmbeddingsClient,
    state: Arc<dyn StateStore>,
    events: Arc<dyn EventSink>,
}

impl IngestionPipeline {
    pub fn new(
        chunker: Arc<dyn DocumentChunker>,
        embeddings: EmbeddingsClient,
        state: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            chunker,
            embeddings,
            state,
            events,
        }
    }

    /// Builds the pipeline from resolved configuration.
    pub fn from_config(
        config: &crate::config::RagConfig,
        chunker: Arc<dyn DocumentChunker>,
        state: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, RagError> {
        let embeddings = EmbeddingsClient::new(config.embeddings.clone(), config.embedding_dim)?
            .with_max_batch(config.max_embed_batch);
        Ok(Self::new(chunker, embeddings, state, events))
    }

    /// Ingests each file in order, returning one receipt per file.
    ///
    /// Files are processed independently but the batch is all-or-nothing:
    /// the first failing file aborts the invocation with its error.
    pub async fn ingest(&self, files: &[FileInput]) -> Result<Vec<IngestionReceipt>, RagError> {
        validate_files(files)?;

        let mut receipts = Vec::with_capacity(files.len());
        for file in files {
            receipts.push(self.ingest_file(file).await?);
        }
        Ok(receipts)
    }

    async fn ingest_file(&self, file: &FileInput) -> Result<IngestionReceipt, RagError> {
        info!(file = %file.file_name, "processing file");

        let segments = self.chunker.chunk_file(Path::new(&file.file_path)).await?;
        info!(segments = segments.len(), "converted file to segments");

        // A converter may legitimately emit nothing (e.g. an empty
        // document); the pipeline still completes and reports count 0.
        let chunks = if segments.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            let embeddings = self.embeddings.embed_batch(&texts).await?;

            let title = file_stem(&file.file_name).to_string();
            segments
                .into_iter()
                .zip(embeddings)
                .map(|(segment, embedding)| Chunk {
                    text: segment.text,
                    title: title.clone(),
                    source: file.file_name.clone(),
                    page: segment.page_number.unwrap_or(1).max(1),
                    embedding,
                })
                .collect()
        };

        let state_key = StateKey::derive(&file.file_name, Utc::now());
        let value =
            serde_json::to_value(&chunks).map_err(|err| RagError::Storage(err.to_string()))?;
        self.state.put(state_key.as_str(), value).await?;
        info!(key = %state_key, count = chunks.len(), "persisted chunk set");

        let receipt = IngestionReceipt {
            state_key,
            filename: file.file_name.clone(),
            chunk_count: chunks.len(),
        };
        let payload =
            serde_json::to_value(&receipt).map_err(|err| RagError::Storage(err.to_string()))?;
        self.events.emit(TOPIC_CHUNKS_READY, payload).await?;

        Ok(receipt)
    }
}

/// Loads a persisted chunk set and upserts it into the vector store.
///
/// This is the downstream consumer of the readiness signal. Embedding
/// dimensions are re-checked at the storage boundary so a corrupted chunk
/// set can never reach the vector database.
pub async fn publish_chunks(
    state: &dyn StateStore,
    store: &dyn VectorStore,
    state_key: &StateKey,
    expected_dim: usize,
) -> Result<usize, RagError> {
    let value = state
        .get(state_key.as_str())
        .await?
        .ok_or_else(|| RagError::Storage(format!("no chunk set under key {state_key}")))?;
    let chunks: Vec<Chunk> =
        serde_json::from_value(value).map_err(|err| RagError::Storage(err.to_string()))?;

    for chunk in &chunks {
        if chunk.embedding.len() != expected_dim {
            return Err(RagError::Configuration(format!(
                "embedding dimension mismatch: expected {}, got {}",
                expected_dim,
                chunk.embedding.len()
            )));
        }
    }

    store.upsert_chunks(&chunks).await?;
    info!(key = %state_key, count = chunks.len(), "published chunk set to vector store");
    Ok(chunks.len())
}

fn validate_files(files: &[FileInput]) -> Result<(), RagError> {
    if files.is_empty() {
        return Err(RagError::Validation(
            "ingestion requires at least one file".to_string(),
        ));
    }
    for file in files {
        if file.file_path.trim().is_empty() || file.file_name.trim().is_empty() {
            return Err(RagError::Validation(
                "each file needs a non-empty filePath and fileName".to_string(),
            ));
        }
    }
    Ok(())
}
