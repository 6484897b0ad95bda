//! Shared data model and error type for the RAG pipelines.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedding width produced by the default provider model.
///
/// The dimension is fixed process-wide; a vector of any other length is a
/// configuration fault and is rejected before anything reaches a store.
pub const DEFAULT_EMBEDDING_DIM: usize = 2048;

/// Errors surfaced by the ingestion and query pipelines.
///
/// The pipelines are fail-fast: no variant is retried or swallowed
/// internally, every failure aborts the invocation that produced it.
#[derive(Debug, Error)]
pub enum RagError {
    /// Malformed caller input, rejected before any external call.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Missing or inconsistent configuration (credential, URL, dimension).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An external service returned a non-success status or a payload
    /// missing required fields.
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// The document-to-segments converter failed.
    #[error("chunker error: {0}")]
    Chunking(String),

    /// State-store or vector-store operation failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(String),
}

impl RagError {
    /// Wraps an arbitrary error as an [`RagError::Upstream`] for `service`.
    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        RagError::Upstream {
            service,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for RagError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err.to_string())
    }
}

/// A unit of retrievable document text with its embedding attached.
///
/// Created once during ingestion and immutable afterwards; the query side
/// only ever reads chunks back as [`RetrievedChunk`] views.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Source document name with the extension stripped.
    pub title: String,
    /// Originating file name.
    pub source: String,
    /// 1-based page number; 1 when the converter did not report one.
    pub page: u32,
    pub embedding: Vec<f32>,
}

/// A chunk returned from vector search, carrying the store's native
/// similarity score (lower = closer) and no embedding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub title: String,
    pub source: String,
    pub page: u32,
    /// Store-defined distance; `None` when the store does not report one.
    pub distance: Option<f32>,
}

/// A retrieved chunk after the rerank pass.
///
/// List position defines final rank (index 0 = most relevant).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankedChunk {
    pub text: String,
    pub title: String,
    pub source: String,
    pub page: u32,
    pub distance: Option<f32>,
    /// Cross-encoder relevance, higher = more relevant.
    pub relevance: f32,
}

impl RankedChunk {
    pub(crate) fn from_retrieved(chunk: RetrievedChunk, relevance: f32) -> Self {
        Self {
            text: chunk.text,
            title: chunk.title,
            source: chunk.source,
            page: chunk.page,
            distance: chunk.distance,
            relevance,
        }
    }
}

/// Source location metadata exposed alongside each answer chunk.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub page: u32,
}

/// The wire shape of one supporting chunk inside a [`QueryResult`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub title: String,
    pub metadata: ChunkMetadata,
    /// Rerank relevance when available, otherwise the retrieval distance.
    pub score: Option<f32>,
}

impl From<RankedChunk> for ScoredChunk {
    fn from(chunk: RankedChunk) -> Self {
        ScoredChunk {
            text: chunk.text,
            title: chunk.title,
            metadata: ChunkMetadata {
                source: chunk.source,
                page: chunk.page,
            },
            score: Some(chunk.relevance),
        }
    }
}

/// Final output of the query pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryResult {
    pub query: String,
    pub answer: String,
    /// Supporting chunks ordered by descending score; empty when retrieval
    /// found nothing.
    pub chunks: Vec<ScoredChunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scored_chunk_prefers_relevance() {
        let ranked = RankedChunk {
            text: "body".into(),
            title: "Doc".into(),
            source: "doc.pdf".into(),
            page: 3,
            distance: Some(0.42),
            relevance: 0.91,
        };
        let scored = ScoredChunk::from(ranked);
        assert_eq!(scored.score, Some(0.91));
        assert_eq!(scored.metadata.page, 3);
        assert_eq!(scored.metadata.source, "doc.pdf");
    }

    #[test]
    fn upstream_helper_names_service() {
        let err = RagError::upstream("embeddings", "boom");
        assert_eq!(err.to_string(), "embeddings request failed: boom");
    }
}
