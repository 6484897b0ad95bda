//! Vector storage boundary for chunk embeddings.
//!
//! The pipelines talk to the vector database through the [`VectorStore`]
//! trait: append-only upserts on the ingestion side, nearest-neighbor search
//! on the query side. Two implementations ship with the crate:
//!
//! - [`http::HttpVectorStore`]: client for an external REST vector database
//!   (collection-scoped upsert and near-vector search).
//! - [`memory::InMemoryVectorStore`]: deterministic brute-force cosine
//!   store for tests and local development.
//!
//! Ordering is the store's native similarity ordering, closest first. The
//! core never reinterprets the distance metric; it carries the reported
//! score through as-is.

pub mod http;
pub mod memory;

pub use http::HttpVectorStore;
pub use memory::InMemoryVectorStore;

use async_trait::async_trait;

use crate::types::{Chunk, RagError, RetrievedChunk};

/// Interface to the vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Upserts each chunk as one record. Append-only from the pipeline's
    /// perspective; no update or delete semantics are required.
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<(), RagError>;

    /// Returns up to `limit` chunks in the store's closest-first ordering.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError>;
}
