//! Brute-force in-memory vector store.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::{Chunk, RagError, RetrievedChunk};

use super::VectorStore;

/// Deterministic cosine-distance store for tests and local development.
///
/// Search is an exact linear scan, so an exact embedding match always comes
/// back first with distance 0.
#[derive(Clone, Default)]
pub struct InMemoryVectorStore {
    records: Arc<Mutex<Vec<Chunk>>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<(), RagError> {
        self.records.lock().extend_from_slice(chunks);
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let records = self.records.lock();
        let mut scored = Vec::with_capacity(records.len());
        for record in records.iter() {
            if record.embedding.len() != query_embedding.len() {
                return Err(RagError::Configuration(format!(
                    "embedding dimension mismatch: stored {}, query {}",
                    record.embedding.len(),
                    query_embedding.len()
                )));
            }
            let distance = cosine_distance(&record.embedding, query_embedding);
            scored.push((record.clone(), distance));
        }

        scored.sort_by(|a, b| a.1.total_cmp(&b.1));
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(chunk, distance)| RetrievedChunk {
                text: chunk.text,
                title: chunk.title,
                source: chunk.source,
                page: chunk.page,
                distance: Some(distance),
            })
            .collect())
    }
}

/// Cosine distance in `[0, 2]`; 0 means identical direction.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
