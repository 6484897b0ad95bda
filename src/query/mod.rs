//! Query pipeline: embed → over-fetch retrieval → rerank → grounded answer.
//!
//! One invocation runs Validated → Embedded → Retrieved →
//! [Empty | Reranked → Generated] → Completed, strictly sequentially. Zero
//! retrieved candidates is a valid terminal state that short-circuits to a
//! canned answer without touching the rerank or generation providers; any
//! provider failure aborts the invocation before an answer is emitted.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clients::{EmbeddingsClient, GenerationClient, RerankClient};
use crate::config::DEFAULT_OVER_FETCH_FACTOR;
use crate::stores::VectorStore;
use crate::types::{QueryResult, RagError, ScoredChunk};
use crate::workflow::{EventSink, StateStore, TOPIC_QUERY_COMPLETED};

/// Canned answer when retrieval finds nothing.
pub const NO_MATCH_ANSWER: &str =
    "I couldn't find any relevant information in the documents to answer your question.";

pub const DEFAULT_LIMIT: usize = 5;
pub const MAX_LIMIT: usize = 50;

/// One natural-language query submitted to the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Maximum number of supporting chunks in the answer, 1..=50.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// When set, the assembled result is persisted under this key before
    /// the completion signal fires.
    #[serde(rename = "stateKey", default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            state_key: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_state_key(mut self, key: impl Into<String>) -> Self {
        self.state_key = Some(key.into());
        self
    }

    fn validate(&self) -> Result<(), RagError> {
        if self.query.trim().is_empty() {
            return Err(RagError::Validation("query must not be empty".to_string()));
        }
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(RagError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Orchestrates the four-stage retrieval chain for one query at a time.
///
/// All external handles are owned per pipeline and scoped per invocation;
/// every exit path, including the early-empty result and errors, releases
/// them by dropping the invocation's locals.
pub struct QueryPipeline {
    embeddings: EmbeddingsClient,
    reranker: RerankClient,
    generator: GenerationClient,
    store: Arc<dyn VectorStore>,
    state: Arc<dyn StateStore>,
    events: Arc<dyn EventSink>,
    over_fetch_factor: usize,
}

impl QueryPipeline {
    pub fn new(
        embeddings: EmbeddingsClient,
        reranker: RerankClient,
        generator: GenerationClient,
        store: Arc<dyn VectorStore>,
        state: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            embeddings,
            reranker,
            generator,
            store,
            state,
            events,
            over_fetch_factor: DEFAULT_OVER_FETCH_FACTOR,
        }
    }

    /// Builds the pipeline from resolved configuration, talking to the
    /// configured external vector store.
    pub fn from_config(
        config: &crate::config::RagConfig,
        state: Arc<dyn StateStore>,
        events: Arc<dyn EventSink>,
    ) -> Result<Self, RagError> {
        let embeddings = EmbeddingsClient::new(config.embeddings.clone(), config.embedding_dim)?
            .with_max_batch(config.max_embed_batch);
        let reranker = RerankClient::new(config.rerank.clone())?;
        let generator = GenerationClient::new(config.generation.clone())?;
        let store = Arc::new(crate::stores::HttpVectorStore::new(config.vector.clone())?);
        Ok(
            Self::new(embeddings, reranker, generator, store, state, events)
                .with_over_fetch_factor(config.over_fetch_factor),
        )
    }

    /// Over-fetch multiplier for the retrieval stage. Rerank quality depends
    /// on a candidate pool larger than the final answer needs.
    #[must_use]
    pub fn with_over_fetch_factor(mut self, factor: usize) -> Self {
        self.over_fetch_factor = factor.max(1);
        self
    }

    /// Runs one query to completion and emits the completion signal.
    pub async fn run(&self, request: QueryRequest) -> Result<QueryResult, RagError> {
        request.validate()?;

        info!(
            query = %request.query.chars().take(100).collect::<String>(),
            limit = request.limit,
            "processing query"
        );

        let query_embedding = self.embeddings.embed_one(&request.query).await?;

        let search_limit = request.limit * self.over_fetch_factor;
        let candidates = self.store.search(&query_embedding, search_limit).await?;
        info!(found = candidates.len(), requested = search_limit, "retrieved candidates");

        let result = if candidates.is_empty() {
            // Valid terminal state, not an error: no rerank, no generation.
            QueryResult {
                query: request.query.clone(),
                answer: NO_MATCH_ANSWER.to_string(),
                chunks: Vec::new(),
            }
        } else {
            let ranked = self
                .reranker
                .rerank(&request.query, candidates, request.limit)
                .await?;
            let answer = self.generator.generate(&request.query, &ranked).await?;
            QueryResult {
                query: request.query.clone(),
                answer,
                chunks: ranked.into_iter().map(ScoredChunk::from).collect(),
            }
        };

        let payload =
            serde_json::to_value(&result).map_err(|err| RagError::Storage(err.to_string()))?;

        if let Some(key) = &request.state_key {
            self.state.put(key, payload.clone()).await?;
            info!(key = %key, "stored query result");
        }

        self.events.emit(TOPIC_QUERY_COMPLETED, payload).await?;
        Ok(result)
    }
}
