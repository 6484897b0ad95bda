//! REST client for an external vector database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::config::VectorStoreConfig;
use crate::types::{Chunk, RagError, RetrievedChunk};

use super::VectorStore;

const SERVICE: &str = "vector-store";

/// Vector-store client speaking a collection-scoped points API:
/// `PUT collections/{c}/points` for upserts and
/// `POST collections/{c}/points/search` for nearest-neighbor search.
///
/// The store schema is one collection with `text`, `title`, `source`, and
/// `page` payload fields plus the fixed-dimension vector column. Records
/// missing payload fields come back with defaults (`"Unknown"` title,
/// `"unknown"` source, page 1) rather than failing the query.
#[derive(Clone, Debug)]
pub struct HttpVectorStore {
    http: reqwest::Client,
    config: VectorStoreConfig,
}

#[derive(Serialize)]
struct UpsertRequest {
    points: Vec<PointRecord>,
}

#[derive(Serialize)]
struct PointRecord {
    id: Uuid,
    vector: Vec<f32>,
    payload: ChunkPayload,
}

#[derive(Serialize)]
struct ChunkPayload {
    text: String,
    title: String,
    source: String,
    page: u32,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    #[serde(default)]
    payload: RetrievedPayload,
    score: Option<f32>,
}

#[derive(Deserialize, Default)]
struct RetrievedPayload {
    text: Option<String>,
    title: Option<String>,
    source: Option<String>,
    page: Option<u32>,
}

impl HttpVectorStore {
    pub fn new(config: VectorStoreConfig) -> Result<Self, RagError> {
        let http = crate::clients::build_http_client(config.timeout)?;
        Ok(Self { http, config })
    }

    fn points_url(&self, suffix: &str) -> Result<Url, RagError> {
        let path = format!("collections/{}/points{}", self.config.collection, suffix);
        self.config
            .base_url
            .join(&path)
            .map_err(|err| RagError::Configuration(format!("invalid vector store URL: {err}")))
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<(), RagError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let request = UpsertRequest {
            points: chunks
                .iter()
                .map(|chunk| PointRecord {
                    id: Uuid::new_v4(),
                    vector: chunk.embedding.clone(),
                    payload: ChunkPayload {
                        text: chunk.text.clone(),
                        title: chunk.title.clone(),
                        source: chunk.source.clone(),
                        page: chunk.page,
                    },
                })
                .collect(),
        };

        self.http
            .put(self.points_url("")?)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?
            .error_for_status()
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        info!(
            count = chunks.len(),
            collection = %self.config.collection,
            "upserted chunks"
        );
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let request = SearchRequest {
            vector: query_embedding,
            limit,
            with_payload: true,
        };

        let response = self
            .http
            .post(self.points_url("/search")?)
            .header("api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?
            .error_for_status()
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        let chunks = payload
            .result
            .into_iter()
            .map(|point| RetrievedChunk {
                text: point.payload.text.unwrap_or_default(),
                title: point.payload.title.unwrap_or_else(|| "Unknown".to_string()),
                source: point
                    .payload
                    .source
                    .unwrap_or_else(|| "unknown".to_string()),
                page: point.payload.page.unwrap_or(1),
                distance: point.score,
            })
            .collect::<Vec<_>>();

        info!(found = chunks.len(), "vector search complete");
        Ok(chunks)
    }
}
