//! Client for the embeddings provider.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProviderConfig;
use crate::types::RagError;

const SERVICE: &str = "embeddings";

/// Stateless wrapper over the embeddings API.
///
/// Batches are capped at `max_batch` texts per request; larger inputs are
/// split into sequential sub-batches and the resulting vectors are
/// concatenated in input order, so output position `i` always corresponds to
/// input position `i`. Any non-success response or payload that does not
/// carry exactly one vector per input aborts the whole operation; partial
/// results are never returned.
#[derive(Clone, Debug)]
pub struct EmbeddingsClient {
    http: reqwest::Client,
    config: ProviderConfig,
    dimension: usize,
    max_batch: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    normalized: bool,
    embedding_type: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl EmbeddingsClient {
    pub fn new(config: ProviderConfig, dimension: usize) -> Result<Self, RagError> {
        let http = super::build_http_client(config.timeout)?;
        Ok(Self {
            http,
            config,
            dimension,
            max_batch: crate::config::MAX_EMBED_BATCH,
        })
    }

    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Embeds `texts`, returning one vector per input in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Err(RagError::Validation(
                "embed_batch requires at least one text".to_string(),
            ));
        }

        info!(count = texts.len(), "generating embeddings");

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch) {
            let mut produced = self.request_batch(batch).await?;
            vectors.append(&mut produced);
        }

        info!(count = vectors.len(), dim = self.dimension, "generated embeddings");
        Ok(vectors)
    }

    /// Embeds a single text, e.g. the user's query.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        // embed_batch guarantees one vector per input.
        Ok(vectors.remove(0))
    }

    async fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let request = EmbeddingsRequest {
            model: &self.config.model,
            input: batch,
            normalized: true,
            embedding_type: "float",
        };

        let response = self
            .http
            .post(self.config.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?
            .error_for_status()
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        if payload.data.len() != batch.len() {
            return Err(RagError::Upstream {
                service: SERVICE,
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    batch.len(),
                    payload.data.len()
                ),
            });
        }

        let mut vectors = Vec::with_capacity(payload.data.len());
        for item in payload.data {
            if item.embedding.len() != self.dimension {
                return Err(RagError::Configuration(format!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    item.embedding.len()
                )));
            }
            vectors.push(item.embedding);
        }
        Ok(vectors)
    }
}
