//! Client for the cross-encoder rerank provider.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ProviderConfig;
use crate::types::{RagError, RankedChunk, RetrievedChunk};

const SERVICE: &str = "rerank";

/// Stateless wrapper over the rerank API.
///
/// The provider scores `(query, document_text)` pairs; this client's job is
/// to re-index the returned `{index, relevance_score}` pairs back onto the
/// submitted candidates and drop everything the provider did not select. A
/// rerank failure is fatal to the query; there is no fallback to the
/// unranked retrieval order.
#[derive(Clone, Debug)]
pub struct RerankClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    top_n: usize,
    return_documents: bool,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

impl RerankClient {
    pub fn new(config: ProviderConfig) -> Result<Self, RagError> {
        let http = super::build_http_client(config.timeout)?;
        Ok(Self { http, config })
    }

    /// Reranks `candidates` against `query`, keeping at most `top_n` chunks
    /// ordered by descending relevance.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedChunk>,
        top_n: usize,
    ) -> Result<Vec<RankedChunk>, RagError> {
        if candidates.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }

        info!(candidates = candidates.len(), top_n, "reranking candidates");

        let request = RerankRequest {
            model: &self.config.model,
            query,
            documents: candidates.iter().map(|c| c.text.as_str()).collect(),
            top_n,
            return_documents: false,
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

        let payload: RerankResponse = response
            .json()
            .await
            .map_err(|err| RagError::upstream(SERVICE, err))?;

        // Indices refer to positions in the candidates list as submitted.
        let mut slots: Vec<Option<RetrievedChunk>> = candidates.into_iter().map(Some).collect();
        let mut ranked = Vec::with_capacity(payload.results.len().min(top_n));
        for result in payload.results {
            let chunk = slots
                .get_mut(result.index)
                .and_then(Option::take)
                .ok_or_else(|| RagError::Upstream {
                    service: SERVICE,
                    message: format!("result index {} is out of range or duplicated", result.index),
                })?;
            ranked.push(RankedChunk::from_retrieved(chunk, result.relevance_score));
        }

        // Providers return descending relevance; enforce the contract anyway.
        ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
        ranked.truncate(top_n);

        info!(kept = ranked.len(), "rerank complete");
        Ok(ranked)
    }
}
