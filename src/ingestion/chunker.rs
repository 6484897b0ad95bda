//! External document-to-segments converter boundary.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::CHUNK_MAX_TOKENS;
use crate::types::RagError;

/// One segment emitted by the converter.
///
/// Concatenated segments approximate the source document; each segment stays
/// under the configured token ceiling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// 1-based page the segment came from, when the converter knows it.
    #[serde(default)]
    pub page_number: Option<u32>,
}

/// Interface to the external PDF-layout/segmentation service.
///
/// The pipeline does not implement chunking; it only requires an ordered
/// segment sequence. An empty sequence is a valid no-op, not an error.
#[async_trait]
pub trait DocumentChunker: Send + Sync {
    async fn chunk_file(&self, path: &Path) -> Result<Vec<Segment>, RagError>;
}

#[derive(Serialize)]
struct ChunkFileRequest<'a> {
    file_path: &'a str,
    max_tokens: usize,
}

#[derive(Deserialize)]
struct ChunkFileResponse {
    segments: Vec<Segment>,
}

/// HTTP client for a converter service exposing a single chunking endpoint.
#[derive(Clone, Debug)]
pub struct RestChunkerClient {
    http: reqwest::Client,
    endpoint: Url,
    max_tokens: usize,
}

impl RestChunkerClient {
    pub fn new(endpoint: Url) -> Result<Self, RagError> {
        // Document conversion can be slow for large PDFs.
        let http = crate::clients::build_http_client(Duration::from_secs(120))?;
        Ok(Self {
            http,
            endpoint,
            max_tokens: CHUNK_MAX_TOKENS,
        })
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl DocumentChunker for RestChunkerClient {
    async fn chunk_file(&self, path: &Path) -> Result<Vec<Segment>, RagError> {
        let file_path = path.to_string_lossy();
        let request = ChunkFileRequest {
            file_path: &file_path,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| RagError::Chunking(err.to_string()))?
            .error_for_status()
            .map_err(|err| RagError::Chunking(err.to_string()))?;

        let payload: ChunkFileResponse = response
            .json()
            .await
            .map_err(|err| RagError::Chunking(err.to_string()))?;

        Ok(payload.segments)
    }
}
