//! Pipeline configuration and environment resolution.
//!
//! Configuration is plain data: each external provider gets an endpoint,
//! model name, credential, and bounded request timeout. Secrets are resolved
//! from the environment once, up front, so a missing credential fails the
//! invocation before any network call is attempted.

use std::time::Duration;

use url::Url;

use crate::types::{DEFAULT_EMBEDDING_DIM, RagError};

/// Maximum number of texts sent to the embedding provider per request.
pub const MAX_EMBED_BATCH: usize = 100;

/// Multiplier applied to the requested result count when querying the vector
/// store, giving the reranker a larger candidate pool.
pub const DEFAULT_OVER_FETCH_FACTOR: usize = 3;

/// Token ceiling handed to the external document chunker per segment.
pub const CHUNK_MAX_TOKENS: usize = 1024;

const DEFAULT_EMBEDDINGS_URL: &str = "https://api.jina.ai/v1/embeddings";
const DEFAULT_RERANK_URL: &str = "https://api.jina.ai/v1/rerank";
const DEFAULT_GENERATION_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const DEFAULT_EMBEDDINGS_MODEL: &str = "jina-embeddings-v4";
const DEFAULT_RERANK_MODEL: &str = "jina-reranker-v3";
const DEFAULT_GENERATION_MODEL: &str = "llama-4-maverick-17b-128e-instruct";

/// Endpoint, model, and credential for one model-provider API.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub endpoint: Url,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(endpoint: Url, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Connection settings for the external vector database.
#[derive(Clone, Debug)]
pub struct VectorStoreConfig {
    pub base_url: Url,
    pub api_key: String,
    pub collection: String,
    pub timeout: Duration,
}

impl VectorStoreConfig {
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
            collection: "books".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Top-level configuration for both pipelines.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub embeddings: ProviderConfig,
    pub rerank: ProviderConfig,
    pub generation: ProviderConfig,
    pub vector: VectorStoreConfig,
    /// Required embedding width; vectors of any other length are rejected.
    pub embedding_dim: usize,
    pub max_embed_batch: usize,
    pub over_fetch_factor: usize,
}

impl RagConfig {
    pub fn new(
        embeddings: ProviderConfig,
        rerank: ProviderConfig,
        generation: ProviderConfig,
        vector: VectorStoreConfig,
    ) -> Self {
        Self {
            embeddings,
            rerank,
            generation,
            vector,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            max_embed_batch: MAX_EMBED_BATCH,
            over_fetch_factor: DEFAULT_OVER_FETCH_FACTOR,
        }
    }

    #[must_use]
    pub fn with_embedding_dim(mut self, dim: usize) -> Self {
        self.embedding_dim = dim;
        self
    }

    #[must_use]
    pub fn with_over_fetch_factor(mut self, factor: usize) -> Self {
        self.over_fetch_factor = factor;
        self
    }

    /// Resolves the full configuration from the environment.
    ///
    /// Required (missing any of these is fatal before the first network
    /// call): `EMBEDDINGS_API_KEY` (shared with the reranker),
    /// `GENERATION_API_KEY`, `VECTOR_STORE_URL`, `VECTOR_STORE_API_KEY`.
    /// Endpoint URLs, model names, and the collection name have defaults
    /// matching the reference deployment and can be overridden with
    /// `EMBEDDINGS_URL`, `RERANK_URL`, `GENERATION_URL`,
    /// `EMBEDDINGS_MODEL`, `RERANK_MODEL`, `GENERATION_MODEL`, and
    /// `VECTOR_COLLECTION`.
    pub fn from_env() -> Result<Self, RagError> {
        dotenvy::dotenv().ok();

        let model_key = require_env("EMBEDDINGS_API_KEY")?;
        let generation_key = require_env("GENERATION_API_KEY")?;
        let vector_url = parse_url(&require_env("VECTOR_STORE_URL")?, "VECTOR_STORE_URL")?;
        let vector_key = require_env("VECTOR_STORE_API_KEY")?;

        let embeddings = ProviderConfig::new(
            env_url("EMBEDDINGS_URL", DEFAULT_EMBEDDINGS_URL)?,
            env_or("EMBEDDINGS_MODEL", DEFAULT_EMBEDDINGS_MODEL),
            model_key.clone(),
        )
        .with_timeout(Duration::from_secs(60));

        let rerank = ProviderConfig::new(
            env_url("RERANK_URL", DEFAULT_RERANK_URL)?,
            env_or("RERANK_MODEL", DEFAULT_RERANK_MODEL),
            model_key,
        );

        let generation = ProviderConfig::new(
            env_url("GENERATION_URL", DEFAULT_GENERATION_URL)?,
            env_or("GENERATION_MODEL", DEFAULT_GENERATION_MODEL),
            generation_key,
        );

        let vector = VectorStoreConfig::new(vector_url, vector_key)
            .with_collection(env_or("VECTOR_COLLECTION", "books"));

        Ok(Self::new(embeddings, rerank, generation, vector))
    }
}

fn require_env(name: &'static str) -> Result<String, RagError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(RagError::Configuration(format!(
            "missing required environment variable {name}"
        ))),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_url(name: &str, default: &str) -> Result<Url, RagError> {
    let raw = env_or(name, default);
    parse_url(&raw, name)
}

fn parse_url(raw: &str, name: &str) -> Result<Url, RagError> {
    Url::parse(raw)
        .map_err(|err| RagError::Configuration(format!("{name} is not a valid URL: {err}")))
}
