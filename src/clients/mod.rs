//! Typed HTTP clients for the external model providers.
//!
//! Each provider call is a fixed request/response contract: requests are
//! serialized from concrete structs and responses are deserialized into
//! structs that name every required field, so a malformed payload fails the
//! invocation instead of flowing downstream. All clients enforce the bounded
//! timeout from their [`ProviderConfig`](crate::config::ProviderConfig) and
//! never retry.

pub mod embeddings;
pub mod generation;
pub mod rerank;

pub use embeddings::EmbeddingsClient;
pub use generation::GenerationClient;
pub use rerank::RerankClient;

use std::time::Duration;

use crate::types::RagError;

/// Builds the shared reqwest client with rustls and a per-call timeout.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, RagError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()
        .map_err(|err| RagError::Configuration(format!("failed to build HTTP client: {err}")))
}
