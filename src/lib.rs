//! ```text
//! Ingestion:
//!   files ──► ingestion::DocumentChunker ──► clients::EmbeddingsClient (≤100/batch)
//!                                                     │
//!                        workflow::StateStore ◄── Chunk assembly
//!                                 │
//!                                 └─► workflow::EventSink (rag.chunks.ready)
//!
//!   ingestion::publish_chunks ──► stores::VectorStore (upsert)
//!
//! Query:
//!   query ──► EmbeddingsClient ──► stores::VectorStore (limit × 3)
//!                                          │
//!                     clients::RerankClient (top limit)
//!                                          │
//!                     clients::GenerationClient (grounded, cited)
//!                                          │
//!              QueryResult ──► StateStore / EventSink (rag.query.completed)
//! ```
//!
//! Both pipelines are fail-fast: every provider call is a typed
//! request/response contract with a bounded timeout, and any upstream
//! failure aborts the whole invocation without persisting partial results.

pub mod clients;
pub mod config;
pub mod ingestion;
pub mod query;
pub mod stores;
pub mod types;
pub mod workflow;

pub use clients::{EmbeddingsClient, GenerationClient, RerankClient};
pub use config::{ProviderConfig, RagConfig, VectorStoreConfig};
pub use ingestion::{FileInput, IngestionPipeline, IngestionReceipt, StateKey};
pub use query::{QueryPipeline, QueryRequest};
pub use stores::{HttpVectorStore, InMemoryVectorStore, VectorStore};
pub use types::{Chunk, QueryResult, RagError, RankedChunk, RetrievedChunk, ScoredChunk};
pub use workflow::{EventSink, InMemoryStateStore, MemoryEventSink, StateStore};
