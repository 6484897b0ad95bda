//! Boundary to the event-bus / workflow-state substrate.
//!
//! The pipelines are invoked by an external workflow engine that persists
//! intermediate results under string keys and routes topic-addressed
//! messages between steps. This module pins down the two contracts the
//! pipelines need (a write-once keyed JSON store and a fire-and-forget
//! event emitter) plus in-memory implementations for tests and embedded
//! use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::RagError;

/// Emitted once per ingested file when its chunk set is persisted.
pub const TOPIC_CHUNKS_READY: &str = "rag.chunks.ready";

/// Emitted once per query invocation carrying the full [`QueryResult`](crate::types::QueryResult).
pub const TOPIC_QUERY_COMPLETED: &str = "rag.query.completed";

/// Keyed JSON store for intermediate pipeline results.
///
/// Keys are written once per ingestion job and read once by the downstream
/// consumer; the pipelines never overwrite or delete entries.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn put(&self, key: &str, value: Value) -> Result<(), RagError>;

    async fn get(&self, key: &str) -> Result<Option<Value>, RagError>;
}

/// One topic-addressed message handed to the workflow substrate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowEvent {
    pub topic: String,
    pub payload: Value,
}

/// Completion/readiness signal emitter.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, topic: &str, payload: Value) -> Result<(), RagError>;
}

/// In-memory state store backed by a mutex-guarded map.
#[derive(Clone, Default)]
pub struct InMemoryStateStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn put(&self, key: &str, value: Value) -> Result<(), RagError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, RagError> {
        Ok(self.entries.lock().get(key).cloned())
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.events.lock().clear()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn emit(&self, topic: &str, payload: Value) -> Result<(), RagError> {
        self.events.lock().push(WorkflowEvent {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}
