//! End-to-end query pipeline scenarios with mock providers and in-memory
//! stores.

use std::sync::Arc;

use httpmock::prelude::*;
use parking_lot::Mutex;
use serde_json::json;
use url::Url;

use async_trait::async_trait;
use ragline::config::ProviderConfig;
use ragline::query::{NO_MATCH_ANSWER, QueryPipeline, QueryRequest};
use ragline::stores::VectorStore;
use ragline::types::{Chunk, RagError, RetrievedChunk};
use ragline::workflow::{StateStore, TOPIC_QUERY_COMPLETED};
use ragline::{
    EmbeddingsClient, GenerationClient, InMemoryStateStore, InMemoryVectorStore, MemoryEventSink,
    RerankClient,
};

const DIM: usize = 4;

/// Wraps a store to observe the limit the pipeline requested.
#[derive(Clone)]
struct RecordingStore {
    inner: InMemoryVectorStore,
    last_limit: Arc<Mutex<Option<usize>>>,
}

impl RecordingStore {
    fn new(inner: InMemoryVectorStore) -> Self {
        Self {
            inner,
            last_limit: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl VectorStore for RecordingStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<(), RagError> {
        self.inner.upsert_chunks(chunks).await
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        *self.last_limit.lock() = Some(limit);
        self.inner.search(query_embedding, limit).await
    }
}

struct Mocks {
    embed: httpmock::Mock<'static>,
    rerank: httpmock::Mock<'static>,
    generate: httpmock::Mock<'static>,
}

async fn seeded_store(count: usize) -> InMemoryVectorStore {
    let store = InMemoryVectorStore::new();
    let chunks: Vec<Chunk> = (0..count)
        .map(|i| {
            // Distinct directions so retrieval ordering is deterministic.
            let angle = i as f32 * 0.05;
            Chunk {
                text: format!("passage {i}"),
                title: format!("Doc {i}"),
                source: format!("doc{i}.pdf"),
                page: i as u32 + 1,
                embedding: vec![angle.cos(), angle.sin(), 0.0, 0.0],
            }
        })
        .collect();
    store.upsert_chunks(&chunks).await.unwrap();
    store
}

fn build_pipeline(
    server: &MockServer,
    store: Arc<dyn VectorStore>,
) -> (QueryPipeline, Arc<InMemoryStateStore>, MemoryEventSink) {
    let embeddings = EmbeddingsClient::new(
        ProviderConfig::new(
            Url::parse(&server.url("/v1/embeddings")).unwrap(),
            "embed-model",
            "key",
        ),
        DIM,
    )
    .unwrap();
    let reranker = RerankClient::new(ProviderConfig::new(
        Url::parse(&server.url("/v1/rerank")).unwrap(),
        "rerank-model",
        "key",
    ))
    .unwrap();
    let generator = GenerationClient::new(ProviderConfig::new(
        Url::parse(&server.url("/v1/chat/completions")).unwrap(),
        "chat-model",
        "key",
    ))
    .unwrap();

    let state = Arc::new(InMemoryStateStore::new());
    let events = MemoryEventSink::new();
    let pipeline = QueryPipeline::new(
        embeddings,
        reranker,
        generator,
        store,
        state.clone(),
        Arc::new(events.clone()),
    );
    (pipeline, state, events)
}

fn mock_happy_path(server: &'static MockServer) -> Mocks {
    let embed = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({ "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.0, 0.0] } ] }));
    });
    let rerank = server.mock(|when, then| {
        when.method(POST).path("/v1/rerank");
        then.status(200).json_body(json!({
            "results": [
                { "index": 3, "relevance_score": 0.97 },
                { "index": 0, "relevance_score": 0.80 },
                { "index": 7, "relevance_score": 0.65 },
                { "index": 1, "relevance_score": 0.40 },
                { "index": 5, "relevance_score": 0.22 },
            ]
        }));
    });
    let generate = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("passage 3");
        then.status(200).json_body(json!({
            "choices": [ { "message": { "role": "assistant", "content": "Grounded answer." } } ]
        }));
    });
    Mocks {
        embed,
        rerank,
        generate,
    }
}

fn leak_server() -> &'static MockServer {
    Box::leak(Box::new(MockServer::start()))
}

#[tokio::test]
async fn full_query_flow_returns_limit_chunks_in_descending_score_order() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let server = leak_server();
    let mocks = mock_happy_path(server);

    let store = RecordingStore::new(seeded_store(15).await);
    let limits = store.last_limit.clone();
    let (pipeline, _state, events) = build_pipeline(server, Arc::new(store));

    let result = pipeline
        .run(QueryRequest::new("What is X?").with_limit(5))
        .await
        .unwrap();

    mocks.embed.assert();
    mocks.rerank.assert();
    mocks.generate.assert();

    // Retrieval over-fetches 3x the requested limit.
    assert_eq!(*limits.lock(), Some(15));

    assert_eq!(result.answer, "Grounded answer.");
    assert_eq!(result.chunks.len(), 5);
    let scores: Vec<f32> = result.chunks.iter().map(|c| c.score.unwrap()).collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
    assert_eq!(scores[0], 0.97);

    let emitted = events.snapshot();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].topic, TOPIC_QUERY_COMPLETED);
    assert_eq!(emitted[0].payload["answer"], "Grounded answer.");
    assert_eq!(emitted[0].payload["chunks"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn zero_candidates_short_circuit_to_canned_answer() {
    let server = leak_server();
    let embed = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({ "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.0, 0.0] } ] }));
    });
    let rerank = server.mock(|when, then| {
        when.method(POST).path("/v1/rerank");
        then.status(200).json_body(json!({ "results": [] }));
    });
    let generate = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({ "choices": [] }));
    });

    let (pipeline, _state, events) =
        build_pipeline(server, Arc::new(InMemoryVectorStore::new()));

    let result = pipeline
        .run(QueryRequest::new("What is X?").with_limit(5))
        .await
        .unwrap();

    embed.assert();
    // Neither rerank nor generation is ever called.
    rerank.assert_hits(0);
    generate.assert_hits(0);

    assert_eq!(result.answer, NO_MATCH_ANSWER);
    assert!(result.chunks.is_empty());

    // The empty result is still a completed invocation.
    let emitted = events.snapshot();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].topic, TOPIC_QUERY_COMPLETED);
}

#[tokio::test]
async fn invalid_limit_fails_before_any_network_call() {
    let server = leak_server();
    let embed = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": [] }));
    });

    let (pipeline, _state, events) =
        build_pipeline(server, Arc::new(InMemoryVectorStore::new()));

    let err = pipeline
        .run(QueryRequest::new("What is X?").with_limit(0))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Validation(_)));

    let err = pipeline
        .run(QueryRequest::new("What is X?").with_limit(51))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Validation(_)));

    embed.assert_hits(0);
    assert!(events.snapshot().is_empty());
}

#[tokio::test]
async fn rerank_failure_aborts_before_any_answer_is_emitted() {
    let server = leak_server();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200)
            .json_body(json!({ "data": [ { "index": 0, "embedding": [1.0, 0.0, 0.0, 0.0] } ] }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/v1/rerank");
        then.status(503);
    });
    let generate = server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({ "choices": [] }));
    });

    let (pipeline, state, events) = build_pipeline(server, Arc::new(seeded_store(3).await));

    let err = pipeline
        .run(
            QueryRequest::new("What is X?")
                .with_limit(2)
                .with_state_key("result-key"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RagError::Upstream { service: "rerank", .. }));
    generate.assert_hits(0);
    assert!(state.get("result-key").await.unwrap().is_none());
    assert!(events.snapshot().is_empty());
}

#[tokio::test]
async fn result_is_persisted_under_the_caller_supplied_key() {
    let server = leak_server();
    mock_happy_path(server);

    let (pipeline, state, _events) = build_pipeline(server, Arc::new(seeded_store(15).await));

    let result = pipeline
        .run(
            QueryRequest::new("What is X?")
                .with_limit(5)
                .with_state_key("query-123"),
        )
        .await
        .unwrap();

    let stored = state.get("query-123").await.unwrap().unwrap();
    assert_eq!(stored["answer"], result.answer);
    assert_eq!(stored["query"], "What is X?");
    assert_eq!(
        stored["chunks"].as_array().unwrap().len(),
        result.chunks.len()
    );
    // Wire shape nests source and page under metadata.
    assert!(stored["chunks"][0]["metadata"]["source"].is_string());
    assert!(stored["chunks"][0]["metadata"]["page"].is_number());
}
