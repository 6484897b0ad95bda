//! Embedding client tests against a mock provider.

use httpmock::prelude::*;
use serde_json::json;
use url::Url;

use ragline::config::ProviderConfig;
use ragline::types::RagError;
use ragline::EmbeddingsClient;

fn client_for(server: &MockServer, dimension: usize) -> EmbeddingsClient {
    let endpoint = Url::parse(&server.url("/v1/embeddings")).unwrap();
    let config = ProviderConfig::new(endpoint, "test-embeddings", "test-key");
    EmbeddingsClient::new(config, dimension).unwrap()
}

fn vectors(count: usize, dimension: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| {
            let embedding: Vec<f32> = (0..dimension).map(|d| (i * 10 + d) as f32).collect();
            json!({ "index": i, "embedding": embedding })
        })
        .collect()
}

#[tokio::test]
async fn batch_returns_one_vector_per_input_in_order() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/embeddings")
            .header("authorization", "Bearer test-key")
            .body_contains("first text");
        then.status(200).json_body(json!({ "data": vectors(3, 4) }));
    });

    let client = client_for(&server, 4);
    let texts = vec![
        "first text".to_string(),
        "second text".to_string(),
        "third text".to_string(),
    ];
    let embeddings = client.embed_batch(&texts).await.unwrap();

    mock.assert();
    assert_eq!(embeddings.len(), 3);
    assert_eq!(embeddings[0], vec![0.0, 1.0, 2.0, 3.0]);
    assert_eq!(embeddings[2], vec![20.0, 21.0, 22.0, 23.0]);
}

#[tokio::test]
async fn oversized_input_is_split_into_sequential_sub_batches() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": vectors(2, 4) }));
    });

    let client = client_for(&server, 4).with_max_batch(2);
    let texts: Vec<String> = (0..4).map(|i| format!("text {i}")).collect();
    let embeddings = client.embed_batch(&texts).await.unwrap();

    mock.assert_hits(2);
    assert_eq!(embeddings.len(), 4);
}

#[tokio::test]
async fn embed_one_returns_a_single_vector() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": vectors(1, 4) }));
    });

    let client = client_for(&server, 4);
    let embedding = client.embed_one("What is X?").await.unwrap();
    assert_eq!(embedding.len(), 4);
}

#[tokio::test]
async fn count_mismatch_is_an_upstream_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": vectors(1, 4) }));
    });

    let client = client_for(&server, 4);
    let texts = vec!["a".to_string(), "b".to_string()];
    let err = client.embed_batch(&texts).await.unwrap_err();
    assert!(matches!(
        err,
        RagError::Upstream {
            service: "embeddings",
            ..
        }
    ));
}

#[tokio::test]
async fn missing_data_field_is_an_upstream_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "usage": { "total_tokens": 7 } }));
    });

    let client = client_for(&server, 4);
    let err = client
        .embed_batch(&["a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Upstream { .. }));
}

#[tokio::test]
async fn provider_http_error_is_an_upstream_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(500).body("internal error");
    });

    let client = client_for(&server, 4);
    let err = client
        .embed_batch(&["a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Upstream { .. }));
}

#[tokio::test]
async fn wrong_dimension_is_a_configuration_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/embeddings");
        then.status(200).json_body(json!({ "data": vectors(1, 3) }));
    });

    // Client expects dimension 4, provider answers with 3-wide vectors.
    let client = client_for(&server, 4);
    let err = client
        .embed_batch(&["a".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Configuration(_)));
}
