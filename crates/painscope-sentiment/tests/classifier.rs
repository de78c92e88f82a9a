//! Integration tests for `ClassifierClient` using wiremock HTTP mocks.

use std::time::Duration;

use painscope_core::SentimentLabel;
use painscope_sentiment::{ClassifierClient, ClassifierConfig, SentimentError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer) -> ClassifierConfig {
    ClassifierConfig {
        run_url: format!("{}/ai/run/sentiment", server.uri()),
        api_token: "test-token".to_owned(),
    }
}

#[tokio::test]
async fn negative_classification_maps_label_and_confidence() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": [ { "label": "NEGATIVE", "score": 0.983 } ],
            "success": true
        })))
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let classification = client
        .classify("I hate how slow this app is")
        .await
        .expect("classify");

    assert_eq!(classification.label, SentimentLabel::Negative);
    assert!((classification.confidence - 0.983).abs() < 1e-9);
}

#[tokio::test]
async fn input_is_truncated_to_the_model_window() {
    let server = MockServer::start().await;

    let long_text = "a".repeat(5000);
    let expected: String = long_text.chars().take(1000).collect();

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .and(body_partial_json(serde_json::json!({ "text": expected })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": [ { "label": "POSITIVE", "score": 0.6 } ]
        })))
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let classification = client.classify(&long_text).await.expect("classify");
    assert_eq!(classification.label, SentimentLabel::Positive);
}

#[tokio::test]
async fn timeout_is_a_transient_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"result": []}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 1).expect("client");
    let result = client.classify("anything").await;

    let err = result.expect_err("expected a timeout");
    assert!(matches!(err, SentimentError::Http(_)));
    assert!(err.is_transient(), "timeouts must be retryable");
}

#[tokio::test]
async fn rejected_credentials_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let err = client.classify("anything").await.expect_err("expected auth error");
    assert!(matches!(err, SentimentError::Auth(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rate_limit_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let err = client.classify("anything").await.expect_err("expected rate limit");
    assert!(matches!(err, SentimentError::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn malformed_response_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let err = client.classify("anything").await.expect_err("expected parse error");
    assert!(matches!(err, SentimentError::Deserialize { .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn empty_result_set_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ai/run/sentiment"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"result": []})),
        )
        .mount(&server)
        .await;

    let client = ClassifierClient::new(&test_config(&server), 30).expect("client");
    let err = client.classify("anything").await.expect_err("expected api error");
    assert!(matches!(err, SentimentError::Api(_)));
}
