//! Integration tests for the truncation retry over HTTP using wiremock.

use mintel_core::LlmSettings;
use mintel_llm::{complete_and_parse, AnthropicClient, RetryPolicy, TRUNCATION_RETRY_NOTICE};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> LlmSettings {
    LlmSettings {
        api_key: Some("sk-test".to_owned()),
        model: "claude-sonnet-4-6".to_owned(),
        max_tokens: 4096,
        max_tokens_ceiling: 8192,
        temperature: 0.2,
        timeout_secs: 5,
    }
}

fn reply(text: &str, stop_reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "content": [{ "type": "text", "text": text }],
        "stop_reason": stop_reason
    }))
}

#[tokio::test]
async fn truncated_then_complete() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({ "max_tokens": 4096 })))
        .respond_with(reply("{\"executive_summary\": \"corta", "max_tokens"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(serde_json::json!({ "max_tokens": 6144 })))
        .respond_with(reply("{\"executive_summary\": \"completa\"}", "end_turn"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url(&settings(), &server.uri()).expect("client");
    let value = complete_and_parse(&client, "analiza", 4096, RetryPolicy::single_retry(8192))
        .await
        .expect("second attempt decodes");
    assert_eq!(value["executive_summary"], "completa");

    let requests = server.received_requests().await.expect("recording enabled");
    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).expect("json body");
    let content = second["messages"][0]["content"].as_str().expect("content");
    assert!(content.ends_with(TRUNCATION_RETRY_NOTICE));
}

#[tokio::test]
async fn truncated_twice_fails_after_exactly_two_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(reply("[{\"a\": 1}, {\"b\"", "max_tokens"))
        .expect(2)
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url(&settings(), &server.uri()).expect("client");
    let err = complete_and_parse(&client, "analiza", 4096, RetryPolicy::single_retry(8192))
        .await
        .expect_err("both attempts truncated");
    assert!(err.is_incomplete());
}

#[tokio::test]
async fn api_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(1)
        .mount(&server)
        .await;

    let client = AnthropicClient::with_base_url(&settings(), &server.uri()).expect("client");
    let err = complete_and_parse(&client, "x", 4096, RetryPolicy::single_retry(8192))
        .await
        .expect_err("api error");
    assert!(err.to_string().contains("400"));
}
