//! Chat-completions client contract tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cortech::AssistantError;
use cortech::assistant::{ChatMessage, ChatModel, MistralClient};
use cortech::config::LlmConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, config: LlmConfig) -> MistralClient {
    MistralClient::new(
        &LlmConfig {
            base_url: server.uri(),
            ..config
        },
        "mistral-test-key",
    )
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "object": "chat.completion",
        "model": "mistral-large-latest",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn request_carries_model_messages_and_bearer_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer mistral-test-key"))
        .and(body_partial_json(json!({
            "model": "mistral-large-latest",
            "stream": false,
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "Bonjour"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Salut !")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, LlmConfig::default())
        .complete(&[ChatMessage::system("sys"), ChatMessage::user("Bonjour")])
        .await
        .unwrap();
    assert_eq!(reply, "Salut !");
}

#[tokio::test]
async fn configured_sampling_options_are_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"max_tokens": 300, "model": "open-mistral-nemo"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let config = LlmConfig {
        model: "open-mistral-nemo".into(),
        max_tokens: Some(300),
        ..LlmConfig::default()
    };
    client(&server, config)
        .complete(&[ChatMessage::user("x")])
        .await
        .unwrap();
}

#[tokio::test]
async fn auth_failure_maps_to_llm_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Unauthorized", "request_id": "r"
        })))
        .mount(&server)
        .await;

    let err = client(&server, LlmConfig::default())
        .complete(&[ChatMessage::user("x")])
        .await
        .unwrap_err();
    match err {
        AssistantError::Llm(msg) => assert!(msg.contains("authentication failed"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn server_error_keeps_status_in_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = client(&server, LlmConfig::default())
        .complete(&[ChatMessage::user("x")])
        .await
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("503") && text.contains("upstream down"), "{text}");
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let result = client(&server, LlmConfig::default())
        .complete(&[ChatMessage::user("x")])
        .await;
    assert!(matches!(result, Err(AssistantError::Llm(_))));
}
