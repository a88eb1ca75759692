use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        base_url: format!("{}/v1", server.uri()),
        chat_model: "gpt-4o".to_string(),
        timeout_seconds: 5,
        ..ProviderConfig::default()
    }
}

#[test]
fn messages_serialize_with_lowercase_roles() {
    let messages = [
        ChatMessage::system("Be brief."),
        ChatMessage::user("Ahoj"),
        ChatMessage::assistant("Dobrý deň"),
    ];
    let value = serde_json::to_value(messages).expect("should serialize");
    assert_eq!(
        value,
        json!([
            { "role": "system", "content": "Be brief." },
            { "role": "user", "content": "Ahoj" },
            { "role": "assistant", "content": "Dobrý deň" }
        ])
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn completion_returns_first_choice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [ { "role": "user", "content": "Ktoré endpointy existujú?" } ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "message": { "role": "assistant", "content": "GET /products" },
                    "finish_reason": "stop"
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&provider_for(&server), "sk-test").expect("client");
    let reply = client
        .complete(vec![ChatMessage::user("Ktoré endpointy existujú?")])
        .await
        .expect("completion should succeed");

    assert_eq!(reply, "GET /products");
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_choices_are_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let client = CompletionClient::new(&provider_for(&server), "sk-test").expect("client");
    let err = client
        .complete(vec![ChatMessage::user("hello")])
        .await
        .expect_err("no choices must fail");

    assert!(matches!(err, AssistantError::Completion(_)));
    assert!(err.to_string().contains("no message"));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = CompletionClient::new(&provider_for(&server), "sk-test").expect("client");
    let err = client
        .complete(vec![ChatMessage::user("hello")])
        .await
        .expect_err("500 must fail");

    assert!(err.to_string().starts_with("Completion error:"));
}
