//! End-to-end streaming tests against a mock HTTP server.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flynn_core::error::{DEFAULT_ERROR_MESSAGE, ErrorDetails};
use flynn_core::listener::CompletionEventListener;
use flynn_core::models::{ChatCompletionModel, TextCompletionModel};
use flynn_core::request::{ChatCompletionRequest, ChatMessage, TextCompletionRequest};
use flynn_core::retry::RetryPolicy;
use flynn_openai::{AzureClient, AzureConfig, OpenAiClient, OpenAiConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Collector {
    fragments: Vec<String>,
    completed: Option<String>,
    errors: Vec<ErrorDetails>,
}

impl CompletionEventListener for Collector {
    fn on_message(&mut self, message: &str) {
        self.fragments.push(message.into());
    }
    fn on_complete(&mut self, message: &str) {
        self.completed = Some(message.into());
    }
    fn on_error(&mut self, error: &ErrorDetails) {
        self.errors.push(error.clone());
    }
}

fn sse_body(frames: &[&str]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str("data: ");
        body.push_str(frame);
        body.push_str("\n\n");
    }
    body
}

fn chat_sse_response() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        sse_body(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"Hello"}}]}"#,
            r#"{"choices":[{"delta":{"content":"!"}}]}"#,
            "[DONE]",
        ]),
        "text/event-stream",
    )
}

fn azure_client(server: &MockServer) -> AzureClient {
    let mut config = AzureConfig::new(
        "TEST_API_KEY",
        "TEST_RESOURCE",
        "TEST_DEPLOYMENT_ID",
        "TEST_API_VERSION",
    );
    config.base_url = Some(server.uri());
    AzureClient::new(config).unwrap()
}

fn chat_request() -> ChatCompletionRequest {
    ChatCompletionRequest::builder(
        ChatCompletionModel::Gpt35Turbo,
        vec![ChatMessage::user("TEST_PROMPT")],
    )
    .max_tokens(500)
    .temperature(0.5)
    .presence_penalty(0.1)
    .frequency_penalty(0.1)
    .build()
}

// ─────────────────────────────────────────────────────────────────────────────
// Streaming
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn azure_chat_completion_streams() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/chat/completions"))
        .and(query_param("api-version", "TEST_API_VERSION"))
        .and(header("Authorization", "Bearer TEST_API_KEY"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "temperature": 0.5,
            "stream": true,
            "max_tokens": 500,
            "frequency_penalty": 0.1,
            "presence_penalty": 0.1,
            "messages": [{"role": "user", "content": "TEST_PROMPT"}],
        })))
        .respond_with(chat_sse_response())
        .expect(1)
        .mount(&server)
        .await;

    let mut config = AzureConfig::new(
        "TEST_API_KEY",
        "TEST_RESOURCE",
        "TEST_DEPLOYMENT_ID",
        "TEST_API_VERSION",
    );
    config.active_directory_auth = true;
    config.base_url = Some(server.uri());
    let client = AzureClient::new(config).unwrap();

    let mut collector = Collector::default();
    client.stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.fragments, vec!["", "Hello", "!"]);
    assert_eq!(collector.completed.as_deref(), Some("Hello!"));
    assert!(collector.errors.is_empty());
}

#[tokio::test]
async fn azure_text_completion_streams() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/completions"))
        .and(query_param("api-version", "TEST_API_VERSION"))
        .and(header("Api-key", "TEST_API_KEY"))
        .and(body_partial_json(serde_json::json!({
            "model": "text-davinci-003",
            "prompt": "TEST_PROMPT",
            "stop": [" Human:", " AI:"],
            "temperature": 0.1,
            "stream": true,
            "max_tokens": 1000,
            "frequency_penalty": 0.2,
            "presence_penalty": 0.2,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[
                r#"{"choices":[{"text":"He"}]}"#,
                r#"{"choices":[{"text":"llo"}]}"#,
                r#"{"choices":[{"text":"!"}]}"#,
                "[DONE]",
            ]),
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let request = TextCompletionRequest::builder(TextCompletionModel::Davinci, "TEST_PROMPT")
        .stop(vec![" Human:".into(), " AI:".into()])
        .max_tokens(1000)
        .temperature(0.1)
        .presence_penalty(0.2)
        .frequency_penalty(0.2)
        .build();

    let mut collector = Collector::default();
    azure_client(&server).stream_completion(&request, &mut collector).await;

    assert_eq!(collector.fragments, vec!["He", "llo", "!"]);
    assert_eq!(collector.completed.as_deref(), Some("Hello!"));
    assert!(collector.errors.is_empty());
}

#[tokio::test]
async fn openai_chat_completion_streams() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .respond_with(chat_sse_response())
        .expect(1)
        .mount(&server)
        .await;

    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = Some(server.uri());
    let client = OpenAiClient::new(config).unwrap();

    let mut collector = Collector::default();
    client.stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.completed.as_deref(), Some("Hello!"));
}

#[tokio::test]
async fn realistic_chunk_fields_are_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[
                r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1710000000,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{"content":"Hi"},"finish_reason":null}]}"#,
                r#"{"id":"chatcmpl-1","object":"chat.completion.chunk","created":1710000000,"model":"gpt-3.5-turbo","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
                "[DONE]",
            ]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = Some(server.uri());
    let client = OpenAiClient::new(config).unwrap();

    let mut collector = Collector::default();
    client.stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.fragments, vec!["Hi", ""]);
    assert_eq!(collector.completed.as_deref(), Some("Hi"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Error responses
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_token_flat_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "statusCode": 401,
            "message": "Token is invalid",
        })))
        .mount(&server)
        .await;

    let mut collector = Collector::default();
    azure_client(&server).stream_completion(&chat_request(), &mut collector).await;

    assert!(collector.fragments.is_empty());
    assert!(collector.completed.is_none());
    assert_eq!(collector.errors.len(), 1);
    assert_eq!(collector.errors[0].message, "Token is invalid");
}

#[tokio::test]
async fn resource_not_found_nested_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"message": "Resource not found", "code": "404"},
        })))
        .mount(&server)
        .await;

    let mut collector = Collector::default();
    azure_client(&server).stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.errors.len(), 1);
    assert_eq!(collector.errors[0].message, "Resource not found");
    assert_eq!(collector.errors[0].code.as_deref(), Some("404"));
}

#[tokio::test]
async fn undecodable_error_body_uses_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let mut collector = Collector::default();
    azure_client(&server).stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.errors.len(), 1);
    assert_eq!(collector.errors[0].message, DEFAULT_ERROR_MESSAGE);
}

#[tokio::test]
async fn stream_without_sentinel_resolves_to_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/TEST_DEPLOYMENT_ID/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"choices":[{"delta":{"content":"partial"}}]}"#]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    let mut collector = Collector::default();
    azure_client(&server).stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.fragments, vec!["partial"]);
    assert!(collector.completed.is_none());
    assert_eq!(collector.errors.len(), 1);
    assert_eq!(collector.errors[0].message, DEFAULT_ERROR_MESSAGE);
}

// ─────────────────────────────────────────────────────────────────────────────
// Read-timeout retry
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn read_timeout_retries_and_succeeds() {
    let server = MockServer::start().await;

    // First attempt stalls past the read timeout; the reissue succeeds.
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_sse_response().set_delay(Duration::from_secs(2)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_sse_response())
        .mount(&server)
        .await;

    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = Some(server.uri());
    config.read_timeout = Duration::from_millis(200);
    config.retry = RetryPolicy::retrying();

    let retries = Arc::new(AtomicU32::new(0));
    let retried_body = Arc::new(Mutex::new(String::new()));
    let hook_retries = retries.clone();
    let hook_body = retried_body.clone();

    let client = OpenAiClient::new(config).unwrap().on_retry(move |body| {
        let _ = hook_retries.fetch_add(1, Ordering::SeqCst);
        *hook_body.lock().unwrap() = body.to_string();
    });

    let mut collector = Collector::default();
    client.stream_completion(&chat_request(), &mut collector).await;

    assert_eq!(collector.completed.as_deref(), Some("Hello!"));
    assert!(collector.errors.is_empty());
    assert_eq!(retries.load(Ordering::SeqCst), 1);
    assert!(retried_body.lock().unwrap().contains("TEST_PROMPT"));
}

#[tokio::test]
async fn read_timeout_without_retry_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(chat_sse_response().set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = Some(server.uri());
    config.read_timeout = Duration::from_millis(200);

    let client = OpenAiClient::new(config).unwrap();

    let mut collector = Collector::default();
    client.stream_completion(&chat_request(), &mut collector).await;

    assert!(collector.completed.is_none());
    assert_eq!(collector.errors.len(), 1);
    assert!(!collector.errors[0].message.is_empty());
}
