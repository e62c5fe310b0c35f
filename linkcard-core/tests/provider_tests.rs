// Tests for the generation backends against mock HTTP APIs

use linkcard_core::config::{ProviderKind, ResolvedBackend};
use linkcard_core::error::GenerationError;
use linkcard_core::provider::{GenerationProvider, create_provider_for};
use std::sync::Arc;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn provider(kind: ProviderKind, endpoint: &str, api_key: Option<&str>) -> Arc<dyn GenerationProvider> {
    create_provider_for(
        ResolvedBackend {
            kind,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
            model: kind.default_model().to_string(),
        },
        5,
    )
    .unwrap()
}

// ============================================================================
// Ollama Tests
// ============================================================================

#[tokio::test]
async fn test_ollama_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama3.2",
            "stream": false,
            "prompt": "Context:\nPage text\n\nSummarize."
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"response": "  A short summary. "})),
        )
        .mount(&server)
        .await;

    let ollama = provider(ProviderKind::Ollama, &server.uri(), None);
    let text = ollama.generate("Summarize.", "Page text").await.unwrap();
    assert_eq!(text, "A short summary.");
}

#[tokio::test]
async fn test_ollama_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'llama3.2' not found"))
        .mount(&server)
        .await;

    let ollama = provider(ProviderKind::Ollama, &server.uri(), None);
    match ollama.generate("Summarize.", "").await {
        Err(GenerationError::Api {
            provider,
            status,
            message,
        }) => {
            assert_eq!(provider, "ollama");
            assert_eq!(status, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ollama_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": ""})))
        .mount(&server)
        .await;

    let ollama = provider(ProviderKind::Ollama, &server.uri(), None);
    assert!(matches!(
        ollama.generate("Summarize.", "").await,
        Err(GenerationError::EmptyResponse { provider: "ollama" })
    ));
}

#[tokio::test]
async fn test_ollama_models_and_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "models": [{"name": "llama3.2"}, {"name": "mistral"}]
        })))
        .mount(&server)
        .await;

    let ollama = provider(ProviderKind::Ollama, &server.uri(), None);
    assert!(ollama.check_connection().await);
    assert_eq!(ollama.list_models().await, vec!["llama3.2", "mistral"]);
}

#[tokio::test]
async fn test_ollama_unreachable() {
    let ollama = provider(ProviderKind::Ollama, "http://127.0.0.1:9", None);
    assert!(!ollama.check_connection().await);
    assert_eq!(ollama.list_models().await, vec!["llama3.2"]);
    assert!(matches!(
        ollama.generate("Summarize.", "").await,
        Err(GenerationError::Transport { .. })
    ));
}

// ============================================================================
// OpenAI / OpenRouter Tests
// ============================================================================

#[tokio::test]
async fn test_openai_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Summary text"}}]
        })))
        .mount(&server)
        .await;

    let openai = provider(ProviderKind::OpenAi, &server.uri(), Some("sk-test"));
    assert_eq!(openai.name(), "openai");
    assert_eq!(openai.generate("Summarize.", "ctx").await.unwrap(), "Summary text");
}

#[tokio::test]
async fn test_openai_missing_key() {
    let server = MockServer::start().await;
    let openai = provider(ProviderKind::OpenAi, &server.uri(), None);

    assert!(matches!(
        openai.generate("Summarize.", "").await,
        Err(GenerationError::MissingCredential { provider: "openai" })
    ));
    assert!(!openai.check_connection().await);
    assert_eq!(openai.list_models().await, vec!["gpt-4o-mini"]);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_openai_no_choices_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
        .mount(&server)
        .await;

    let openai = provider(ProviderKind::OpenAi, &server.uri(), Some("sk-test"));
    assert!(matches!(
        openai.generate("Summarize.", "").await,
        Err(GenerationError::EmptyResponse { .. })
    ));
}

#[tokio::test]
async fn test_openai_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let openai = provider(ProviderKind::OpenAi, &server.uri(), Some("sk-bad"));
    assert!(matches!(
        openai.generate("Summarize.", "").await,
        Err(GenerationError::Api { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_openrouter_sends_attribution_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("x-title", "Linkcard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "Routed summary"}}]
        })))
        .mount(&server)
        .await;

    let router = provider(ProviderKind::OpenRouter, &server.uri(), Some("or-key"));
    assert_eq!(router.name(), "openrouter");
    assert_eq!(router.generate("Summarize.", "").await.unwrap(), "Routed summary");
}

#[tokio::test]
async fn test_openai_list_models_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"id": "gpt-4o"}, {"id": "gpt-4o-mini"}, {"id": "gpt-3.5-turbo"}]
        })))
        .mount(&server)
        .await;

    let openai = provider(ProviderKind::OpenAi, &server.uri(), Some("sk-test"));
    assert!(openai.check_connection().await);
    assert_eq!(
        openai.list_models().await,
        vec!["gpt-3.5-turbo", "gpt-4o", "gpt-4o-mini"]
    );
}

// ============================================================================
// Anthropic Tests
// ============================================================================

#[tokio::test]
async fn test_anthropic_generate_joins_text_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ant-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "content": [
                {"type": "text", "text": "First part."},
                {"type": "tool_use", "id": "t1"},
                {"type": "text", "text": "Second part."}
            ]
        })))
        .mount(&server)
        .await;

    let anthropic = provider(ProviderKind::Anthropic, &server.uri(), Some("ant-key"));
    assert_eq!(
        anthropic.generate("Summarize.", "").await.unwrap(),
        "First part.\nSecond part."
    );
}

#[tokio::test]
async fn test_anthropic_model_listing_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let anthropic = provider(ProviderKind::Anthropic, &server.uri(), Some("ant-key"));
    assert!(!anthropic.check_connection().await);
    assert_eq!(anthropic.list_models().await, vec!["claude-3-5-haiku-latest"]);
}
