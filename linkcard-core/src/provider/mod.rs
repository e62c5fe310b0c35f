// Summary generation backends.
//
// Every backend implements `GenerationProvider`; `create_provider` picks
// one from a settings snapshot. Providers hold no mutable state, so a new
// one is built whenever settings change instead of reconfiguring a shared
// instance.

pub mod anthropic;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::{ProviderKind, ResolvedBackend, Settings};
use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Generate text for `prompt`, with `context` framed ahead of it when non-empty.
    async fn generate(&self, prompt: &str, context: &str) -> Result<String, GenerationError>;

    /// Minimal round trip to the backend. Never fails.
    async fn check_connection(&self) -> bool;

    /// Models the backend offers, or just the configured one if it can't say.
    async fn list_models(&self) -> Vec<String>;
}

/// Build the provider selected in `settings`.
pub fn create_provider(settings: &Settings) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    let backend = settings.resolve_backend(settings.provider);
    create_provider_for(backend, settings.request_timeout_secs)
}

pub fn create_provider_for(
    backend: ResolvedBackend,
    timeout_secs: u64,
) -> Result<Arc<dyn GenerationProvider>, GenerationError> {
    let client = http_client(timeout_secs)?;
    let provider: Arc<dyn GenerationProvider> = match backend.kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::new(client, backend.endpoint, backend.model)),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::openai(
            client,
            backend.endpoint,
            backend.api_key,
            backend.model,
        )),
        ProviderKind::OpenRouter => Arc::new(OpenAiProvider::openrouter(
            client,
            backend.endpoint,
            backend.api_key,
            backend.model,
        )),
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            client,
            backend.endpoint,
            backend.api_key,
            backend.model,
        )),
    };
    Ok(provider)
}

/// Frame `context` ahead of the instruction.
pub fn compose_prompt(prompt: &str, context: &str) -> String {
    let context = context.trim();
    if context.is_empty() {
        prompt.to_string()
    } else {
        format!("Context:\n{context}\n\n{prompt}")
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1) * 4))
        .connect_timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .map_err(|e| GenerationError::ClientBuild(e.to_string()))
}

/// Turn a non-success response into a typed error carrying the backend's message.
async fn api_error(provider: &'static str, response: reqwest::Response) -> GenerationError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    GenerationError::Api {
        provider,
        status,
        message,
    }
}

fn transport_error(provider: &'static str, error: reqwest::Error) -> GenerationError {
    GenerationError::Transport {
        provider,
        message: error.to_string(),
    }
}

/// Trimmed text, or `EmptyResponse` when there is nothing left.
fn non_empty_text(provider: &'static str, text: Option<String>) -> Result<String, GenerationError> {
    let text = text.map(|t| t.trim().to_string()).unwrap_or_default();
    if text.is_empty() {
        Err(GenerationError::EmptyResponse { provider })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_prompt_without_context() {
        assert_eq!(compose_prompt("Summarize.", "   "), "Summarize.");
    }

    #[test]
    fn test_compose_prompt_with_context() {
        assert_eq!(
            compose_prompt("Summarize.", " page text "),
            "Context:\npage text\n\nSummarize."
        );
    }

    #[test]
    fn test_factory_follows_selected_backend() {
        let mut settings = Settings::default();
        for kind in ProviderKind::ALL {
            settings.provider = kind;
            let provider = create_provider(&settings).unwrap();
            assert_eq!(provider.name(), kind.as_str());
            assert_eq!(provider.model(), kind.default_model());
        }
    }

    #[test]
    fn test_http_client_accepts_any_timeout() {
        assert!(http_client(0).is_ok());
        assert!(http_client(15).is_ok());
        assert!(http_client(u64::from(u32::MAX)).is_ok());
    }

    #[test]
    fn test_non_empty_text() {
        assert_eq!(
            non_empty_text("x", Some("  hi \n".to_string())).unwrap(),
            "hi"
        );
        assert!(matches!(
            non_empty_text("x", Some("   ".to_string())),
            Err(GenerationError::EmptyResponse { .. })
        ));
        assert!(non_empty_text("x", None).is_err());
    }
}
