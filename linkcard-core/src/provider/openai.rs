// OpenAI-style chat completion backends (OpenAI itself and OpenRouter).

use super::{GenerationProvider, api_error, compose_prompt, non_empty_text, transport_error};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub struct OpenAiProvider {
    name: &'static str,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    extra_headers: Vec<(&'static str, &'static str)>,
}

impl OpenAiProvider {
    pub fn openai(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            name: "openai",
            client,
            base_url,
            api_key,
            model,
            extra_headers: Vec::new(),
        }
    }

    pub fn openrouter(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            name: "openrouter",
            client,
            base_url,
            api_key,
            model,
            extra_headers: vec![
                ("HTTP-Referer", "https://github.com/trapdoorsec/linkcard"),
                ("X-Title", "Linkcard"),
            ],
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        let mut request = request.bearer_auth(api_key);
        for (name, value) in &self.extra_headers {
            request = request.header(*name, *value);
        }
        request
    }

    async fn fetch_models(&self) -> Option<Vec<String>> {
        let api_key = self.api_key.as_deref()?;
        let url = format!("{}/models", self.base_url);
        let response = self
            .authorized(self.client.get(&url), api_key)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let models: ModelList = response.json().await.ok()?;
        let mut ids: Vec<String> = models.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        (!ids.is_empty()).then_some(ids)
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[async_trait]
impl GenerationProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential { provider: self.name })?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": compose_prompt(prompt, context) }
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        debug!("POST {} (model {})", url, self.model);
        let response = self
            .authorized(self.client.post(&url), api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(self.name, e))?;

        if !response.status().is_success() {
            return Err(api_error(self.name, response).await);
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: self.name,
                    message: e.to_string(),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        non_empty_text(self.name, content)
    }

    async fn check_connection(&self) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            return false;
        };
        let url = format!("{}/models", self.base_url);
        match self.authorized(self.client.get(&url), api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("{} unreachable: {}", self.name, e);
                false
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        self.fetch_models()
            .await
            .unwrap_or_else(|| vec![self.model.clone()])
    }
}
