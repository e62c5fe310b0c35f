// Anthropic Messages API backend.

use super::{GenerationProvider, api_error, compose_prompt, non_empty_text, transport_error};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl AnthropicProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder, api_key: &str) -> reqwest::RequestBuilder {
        request
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
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
impl GenerationProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, GenerationError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GenerationError::MissingCredential { provider: NAME })?;

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [
                { "role": "user", "content": compose_prompt(prompt, context) }
            ],
        });

        let url = format!("{}/v1/messages", self.base_url);
        debug!("POST {} (model {})", url, self.model);
        let response = self
            .authorized(self.client.post(&url), api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(NAME, response).await);
        }

        let parsed: MessagesResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: NAME,
                    message: e.to_string(),
                })?;

        let text: String = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");
        non_empty_text(NAME, Some(text))
    }

    async fn check_connection(&self) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            return false;
        };
        let url = format!("{}/v1/models", self.base_url);
        match self.authorized(self.client.get(&url), api_key).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Anthropic unreachable: {}", e);
                false
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            return vec![self.model.clone()];
        };
        let url = format!("{}/v1/models", self.base_url);
        let models = match self.authorized(self.client.get(&url), api_key).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<ModelList>().await.ok()
            }
            _ => None,
        };

        match models {
            Some(list) if !list.data.is_empty() => list.data.into_iter().map(|m| m.id).collect(),
            _ => vec![self.model.clone()],
        }
    }
}
