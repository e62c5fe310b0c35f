// Local Ollama backend.

use super::{GenerationProvider, api_error, compose_prompt, non_empty_text, transport_error};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const NAME: &str = "ollama";

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(client: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url,
            model,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, context: &str) -> Result<String, GenerationError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": compose_prompt(prompt, context),
            "stream": false,
        });

        let url = format!("{}/api/generate", self.base_url);
        debug!("POST {} (model {})", url, self.model);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(NAME, e))?;

        if !response.status().is_success() {
            return Err(api_error(NAME, response).await);
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| GenerationError::InvalidResponse {
                    provider: NAME,
                    message: e.to_string(),
                })?;
        non_empty_text(NAME, parsed.response)
    }

    async fn check_connection(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Ollama unreachable at {}: {}", self.base_url, e);
                false
            }
        }
    }

    async fn list_models(&self) -> Vec<String> {
        let url = format!("{}/api/tags", self.base_url);
        let tags = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                response.json::<TagsResponse>().await.ok()
            }
            _ => None,
        };

        match tags {
            Some(tags) if !tags.models.is_empty() => {
                tags.models.into_iter().map(|m| m.name).collect()
            }
            _ => vec![self.model.clone()],
        }
    }
}
