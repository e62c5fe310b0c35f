// Settings loaded from a TOML file, with environment credential overrides

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/linkcard/config.toml";

pub const DEFAULT_PROMPT: &str = "Summarize the following web page in two or three sentences \
for a knowledge-base card. Reply with the summary only, without preamble.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Ollama,
        ProviderKind::OpenAi,
        ProviderKind::OpenRouter,
        ProviderKind::Anthropic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Environment variable holding this backend's API key, if it takes one.
    pub fn credential_env(&self) -> Option<&'static str> {
        match self {
            ProviderKind::Ollama => None,
            ProviderKind::OpenAi => Some("OPENAI_API_KEY"),
            ProviderKind::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::OpenAi => "gpt-4o-mini",
            ProviderKind::OpenRouter => "openai/gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

/// How an enriched card is written back to the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStyle {
    /// Create a note file and point the node at it.
    #[default]
    Note,
    /// Rewrite the node's own text with a composed card.
    Inline,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

/// Endpoint, credential and model for one backend after defaults and
/// environment overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBackend {
    pub kind: ProviderKind,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: ProviderKind,
    pub ollama: BackendSettings,
    pub openai: BackendSettings,
    pub openrouter: BackendSettings,
    pub anthropic: BackendSettings,
    pub auto_enrich: bool,
    pub output_folder: String,
    pub prompt: String,
    pub max_description_length: usize,
    pub notifications: bool,
    pub prefer_env_credentials: bool,
    pub card_style: CardStyle,
    pub request_timeout_secs: u64,
    pub social_api_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            ollama: BackendSettings::default(),
            openai: BackendSettings::default(),
            openrouter: BackendSettings::default(),
            anthropic: BackendSettings::default(),
            auto_enrich: true,
            output_folder: "Link Notes".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_description_length: 200,
            notifications: true,
            prefer_env_credentials: true,
            card_style: CardStyle::default(),
            request_timeout_secs: 15,
            social_api_base: linkcard_scanner::social::DEFAULT_SOCIAL_API_BASE.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (tilde-expanded). A missing file yields defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let expanded = shellexpand::tilde(path);
        let config_path = Path::new(expanded.as_ref());

        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn backend(&self, kind: ProviderKind) -> &BackendSettings {
        match kind {
            ProviderKind::Ollama => &self.ollama,
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::OpenRouter => &self.openrouter,
            ProviderKind::Anthropic => &self.anthropic,
        }
    }

    pub fn backend_mut(&mut self, kind: ProviderKind) -> &mut BackendSettings {
        match kind {
            ProviderKind::Ollama => &mut self.ollama,
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::OpenRouter => &mut self.openrouter,
            ProviderKind::Anthropic => &mut self.anthropic,
        }
    }

    /// Resolve `kind` against the process environment.
    pub fn resolve_backend(&self, kind: ProviderKind) -> ResolvedBackend {
        self.resolve_backend_with(kind, |name| std::env::var(name).ok())
    }

    pub fn resolve_backend_with(
        &self,
        kind: ProviderKind,
        env: impl Fn(&str) -> Option<String>,
    ) -> ResolvedBackend {
        let backend = self.backend(kind);
        let from_file = backend.api_key.clone().filter(|k| !k.trim().is_empty());
        let from_env = kind
            .credential_env()
            .and_then(|name| env(name))
            .filter(|k| !k.trim().is_empty());

        let api_key = if self.prefer_env_credentials {
            from_env.or(from_file)
        } else {
            from_file.or(from_env)
        };

        ResolvedBackend {
            kind,
            endpoint: backend
                .endpoint
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| kind.default_endpoint().to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model: backend
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| kind.default_model().to_string()),
        }
    }
}
