//! Provider configuration types
//!
//! Configuration for the OpenAI-compatible service backing chat completion
//! and remote embeddings (OpenAI or Azure OpenAI).

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Flavour of the OpenAI-compatible API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// api.openai.com style: `{base_url}/chat/completions`, bearer auth
    #[default]
    OpenAi,
    /// Azure OpenAI: `{endpoint}/openai/deployments/{deployment}/...`, `api-key` header
    Azure,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "azure" | "azure_openai" | "azureopenai" => Ok(ProviderKind::Azure),
            other => Err(format!("Unknown provider kind: {}", other)),
        }
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API flavour
    #[serde(default)]
    pub kind: ProviderKind,
    /// API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Base URL (OpenAI) or resource endpoint (Azure)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Azure API version query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Chat model, or chat deployment name on Azure
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            kind: ProviderKind::default(),
            api_key: default_secret(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            chat_model: default_chat_model(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Chat completions URL for a model (deployment on Azure)
    pub fn chat_completions_url(&self, model: &str) -> Result<Url> {
        self.operation_url(model, &["chat", "completions"])
    }

    /// Embeddings URL for a model (deployment on Azure)
    pub fn embeddings_url(&self, model: &str) -> Result<Url> {
        self.operation_url(model, &["embeddings"])
    }

    fn operation_url(&self, model: &str, operation: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("Invalid provider base URL {}: {}", self.base_url, e)))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("Provider base URL cannot be a base: {}", self.base_url)))?;
            segments.pop_if_empty();
            if self.kind == ProviderKind::Azure {
                segments.extend(["openai", "deployments", model]);
            }
            segments.extend(operation);
        }

        if self.kind == ProviderKind::Azure {
            url.query_pairs_mut().append_pair("api-version", &self.api_version);
        }

        Ok(url)
    }

    /// Authentication headers for the configured API flavour
    pub fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let key = self.api_key.expose_secret();

        let (name, value) = match self.kind {
            ProviderKind::OpenAi => (header::AUTHORIZATION, format!("Bearer {}", key)),
            ProviderKind::Azure => (HeaderName::from_static("api-key"), key.to_string()),
        };
        headers.insert(
            name,
            HeaderValue::from_str(&value)
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        Ok(headers)
    }
}

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_version() -> String {
    "2024-02-01".to_string()
}

pub(crate) fn default_chat_model() -> String {
    "gpt-35-turbo".to_string()
}

fn default_timeout() -> u64 {
    120
}
