//! Remote embedding generation via an OpenAI-compatible `/embeddings` endpoint
//!
//! Works against api.openai.com and Azure OpenAI deployments.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ProviderConfig;
use crate::core::embedding::{single_embedding, EmbeddingProvider};
use crate::error::{Error, Result};

/// Embedding client for OpenAI and Azure OpenAI
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    client: Client,
    url: Url,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingClient {
    /// Create a client for `model` (deployment name on Azure) producing `dimensions`-length vectors
    pub fn new(config: &ProviderConfig, model: impl Into<String>, dimensions: usize) -> Result<Self> {
        let model = model.into();
        let client = Client::builder()
            .default_headers(config.auth_headers()?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiEmbeddingClient {
            client,
            url: config.embeddings_url(&model)?,
            model,
            dimensions,
        })
    }

    /// Model or deployment name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The v3 embedding models can shorten their output on request
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    fn dimension(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        single_embedding(self.embed_batch(&[text.to_string()]).await?)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        };

        debug!("Requesting {} embeddings: model={}", texts.len(), self.model);

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("API error ({}): {}", status, error_text)));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Invalid response: {}", e)))?;

        if body.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, kind: ProviderKind) -> ProviderConfig {
        ProviderConfig {
            kind,
            api_key: SecretString::from("test-key"),
            base_url: match kind {
                ProviderKind::OpenAi => format!("{}/v1", server.uri()),
                ProviderKind::Azure => server.uri(),
            },
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_embed_openai() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "text-embedding-ada-002", "input": ["hello"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "index": 0, "embedding": [0.1, 0.2, 0.3] }]
            })))
            .mount(&server)
            .await;

        let client =
            OpenAiEmbeddingClient::new(&config(&server, ProviderKind::OpenAi), "text-embedding-ada-002", 3).unwrap();
        let embedding = client.embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_batch_azure_reorders_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/embed/embeddings"))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    { "index": 1, "embedding": [0.0, 1.0] },
                    { "index": 0, "embedding": [1.0, 0.0] }
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiEmbeddingClient::new(&config(&server, ProviderKind::Azure), "embed", 2).unwrap();
        let embeddings = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_api_error_maps_to_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = OpenAiEmbeddingClient::new(&config(&server, ProviderKind::OpenAi), "m", 3).unwrap();
        let err = client.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref msg) if msg.contains("upstream exploded")));
    }

    #[test]
    fn test_requested_dimensions() {
        let config = ProviderConfig::default();
        let v3 = OpenAiEmbeddingClient::new(&config, "text-embedding-3-small", 512).unwrap();
        assert_eq!(v3.requested_dimensions(), Some(512));

        let ada = OpenAiEmbeddingClient::new(&config, "text-embedding-ada-002", 1536).unwrap();
        assert_eq!(ada.requested_dimensions(), None);
    }
}
