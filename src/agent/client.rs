//! Chat completions client for OpenAI and Azure OpenAI
//!
//! Responses are always requested as server-sent events and exposed as a
//! `ChatStream` of content deltas.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, Stream, StreamExt};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ChatCompletionChunk, ChatCompletionRequest};
use crate::config::{ProviderConfig, ProviderKind};
use crate::core::{ChatProvider, ChatStream, GenerationOptions, Message};
use crate::error::{Error, Result};

/// Streaming chat completions client
#[derive(Clone)]
pub struct ChatCompletionClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: ProviderConfig,
}

impl ChatCompletionClient {
    /// Create a new client
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(config.auth_headers()?)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        // Fail on a bad base URL now rather than on the first request
        config.chat_completions_url(&config.chat_model)?;

        Ok(ChatCompletionClient { client, config })
    }

    /// Provider configuration
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[async_trait]
impl ChatProvider for ChatCompletionClient {
    fn id(&self) -> &str {
        match self.config.kind {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Azure => "azure",
        }
    }

    fn default_model(&self) -> &str {
        &self.config.chat_model
    }

    async fn complete(&self, history: &[Message], options: &GenerationOptions) -> Result<ChatStream> {
        let model = options.model.as_deref().unwrap_or(&self.config.chat_model);
        let url = self.config.chat_completions_url(model)?;

        let request = ChatCompletionRequest {
            model,
            messages: history,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: options.stop.as_deref(),
            stream: true,
        };

        debug!("Sending chat request: provider={}, model={}", self.id(), model);

        let response = self.client.post(url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!("Rate limit exceeded: {}", error_text);
                    Error::RateLimit(error_text)
                }
                StatusCode::UNAUTHORIZED => Error::Unauthorized("Invalid API key".to_string()),
                _ => Error::Provider(format!("API error ({}): {}", status, error_text)),
            });
        }

        Ok(content_stream(response.bytes_stream()))
    }
}

/// Payload of one server-sent event
#[derive(Debug, PartialEq)]
enum SseData {
    Content(String),
    Done,
    Skip,
}

fn parse_event_data(data: &str) -> Result<SseData> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseData::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    if let Some(error) = &chunk.error {
        return Err(Error::Provider(error.message.clone()));
    }

    Ok(chunk.content().map_or(SseData::Skip, SseData::Content))
}

/// Turn a raw SSE byte stream into a stream of content deltas, ending at `[DONE]`
fn content_stream<S, B, E>(body: S) -> ChatStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let stream = body
        .eventsource()
        .map(|event| match event {
            Ok(event) => parse_event_data(&event.data),
            Err(e) => Err(Error::Provider(format!("Stream error: {}", e))),
        })
        .take_while(|item| future::ready(!matches!(item, Ok(SseData::Done))))
        .filter_map(|item| {
            future::ready(match item {
                Ok(SseData::Content(text)) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> ProviderConfig {
        ProviderConfig {
            api_key: SecretString::from("test-key"),
            base_url: format!("{}/v1", server.uri()),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let chunk = json!({ "choices": [{ "index": 0, "delta": { "content": delta } }] });
            body.push_str(&format!("data: {}\n\n", chunk));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn test_client_creation() {
        let client = ChatCompletionClient::new(ProviderConfig::default()).unwrap();
        assert_eq!(client.id(), "openai");
        assert_eq!(client.default_model(), "gpt-35-turbo");

        let bad = ProviderConfig {
            base_url: "::".into(),
            ..Default::default()
        };
        assert!(ChatCompletionClient::new(bad).is_err());
    }

    #[test]
    fn test_parse_event_data() {
        assert_eq!(parse_event_data("[DONE]").unwrap(), SseData::Done);
        assert_eq!(parse_event_data("").unwrap(), SseData::Skip);
        assert_eq!(
            parse_event_data(r#"{"choices":[{"delta":{"content":"hi"}}]}"#).unwrap(),
            SseData::Content("hi".into())
        );
        assert!(matches!(
            parse_event_data(r#"{"error":{"message":"boom"}}"#),
            Err(Error::Provider(msg)) if msg == "boom"
        ));
    }

    fn chunked(raw: &str, size: usize) -> Vec<std::result::Result<Vec<u8>, std::io::Error>> {
        raw.as_bytes().chunks(size).map(|c| Ok(c.to_vec())).collect()
    }

    #[tokio::test]
    async fn test_stream_split_across_chunks() {
        let body = format!(": keep-alive\n\n{}", sse_body(&["Hello", ", ", "world"]));

        let deltas: Vec<String> = content_stream(stream::iter(chunked(&body, 7)))
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["Hello", ", ", "world"]);
    }

    #[tokio::test]
    async fn test_stream_stops_at_done() {
        let body = format!("{}data: {{\"choices\":[{{\"delta\":{{\"content\":\"late\"}}}}]}}\n\n", sse_body(&["only"]));

        let deltas: Vec<String> = content_stream(stream::iter(chunked(&body, 64)))
            .map(|d| d.unwrap())
            .collect()
            .await;
        assert_eq!(deltas, vec!["only"]);
    }

    #[tokio::test]
    async fn test_stream_surfaces_error_event() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\ndata: {\"error\":{\"message\":\"overloaded\"}}\n\n";

        let items: Vec<Result<String>> = content_stream(stream::iter(chunked(body, 16))).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(matches!(&items[1], Err(Error::Provider(msg)) if msg == "overloaded"));
    }

    #[tokio::test]
    async fn test_generate_collects_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({ "model": "gpt-35-turbo", "stream": true })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(&["The answer", " is 42"]), "text/event-stream"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(&server)).unwrap();
        let text = client
            .generate_text("What is the answer?", &GenerationOptions::precise())
            .await
            .unwrap();
        assert_eq!(text, "The answer is 42");
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": "limited" })))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": "gpt-35-turbo" })))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(test_config(&server)).unwrap();

        let err = client
            .generate(&[Message::user("hi")], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        let options = GenerationOptions {
            model: Some("limited".into()),
            ..Default::default()
        };
        let err = client.generate(&[Message::user("hi")], &options).await.unwrap_err();
        assert!(matches!(err, Error::RateLimit(msg) if msg == "slow down"));
    }
}
