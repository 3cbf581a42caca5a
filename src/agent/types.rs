//! Wire types for the chat completions API

use serde::{Deserialize, Serialize};

use crate::core::{Message, Role};

/// Request to the chat completions endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// Model to use; ignored by Azure, which routes on the deployment
    pub model: &'a str,
    /// Messages in the conversation
    pub messages: &'a [Message],
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
    /// Whether to stream responses
    pub stream: bool,
}

/// Streaming response chunk
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChunk {
    /// Delta choices; Azure sends an empty list for content-filter preambles
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Error reported mid-stream
    #[serde(default)]
    pub error: Option<StreamError>,
}

/// A streaming choice delta
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    /// Index of this choice
    #[serde(default)]
    pub index: u32,
    /// The delta content
    #[serde(default)]
    pub delta: MessageDelta,
    /// Reason for stopping
    pub finish_reason: Option<String>,
}

/// Delta content in streaming response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDelta {
    /// Role (only in first chunk)
    pub role: Option<Role>,
    /// Content delta
    pub content: Option<String>,
}

/// Error object embedded in a stream
#[derive(Debug, Clone, Deserialize)]
pub struct StreamError {
    /// Human-readable message
    pub message: String,
}

impl ChatCompletionChunk {
    /// Text carried by the first choice, if any
    pub fn content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}
