//! Chat provider trait - Abstract interface for chat completion backends
//!
//! The same service answers both chat-history and plain-prompt requests,
//! so text generation is a provided method over `complete`.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use super::types::{GenerationOptions, Message};
use crate::error::Result;

/// Lazy, finite, non-restartable stream of text chunks
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Abstract interface for chat completion providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Get the provider ID
    fn id(&self) -> &str;

    /// Model (or deployment) used when options do not override it
    fn default_model(&self) -> &str;

    /// Stream a completion for the given history
    async fn complete(&self, history: &[Message], options: &GenerationOptions) -> Result<ChatStream>;

    /// Generate a full completion by draining the stream
    async fn generate(&self, history: &[Message], options: &GenerationOptions) -> Result<String> {
        let mut stream = self.complete(history, options).await?;
        let mut output = String::new();
        while let Some(chunk) = stream.next().await {
            output.push_str(&chunk?);
        }
        Ok(output)
    }

    /// Text generation from a single prompt
    async fn generate_text(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.generate(&[Message::user(prompt)], options).await
    }
}
