//! Agent module - chat completion client
//!
//! OpenAI / Azure OpenAI chat completions with streamed responses, exposed
//! through the `ChatProvider` trait.

mod client;
mod types;

pub use client::ChatCompletionClient;
pub use types::{ChatCompletionChunk, ChatCompletionRequest, ChunkChoice, MessageDelta, StreamError};
