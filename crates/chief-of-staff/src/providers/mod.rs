//! Model providers

pub mod anthropic;
pub mod llm;

pub use anthropic::{AnthropicClient, SseDecoder, SseEvent};
pub use llm::{ChatModel, TextStream};
