//! Chat model trait consumed by the session

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::ConversationTurn;

/// Reply fragments in emission order. Finite and single-pass; an `Err` item
/// is terminal.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for streaming chat completions
///
/// Implementations:
/// - `AnthropicClient`: hosted Anthropic Messages API
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start a streamed completion.
    ///
    /// `history` is sent as-is before a final user turn holding `user_content`.
    async fn stream_completion(
        &self,
        system: &str,
        history: &[ConversationTurn],
        user_content: &str,
    ) -> Result<TextStream>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
