//! Prompt construction for model requests

pub mod prompt;
pub mod system_prompt;

pub use prompt::{OutboundRequest, PromptBuilder, CONTEXT_HEADER};
pub use system_prompt::CHIEF_OF_STAFF_PROMPT;
