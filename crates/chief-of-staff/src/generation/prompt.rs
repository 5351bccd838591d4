//! Prompt assembly from uploaded documents, history and analysis mode

use crate::types::{AnalysisMode, ConversationTurn, UploadedDocument};

use super::system_prompt::CHIEF_OF_STAFF_PROMPT;

/// Header that opens the document context block
pub const CONTEXT_HEADER: &str = "**UPLOADED DOCUMENTS:**";

/// Everything the model adapter needs for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// System instruction
    pub system: String,
    /// Prior turns, passed through untouched
    pub history: Vec<ConversationTurn>,
    /// Content of the new user turn
    pub prompt: String,
}

/// Prompt builder for chat requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the document context block, or an empty string when there are no documents
    pub fn build_context(documents: &[UploadedDocument]) -> String {
        if documents.is_empty() {
            return String::new();
        }

        let mut context = format!("\n\n{}\n\n", CONTEXT_HEADER);
        for doc in documents {
            context.push_str(&format!("\n### {}\n{}\n", doc.name, doc.content));
        }
        context
    }

    /// Compose the content of the new user turn
    pub fn build_prompt(
        documents: &[UploadedDocument],
        user_message: &str,
        mode: AnalysisMode,
    ) -> String {
        let prompt = format!("{}{}", user_message, mode.instruction());
        let context = Self::build_context(documents);

        if context.is_empty() {
            prompt
        } else {
            format!("{}\n\n{}", context, prompt)
        }
    }

    /// Assemble a full request.
    ///
    /// `history` holds every turn before the message being sent; mode
    /// instructions and document context only ever land in the new turn.
    pub fn assemble(
        documents: &[UploadedDocument],
        history: &[ConversationTurn],
        user_message: &str,
        mode: AnalysisMode,
    ) -> OutboundRequest {
        OutboundRequest {
            system: CHIEF_OF_STAFF_PROMPT.to_string(),
            history: history.to_vec(),
            prompt: Self::build_prompt(documents, user_message, mode),
        }
    }
}
