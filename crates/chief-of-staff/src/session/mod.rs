//! Session state: conversation log and the chat session that drives requests

mod chat;
mod conversation;

pub use chat::{ChatSession, Reply, UploadOutcome, EMPTY_REPLY};
pub use conversation::ConversationLog;
