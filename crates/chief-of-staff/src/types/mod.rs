//! Core types for the assistant

pub mod conversation;
pub mod document;
pub mod mode;

pub use conversation::{ConversationTurn, Role};
pub use document::{FileType, UploadedDocument};
pub use mode::AnalysisMode;
