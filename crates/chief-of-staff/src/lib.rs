//! chief-of-staff: document-aware strategy chat assistant
//!
//! Uploaded files are reduced to plain text, combined with the user's question
//! and an analysis mode into a single prompt, and sent to a hosted model whose
//! reply is streamed back into the conversation.

pub mod config;
pub mod error;
pub mod export;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod session;
pub mod types;

pub use config::{AppConfig, CredentialResolver};
pub use error::{Error, Result};
pub use ingestion::{DocumentExtractor, IngestionStore};
pub use session::{ChatSession, ConversationLog, Reply, UploadOutcome};
pub use types::{AnalysisMode, ConversationTurn, FileType, Role, UploadedDocument};
