//! Error types for the assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Assistant errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model API credential could not be resolved from any source
    #[error("{0} not found")]
    MissingCredential(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Model API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Export error
    #[error("Export failed: {0}")]
    Export(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an export error
    pub fn export(message: impl Into<String>) -> Self {
        Self::Export(message.into())
    }

    /// Message shown to the user when this error ends up in the transcript.
    ///
    /// Drops the variant prefix for model errors, which already carry enough
    /// context from the client.
    pub fn user_message(&self) -> String {
        match self {
            Error::Llm(msg) => msg.clone(),
            Error::FileParse { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
