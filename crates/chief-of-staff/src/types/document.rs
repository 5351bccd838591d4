//! Uploaded document and file type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Supported upload formats, keyed by file suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Excel workbook (.xlsx)
    Xlsx,
    /// Legacy Excel workbook (.xls)
    Xls,
    /// Comma separated values
    Csv,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Anything else, with the lowercased suffix that was seen
    Unsupported(String),
}

impl FileType {
    /// Detect file type from a file name.
    ///
    /// The key is everything after the last `.`, lowercased. A name without
    /// a dot is treated as its own suffix.
    pub fn from_filename(filename: &str) -> Self {
        Self::from_extension(&Self::extension_of(filename))
    }

    /// Lowercased suffix used for dispatch
    pub fn extension_of(filename: &str) -> String {
        filename.rsplit('.').next().unwrap_or("").to_lowercase()
    }

    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "pptx" => Self::Pptx,
            "xlsx" => Self::Xlsx,
            "xls" => Self::Xls,
            "csv" => Self::Csv,
            "txt" => Self::Txt,
            "md" => Self::Markdown,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Suffixes accepted by the uploader
    pub fn supported_extensions() -> &'static [&'static str] {
        &["pdf", "pptx", "xlsx", "xls", "csv", "txt", "md"]
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Pdf => "PDF",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Xlsx => "Excel Spreadsheet (.xlsx)",
            Self::Xls => "Excel Spreadsheet (.xls)",
            Self::Csv => "CSV",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unsupported(_) => "Unsupported",
        }
    }
}

/// A document uploaded during the session, reduced to its extracted text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedDocument {
    /// Original filename, unique within a session
    pub name: String,
    /// Extracted text, or the sentinel produced when extraction degraded
    pub content: String,
    /// Detected file type
    pub file_type: FileType,
    /// Size of the raw upload in bytes
    pub size_bytes: u64,
    /// SHA-256 of the raw upload
    pub content_hash: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedDocument {
    /// Create a document from its name and extracted text
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            file_type: FileType::from_filename(&name),
            name,
            content: content.into(),
            size_bytes: 0,
            content_hash: String::new(),
            uploaded_at: Utc::now(),
        }
    }

    /// Attach metadata about the raw upload
    pub fn with_source(mut self, data: &[u8]) -> Self {
        self.size_bytes = data.len() as u64;
        self.content_hash = hash_bytes(data);
        self
    }
}

/// Hash raw upload bytes for duplicate diagnostics
pub fn hash_bytes(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(FileType::from_filename("deck.PPTX"), FileType::Pptx);
        assert_eq!(FileType::from_filename("model.v2.xlsx"), FileType::Xlsx);
        assert_eq!(FileType::from_filename("notes.md"), FileType::Markdown);
        assert_eq!(
            FileType::from_filename("archive.tar.gz"),
            FileType::Unsupported("gz".to_string())
        );
        assert_eq!(
            FileType::from_filename("README"),
            FileType::Unsupported("readme".to_string())
        );
    }

    #[test]
    fn test_supported_extensions_round_trip() {
        for ext in FileType::supported_extensions() {
            assert!(FileType::from_extension(ext).is_supported(), "{ext}");
        }
        assert!(!FileType::from_extension("docx").is_supported());
    }

    #[test]
    fn test_with_source_hashes_bytes() {
        let doc = UploadedDocument::new("a.txt", "hello").with_source(b"hello");
        assert_eq!(doc.size_bytes, 5);
        assert_eq!(doc.content_hash, hash_bytes(b"hello"));
        assert_ne!(doc.content_hash, hash_bytes(b"hello!"));
        assert_eq!(doc.file_type, FileType::Txt);
    }
}
