//! One-line summaries of ingested documents

use crate::types::UploadedDocument;

/// Short description of a document: name plus word and line counts
pub fn file_summary(doc: &UploadedDocument) -> String {
    summarize(&doc.name, &doc.content)
}

/// Same as [`file_summary`] for a bare name and content pair
pub fn summarize(name: &str, content: &str) -> String {
    let words = content.split_whitespace().count();
    let lines = content.split('\n').count();
    format!("📄 {} ({} words, {} lines)", name, words, lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_file_summary() {
        let doc = UploadedDocument::new(
            "test.txt",
            "This is test content with multiple words.\nAnd multiple lines.",
        );
        let summary = file_summary(&doc);
        assert!(summary.contains("test.txt"));
        assert!(summary.contains("words"));
        assert!(summary.contains("(10 words, 2 lines)"));
    }

    #[test]
    fn test_summary_of_empty_content() {
        assert_eq!(summarize("empty.md", ""), "📄 empty.md (0 words, 1 lines)");
    }
}
