//! In-memory store of documents uploaded during a session

use crate::types::UploadedDocument;

/// Ordered collection of uploaded documents, unique by name
#[derive(Debug, Default, Clone)]
pub struct IngestionStore {
    documents: Vec<UploadedDocument>,
}

impl IngestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add extracted text under `name`. First write wins.
    ///
    /// Returns `false` when a document with the same name is already stored.
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) -> bool {
        self.insert(UploadedDocument::new(name, content))
    }

    /// Add a fully built document. First write wins.
    pub fn insert(&mut self, document: UploadedDocument) -> bool {
        if self.contains(&document.name) {
            tracing::debug!("Document '{}' already ingested, keeping original", document.name);
            return false;
        }
        tracing::info!(
            "Ingested '{}' ({} chars of text)",
            document.name,
            document.content.len()
        );
        self.documents.push(document);
        true
    }

    /// Whether a document with this name has been ingested
    pub fn contains(&self, name: &str) -> bool {
        self.documents.iter().any(|d| d.name == name)
    }

    /// Look up a document by name
    pub fn get(&self, name: &str) -> Option<&UploadedDocument> {
        self.documents.iter().find(|d| d.name == name)
    }

    /// All documents in upload order
    pub fn all(&self) -> &[UploadedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Drop every document
    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_wins() {
        let mut store = IngestionStore::new();
        assert!(store.add("deck.pdf", "original"));
        assert!(!store.add("deck.pdf", "replacement"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("deck.pdf").unwrap().content, "original");
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut store = IngestionStore::new();
        store.add("b.txt", "2");
        store.add("a.txt", "1");
        store.add("c.txt", "3");

        let names: Vec<&str> = store.all().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_clear() {
        let mut store = IngestionStore::new();
        store.add("a.txt", "1");
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains("a.txt"));
        assert!(store.add("a.txt", "again"));
    }
}
