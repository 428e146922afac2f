//! Open document store.

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;

/// An open query document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub version: i32,
    pub text: String,
}

/// Open documents keyed by URI.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document. Older versions never overwrite newer ones.
    pub fn update(&self, uri: Url, version: i32, text: String) {
        let mut entry = self.documents.entry(uri).or_insert_with(|| Document {
            version,
            text: String::new(),
        });
        if version >= entry.version {
            entry.version = version;
            entry.text = text;
        }
    }

    pub fn remove(&self, uri: &Url) -> Option<Document> {
        self.documents.remove(uri).map(|(_, doc)| doc)
    }

    /// A copy of the document, so no map lock is held across awaits.
    pub fn snapshot(&self, uri: &Url) -> Option<Document> {
        self.documents.get(uri).map(|doc| doc.clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
