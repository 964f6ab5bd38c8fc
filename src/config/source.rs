use std::collections::HashMap;

use super::tree::Tree;
use super::ConfigError;

/// Supplies parsed documents referenced by `extends/file`.
pub trait DocumentSource: Send + Sync + std::fmt::Debug {
    fn load(&self, identifier: &str) -> Result<Tree, ConfigError>;
}

impl<S: DocumentSource + ?Sized> DocumentSource for &S {
    fn load(&self, identifier: &str) -> Result<Tree, ConfigError> {
        (**self).load(identifier)
    }
}

impl<S: DocumentSource + ?Sized> DocumentSource for Box<S> {
    fn load(&self, identifier: &str) -> Result<Tree, ConfigError> {
        (**self).load(identifier)
    }
}

/// Documents held in memory, keyed by identifier.
///
/// Each load hands out a fresh copy, so resolution never aliases the stored trees.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, Tree>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document, builder style.
    #[must_use]
    pub fn with_document(mut self, identifier: impl Into<String>, document: Tree) -> Self {
        self.insert(identifier, document);
        self
    }

    /// Stores `document` under `identifier`, replacing any previous one.
    pub fn insert(&mut self, identifier: impl Into<String>, document: Tree) {
        self.documents.insert(identifier.into(), document);
    }
}

impl DocumentSource for MemorySource {
    fn load(&self, identifier: &str) -> Result<Tree, ConfigError> {
        self.documents
            .get(identifier)
            .cloned()
            .ok_or_else(|| ConfigError::DocumentNotFound(identifier.to_string()))
    }
}
