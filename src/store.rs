//! External store interfaces.
//!
//! The engine never owns fragment or style data; it is handed explicitly
//! constructed collaborator references at call time, with lifecycle owned
//! by process bootstrap. These traits are the seam.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::FragmentRecord;
use crate::resolve::StyleCatalog;

/// Ordered batch lookup of fragment records.
///
/// Semantics: a missing id yields `None` at its position, never an error.
/// The reply has exactly one entry per requested position, so duplicate
/// ids in the request are resolved independently each time.
pub trait FragmentStore: Send + Sync {
    /// Fetch records for the requested ids, in request order.
    fn fetch(&self, ids: &[String]) -> Result<Vec<Option<FragmentRecord>>>;
}

/// Lookup of the style catalog a fragment's source document used.
///
/// May be backed by the same store as the fragments or by a second keyed
/// store; `None` means no catalog is known for the fragment, which
/// resolves every style reference to "no style".
pub trait StyleStore: Send + Sync {
    /// The catalog for one fragment id, if any.
    fn catalog_for(&self, fragment_id: &str) -> Result<Option<StyleCatalog>>;
}

/// In-process implementation of both store traits.
///
/// Used by tests and by callers that already hold the data in memory;
/// production deployments implement the traits over their own backends.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    fragments: HashMap<String, FragmentRecord>,
    catalogs: HashMap<String, StyleCatalog>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fragment record, keyed by its id.
    pub fn insert(&mut self, record: FragmentRecord) {
        self.fragments.insert(record.id.clone(), record);
    }

    /// Insert a fragment record together with its source catalog.
    pub fn insert_with_catalog(&mut self, record: FragmentRecord, catalog: StyleCatalog) {
        self.catalogs.insert(record.id.clone(), catalog);
        self.insert(record);
    }

    /// Number of stored fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the store holds no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Stored ids, unordered.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }
}

impl FragmentStore for MemoryStore {
    fn fetch(&self, ids: &[String]) -> Result<Vec<Option<FragmentRecord>>> {
        Ok(ids
            .iter()
            .map(|id| self.fragments.get(id).cloned())
            .collect())
    }
}

impl StyleStore for MemoryStore {
    fn catalog_for(&self, fragment_id: &str) -> Result<Option<StyleCatalog>> {
        Ok(self.catalogs.get(fragment_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_preserves_positions_and_duplicates() {
        let mut store = MemoryStore::new();
        store.insert(FragmentRecord::new("a", "<w:tbl/>"));

        let ids = vec!["a".to_string(), "missing".to_string(), "a".to_string()];
        let results = store.fetch(&ids).unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_some());
        assert!(results[1].is_none());
        assert!(results[2].is_some());
    }

    #[test]
    fn test_catalog_lookup() {
        let mut store = MemoryStore::new();
        store.insert_with_catalog(
            FragmentRecord::new("a", "<w:tbl/>"),
            StyleCatalog::empty(),
        );

        assert!(store.catalog_for("a").unwrap().is_some());
        assert!(store.catalog_for("b").unwrap().is_none());
    }
}
