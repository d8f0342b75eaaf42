//! Request store contract
//!
//! The runner resolves collections through this seam; durable persistence
//! lives behind it and is not this crate's concern.

use std::collections::HashMap;

use crate::models::Collection;

/// Looks up a collection and its ordered request list by id.
///
/// The order returned must be stable across calls within one run.
pub trait RequestStore {
    fn collection(&self, collection_id: &str) -> Option<Collection>;
}

/// A simple in-memory store, useful for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    collections: HashMap<String, Collection>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a collection, keyed by its id
    pub fn insert(&mut self, collection: Collection) {
        self.collections.insert(collection.id.clone(), collection);
    }
}

impl RequestStore for InMemoryStore {
    fn collection(&self, collection_id: &str) -> Option<Collection> {
        self.collections.get(collection_id).cloned()
    }
}

impl<S: RequestStore> RequestStore for &S {
    fn collection(&self, collection_id: &str) -> Option<Collection> {
        (**self).collection(collection_id)
    }
}
