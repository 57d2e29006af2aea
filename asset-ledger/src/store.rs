//! Durable store boundary
//!
//! Each component keeps its whole collection as one JSON document under a
//! fixed key and rewrites it on every mutation. Reads never fail: a missing
//! key is an empty collection, and an unreadable or corrupt document is
//! logged and also treated as empty.

use crate::{metrics::Metrics, Result};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque string-keyed document store
pub trait DurableStore: Send + Sync {
    /// Read a document, `None` when absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a document, replacing any previous value
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a document; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Make every completed write durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared store handle
pub type SharedStore = Arc<dyn DurableStore>;

/// In-process store, used for tests and the `memory` backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.docs.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.docs.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.docs.write().remove(key);
        Ok(())
    }
}

/// Load a document, falling back to `T::default()` on any read problem
pub(crate) fn load_document<T>(store: &dyn DurableStore, key: &str, metrics: Option<&Metrics>) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::error!(key, error = %e, "Document read failed, using empty collection");
            if let Some(m) = metrics {
                m.record_corrupt_document();
            }
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::error!(key, error = %e, "Corrupt document, using empty collection");
            if let Some(m) = metrics {
                m.record_corrupt_document();
            }
            T::default()
        }
    }
}

/// Serialize and write a document
pub(crate) fn save_document<T: Serialize>(store: &dyn DurableStore, key: &str, doc: &T) -> Result<()> {
    let raw = serde_json::to_string(doc)?;
    store.put(key, &raw)?;
    tracing::debug!(key, bytes = raw.len(), "Document written");
    Ok(())
}
