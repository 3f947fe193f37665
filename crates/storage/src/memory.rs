//! In-memory store implementation
//!
//! Volatile: everything is lost when the process exits.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::traits::{KeyWrite, StateStore, StoreError, StoreResult};
use crate::StoreType;

#[derive(Debug, Default)]
struct MemoryState {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
}

impl MemoryState {
    fn delete(&mut self, key: &str) {
        self.strings.remove(key);
        self.hashes.remove(key);
    }
}

/// In-memory state store
///
/// A single lock guards strings and hashes so batches are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

impl InMemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.state.read().strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut state = self.state.write();
        state.hashes.remove(key);
        state.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn write_batch(&self, writes: &[KeyWrite]) -> StoreResult<()> {
        let mut state = self.state.write();
        for write in writes {
            match write {
                KeyWrite::Set { key, value } => {
                    state.hashes.remove(key);
                    state.strings.insert(key.clone(), value.clone());
                }
                KeyWrite::Delete { key } => state.delete(key),
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.state.write().delete(key);
        Ok(())
    }

    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64> {
        let mut state = self.state.write();
        let hash = state.hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => raw.parse::<f64>().map_err(|_| StoreError::NotANumber {
                key: format!("{}/{}", key, field),
                value: raw.clone(),
            })?,
            None => 0.0,
        };
        let updated = current + delta;
        hash.insert(field.to_string(), updated.to_string());
        Ok(updated)
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(self
            .state
            .read()
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        Ok(self
            .state
            .read()
            .hashes
            .get(key)
            .map(|hash| hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> StoreType {
        StoreType::InMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_creates_and_accumulates() {
        let store = InMemoryStore::new();
        assert_eq!(store.hash_incr_by_float("h", "f", 1.5).await.unwrap(), 1.5);
        assert_eq!(store.hash_incr_by_float("h", "f", -4.0).await.unwrap(), -2.5);
        assert_eq!(store.hash_get("h", "f").await.unwrap().as_deref(), Some("-2.5"));
        assert_eq!(store.hash_get("h", "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_numeric_field() {
        let store = InMemoryStore::new();
        store.hash_incr_by_float("h", "f", 1.0).await.unwrap();
        store.state.write().hashes.get_mut("h").unwrap().insert("f".into(), "abc".into());
        assert!(matches!(
            store.hash_incr_by_float("h", "f", 1.0).await,
            Err(StoreError::NotANumber { .. })
        ));
    }

    #[tokio::test]
    async fn test_batch_sets_and_deletes() {
        let store = InMemoryStore::new();
        store.set("a", "1").await.unwrap();
        store
            .write_batch(&[KeyWrite::set("b", "2"), KeyWrite::delete("a")])
            .await
            .unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_delete_removes_hash() {
        let store = InMemoryStore::new();
        store.hash_incr_by_float("h", "f", 1.0).await.unwrap();
        store.delete("h").await.unwrap();
        assert!(store.hash_get_all("h").await.unwrap().is_empty());
    }
}
