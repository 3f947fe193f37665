//! Store traits for HedgeIQ
//!
//! This module defines the key-value interface every backend must satisfy.

use async_trait::async_trait;

use crate::StoreType;

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    RedisError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Value at {key} is not a number: {value}")]
    NotANumber { key: String, value: String },

    #[error("Store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyWrite {
    Set { key: String, value: String },
    Delete { key: String },
}

impl KeyWrite {
    pub fn set(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyWrite::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        KeyWrite::Delete { key: key.into() }
    }
}

/// Trait for the shared state store
///
/// Both backends offer the same semantics: string keys, hash keys, an
/// atomic float increment on hash fields and an atomic multi-key write.
/// Readers in other processes may observe the store at any time, so no
/// operation here is a client-side read-then-write.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get a string value
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Set a string value, overwriting any previous one
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Apply every write or none of them
    async fn write_batch(&self, writes: &[KeyWrite]) -> StoreResult<()>;

    /// Delete a key of any shape
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Atomically add `delta` to a hash field, creating it at zero first
    ///
    /// Returns the new value.
    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64>;

    /// Get one hash field
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Get every field of a hash
    async fn hash_get_all(&self, key: &str) -> StoreResult<Vec<(String, String)>>;

    /// Check the backend is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Which backend this is
    fn backend(&self) -> StoreType;
}
