//! State store for HedgeIQ
//!
//! This crate provides the key-value store the pipeline writes to and
//! read-side consumers poll, in two interchangeable backends:
//!
//! - [`RedisStore`] - durable, shared across processes
//! - [`InMemoryStore`] - volatile fallback
//!
//! On top of the raw store sit [`DealerInventory`] and [`ResultStore`],
//! which own the key layout described in [`keys`].

mod inventory;
pub mod keys;
mod memory;
mod redis;
mod results;
mod stats;
mod traits;

pub use inventory::DealerInventory;
pub use memory::InMemoryStore;
pub use self::redis::RedisStore;
pub use results::ResultStore;
pub use stats::StoreStats;
pub use traits::*;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Store type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// In-memory store (fast, non-persistent)
    InMemory,
    /// Redis store (persistent)
    Redis,
}

impl StoreType {
    /// Parse store type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inmemory" | "in_memory" | "memory" => Some(StoreType::InMemory),
            "redis" => Some(StoreType::Redis),
            _ => None,
        }
    }
}

impl fmt::Display for StoreType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreType::InMemory => f.write_str("memory"),
            StoreType::Redis => f.write_str("redis"),
        }
    }
}

/// Create a store, degrading to memory when Redis is unavailable
///
/// Never fails: a missing URL or an unreachable server is logged and the
/// volatile backend is returned instead.
pub async fn create_store(
    store_type: StoreType,
    redis_url: Option<&str>,
    connect_timeout: Duration,
) -> Arc<dyn StateStore> {
    match store_type {
        StoreType::InMemory => {
            info!("Creating in-memory store");
            Arc::new(InMemoryStore::new())
        }
        StoreType::Redis => {
            let Some(url) = redis_url else {
                warn!("Redis store selected without a URL, falling back to in-memory store");
                return Arc::new(InMemoryStore::new());
            };
            match RedisStore::connect(url, connect_timeout).await {
                Ok(store) => {
                    info!("Redis store connected");
                    Arc::new(store)
                }
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, falling back to in-memory store (state will not persist)");
                    Arc::new(InMemoryStore::new())
                }
            }
        }
    }
}

/// Create store from StoreConfig
pub async fn create_store_from_config(config: &config::StoreConfig) -> Arc<dyn StateStore> {
    let store_type = StoreType::from_str(&config.backend).unwrap_or(StoreType::InMemory);

    create_store(store_type, config.redis_url.as_deref(), config.connect_timeout()).await
}

/// Connect to exactly the configured backend
///
/// Unlike [`create_store_from_config`] this never degrades to memory, so
/// admin commands cannot silently act on an empty volatile store.
pub async fn connect_store(config: &config::StoreConfig) -> StoreResult<Arc<dyn StateStore>> {
    let store_type = StoreType::from_str(&config.backend)
        .ok_or_else(|| StoreError::Other(format!("Unknown store backend: {}", config.backend)))?;

    match store_type {
        StoreType::InMemory => Ok(Arc::new(InMemoryStore::new())),
        StoreType::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                StoreError::Other("Redis store selected without a URL".to_string())
            })?;
            let store = RedisStore::connect(url, config.connect_timeout()).await?;
            info!("Redis store connected");
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_type_from_str() {
        assert_eq!(StoreType::from_str("Redis"), Some(StoreType::Redis));
        assert_eq!(StoreType::from_str("in_memory"), Some(StoreType::InMemory));
        assert_eq!(StoreType::from_str("postgres"), None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_memory() {
        let store = create_store(
            StoreType::Redis,
            Some("redis://127.0.0.1:1/"),
            Duration::from_secs(2),
        )
        .await;
        assert_eq!(store.backend(), StoreType::InMemory);
        store.hash_incr_by_float("h", "f", 2.0).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_url_falls_back_to_memory() {
        let config = config::StoreConfig {
            backend: "redis".to_string(),
            redis_url: None,
            connect_timeout_seconds: 1,
        };
        let store = create_store_from_config(&config).await;
        assert_eq!(store.backend(), StoreType::InMemory);
    }

    #[tokio::test]
    async fn test_connect_store_rejects_unreachable_redis() {
        let config = config::StoreConfig {
            backend: "redis".to_string(),
            redis_url: Some("redis://127.0.0.1:1/".to_string()),
            connect_timeout_seconds: 2,
        };
        assert!(connect_store(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_connect_store_requires_url_and_known_backend() {
        let mut config = config::StoreConfig {
            backend: "redis".to_string(),
            redis_url: None,
            connect_timeout_seconds: 1,
        };
        assert!(matches!(connect_store(&config).await, Err(StoreError::Other(_))));

        config.backend = "postgres".to_string();
        assert!(matches!(connect_store(&config).await, Err(StoreError::Other(_))));

        config.backend = "memory".to_string();
        let store = connect_store(&config).await.unwrap();
        assert_eq!(store.backend(), StoreType::InMemory);
    }
}
