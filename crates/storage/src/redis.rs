//! Redis store implementation
//!
//! Durable backend shared with read-side processes.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::traits::{KeyWrite, StateStore, StoreError, StoreResult};
use crate::StoreType;

/// Redis state store
pub struct RedisStore {
    /// Redis connection (wrapped in Mutex for mutable access)
    redis: Arc<tokio::sync::Mutex<redis::aio::ConnectionManager>>,
}

impl RedisStore {
    /// Connect to Redis, failing if no connection is established within `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> StoreResult<Self> {
        info!(url = %redact(url), "Connecting to Redis");

        let client = redis::Client::open(url).map_err(|e| StoreError::RedisError(e.to_string()))?;

        let connection_manager = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| StoreError::RedisError(format!("connection timed out after {:?}", timeout)))?
            .map_err(|e| StoreError::RedisError(e.to_string()))?;

        let store = Self {
            redis: Arc::new(tokio::sync::Mutex::new(connection_manager)),
        };
        store.ping().await?;
        Ok(store)
    }
}

/// Hide any password in a connection URL before logging it.
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut redis = self.redis.lock().await;
        redis
            .get(key)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut redis = self.redis.lock().await;
        redis
            .set::<_, _, ()>(key, value)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn write_batch(&self, writes: &[KeyWrite]) -> StoreResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for write in writes {
            match write {
                KeyWrite::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                KeyWrite::Delete { key } => {
                    pipe.del(key).ignore();
                }
            }
        }

        debug!(writes = writes.len(), "Writing atomic batch");
        let mut redis = self.redis.lock().await;
        pipe.query_async::<_, ()>(&mut *redis)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut redis = self.redis.lock().await;
        redis
            .del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn hash_incr_by_float(&self, key: &str, field: &str, delta: f64) -> StoreResult<f64> {
        // A float delta makes redis-rs issue HINCRBYFLOAT.
        let mut redis = self.redis.lock().await;
        redis
            .hincr(key, field, delta)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut redis = self.redis.lock().await;
        redis
            .hget(key, field)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<Vec<(String, String)>> {
        let mut redis = self.redis.lock().await;
        let fields: HashMap<String, String> = redis
            .hgetall(key)
            .await
            .map_err(|e| StoreError::RedisError(e.to_string()))?;
        Ok(fields.into_iter().collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut redis = self.redis.lock().await;
        redis::cmd("PING")
            .query_async::<_, String>(&mut *redis)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::RedisError(e.to_string()))
    }

    fn backend(&self) -> StoreType {
        StoreType::Redis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_password() {
        assert_eq!(redact("redis://:hunter2@cache:6379/0"), "redis://:***@cache:6379/0");
        assert_eq!(redact("redis://cache:6379/0"), "redis://cache:6379/0");
    }

    #[tokio::test]
    async fn test_connect_unreachable_fails() {
        let result = RedisStore::connect("redis://127.0.0.1:1/", Duration::from_secs(2)).await;
        assert!(matches!(result, Err(StoreError::RedisError(_))));
    }
}
