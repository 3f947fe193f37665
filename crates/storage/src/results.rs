//! Last computed exposure result and spot mirror.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::GexResult;
use tracing::debug;

use crate::keys::{GEX_CURRENT, GEX_FLIP, GEX_LAST_UPDATED, SPOT_PRICE};
use crate::traits::{KeyWrite, StateStore, StoreError, StoreResult};

/// Single overwritten record of the latest [`GexResult`].
#[derive(Clone)]
pub struct ResultStore {
    store: Arc<dyn StateStore>,
}

impl ResultStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Replace the live result.
    ///
    /// The record, its timestamp and the flip mirror change in one atomic
    /// batch; the mirror is deleted when the result has no flip.
    pub async fn publish(&self, result: &GexResult) -> StoreResult<()> {
        let json = result
            .to_json()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let flip = match result.flip_level {
            Some(level) => KeyWrite::set(GEX_FLIP, level.to_string()),
            None => KeyWrite::delete(GEX_FLIP),
        };

        self.store
            .write_batch(&[
                KeyWrite::set(GEX_CURRENT, json),
                KeyWrite::set(GEX_LAST_UPDATED, result.timestamp.to_rfc3339()),
                flip,
            ])
            .await?;

        debug!(net_gex = result.net_gex, flip = ?result.flip_level, "Published exposure result");
        Ok(())
    }

    pub async fn latest(&self) -> StoreResult<Option<GexResult>> {
        match self.store.get(GEX_CURRENT).await? {
            Some(raw) => GexResult::from_json(&raw)
                .map(Some)
                .map_err(|e| StoreError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn flip_level(&self) -> StoreResult<Option<f64>> {
        self.get_f64(GEX_FLIP).await
    }

    pub async fn last_updated(&self) -> StoreResult<Option<DateTime<Utc>>> {
        match self.store.get(GEX_LAST_UPDATED).await? {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|ts| Some(ts.with_timezone(&Utc)))
                .map_err(|e| StoreError::SerializationError(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn set_spot(&self, spot: f64) -> StoreResult<()> {
        self.store.set(SPOT_PRICE, &spot.to_string()).await
    }

    pub async fn spot(&self) -> StoreResult<Option<f64>> {
        self.get_f64(SPOT_PRICE).await
    }

    async fn get_f64(&self, key: &str) -> StoreResult<Option<f64>> {
        match self.store.get(key).await? {
            Some(raw) => raw
                .parse::<f64>()
                .map(Some)
                .map_err(|_| StoreError::NotANumber {
                    key: key.to_string(),
                    value: raw,
                }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    fn results() -> ResultStore {
        ResultStore::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn test_publish_and_read_back() {
        let store = results();
        let now = Utc::now();
        let mut result = GexResult::empty(87800.0, Some(now), now);
        result.flip_level = Some(90666.5);

        store.publish(&result).await.unwrap();

        assert_eq!(store.latest().await.unwrap(), Some(result));
        assert_eq!(store.flip_level().await.unwrap(), Some(90666.5));
        let updated = store.last_updated().await.unwrap().unwrap();
        assert_eq!(updated.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn test_publish_without_flip_clears_mirror() {
        let store = results();
        let now = Utc::now();
        let mut with_flip = GexResult::empty(87800.0, None, now);
        with_flip.flip_level = Some(88000.0);
        store.publish(&with_flip).await.unwrap();

        store.publish(&GexResult::empty(87800.0, None, now)).await.unwrap();
        assert_eq!(store.flip_level().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_spot_roundtrip() {
        let store = results();
        assert_eq!(store.spot().await.unwrap(), None);
        store.set_spot(87812.5).await.unwrap();
        assert_eq!(store.spot().await.unwrap(), Some(87812.5));
    }
}
