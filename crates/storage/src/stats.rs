//! Store statistics for the `status` command.

use chrono::{DateTime, Utc};

use crate::inventory::DealerInventory;
use crate::results::ResultStore;
use crate::traits::StoreResult;
use crate::StoreType;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub backend: StoreType,
    pub strikes_tracked: usize,
    /// Sum of absolute call and put positions.
    pub total_position_size: f64,
    pub spot_price: Option<f64>,
    pub flip_level: Option<f64>,
    pub last_gex_update: Option<DateTime<Utc>>,
}

impl StoreStats {
    pub async fn collect(
        backend: StoreType,
        inventory: &DealerInventory,
        results: &ResultStore,
    ) -> StoreResult<Self> {
        let positions = inventory.snapshot().await?;
        Ok(Self {
            backend,
            strikes_tracked: positions.strikes_tracked(),
            total_position_size: positions.total_abs_position(),
            spot_price: results.spot().await?,
            flip_level: results.flip_level().await?,
            last_gex_update: results.last_updated().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryStore, StateStore};
    use common::{GexResult, OptionType, PositionKey};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_collect_stats() {
        let store: Arc<dyn StateStore> = Arc::new(InMemoryStore::new());
        let inventory = DealerInventory::new(store.clone());
        let results = ResultStore::new(store.clone());

        inventory.apply_delta(PositionKey::new(90000, OptionType::Call), 10.0).await.unwrap();
        inventory.apply_delta(PositionKey::new(90000, OptionType::Put), -5.0).await.unwrap();
        inventory.apply_delta(PositionKey::new(95000, OptionType::Call), -2.5).await.unwrap();
        results.set_spot(87800.0).await.unwrap();

        let now = Utc::now();
        results.publish(&GexResult::empty(87800.0, None, now)).await.unwrap();

        let stats = StoreStats::collect(store.backend(), &inventory, &results).await.unwrap();
        assert_eq!(stats.backend, StoreType::InMemory);
        assert_eq!(stats.strikes_tracked, 2);
        assert_eq!(stats.total_position_size, 17.5);
        assert_eq!(stats.spot_price, Some(87800.0));
        assert_eq!(stats.flip_level, None);
        assert!(stats.last_gex_update.is_some());
    }
}
