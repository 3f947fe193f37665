//! Dealer inventory backed by the state store.

use std::sync::Arc;

use common::{DealerPositions, PositionKey, Trade};
use tracing::{debug, info, warn};

use crate::keys::DEALER_INVENTORY;
use crate::traits::{StateStore, StoreError, StoreResult};

/// Signed dealer positions, mutated only through atomic deltas.
#[derive(Clone)]
pub struct DealerInventory {
    store: Arc<dyn StateStore>,
}

impl DealerInventory {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// Add `delta` to the position at `key`; returns the new position.
    pub async fn apply_delta(&self, key: PositionKey, delta: f64) -> StoreResult<f64> {
        self.store
            .hash_incr_by_float(DEALER_INVENTORY, &key.field(), delta)
            .await
    }

    /// Book a trade against the dealer (opposite of the taker).
    pub async fn apply_trade(&self, trade: &Trade) -> StoreResult<f64> {
        let position = self.apply_delta(trade.key, trade.dealer_delta()).await?;
        debug!(
            instrument = %trade.instrument_name,
            side = %trade.side,
            amount = trade.amount,
            position,
            "Applied trade to dealer inventory"
        );
        Ok(position)
    }

    /// Position at `key`, zero when absent.
    pub async fn position(&self, key: PositionKey) -> StoreResult<f64> {
        let field = key.field();
        match self.store.hash_get(DEALER_INVENTORY, &field).await? {
            Some(raw) => raw.parse::<f64>().map_err(|_| StoreError::NotANumber {
                key: format!("{}/{}", DEALER_INVENTORY, field),
                value: raw,
            }),
            None => Ok(0.0),
        }
    }

    /// Read every position. Fields that do not parse are skipped.
    pub async fn snapshot(&self) -> StoreResult<DealerPositions> {
        let fields = self.store.hash_get_all(DEALER_INVENTORY).await?;
        let mut positions = DealerPositions::new();
        for (field, raw) in fields {
            let Some(key) = PositionKey::from_field(&field) else {
                warn!(field = %field, "Skipping malformed inventory field");
                continue;
            };
            match raw.parse::<f64>() {
                Ok(value) => {
                    positions.apply(key, value);
                }
                Err(_) => warn!(field = %field, value = %raw, "Skipping non-numeric inventory value"),
            }
        }
        Ok(positions)
    }

    /// Drop every position. The only wholesale overwrite of inventory.
    pub async fn reset(&self) -> StoreResult<()> {
        self.store.delete(DEALER_INVENTORY).await?;
        info!("Dealer inventory reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use common::{OptionType, TakerSide};

    fn inventory() -> (Arc<InMemoryStore>, DealerInventory) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), DealerInventory::new(store))
    }

    #[tokio::test]
    async fn test_buy_decreases_sell_increases() {
        let (_, inventory) = inventory();
        let key = PositionKey::new(90000, OptionType::Call);

        let buy = Trade::parse("BTC-27DEC24-90000-C", 3.0, TakerSide::Buy, 0.02, None).unwrap();
        let sell = Trade::parse("BTC-27DEC24-90000-C", 1.25, TakerSide::Sell, 0.02, None).unwrap();

        assert_eq!(inventory.apply_trade(&buy).await.unwrap(), -3.0);
        assert_eq!(inventory.apply_trade(&sell).await.unwrap(), -1.75);
        assert_eq!(inventory.position(key).await.unwrap(), -1.75);
    }

    #[tokio::test]
    async fn test_negative_buy_amount_raises_position() {
        let (_, inventory) = inventory();
        let buy = Trade::parse("BTC-27DEC24-90000-C", -2.0, TakerSide::Buy, 0.02, None).unwrap();
        assert_eq!(inventory.apply_trade(&buy).await.unwrap(), 2.0);
    }

    #[tokio::test]
    async fn test_missing_position_is_zero() {
        let (_, inventory) = inventory();
        let key = PositionKey::new(50000, OptionType::Put);
        assert_eq!(inventory.position(key).await.unwrap(), 0.0);
        assert!(inventory.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_skips_malformed_fields() {
        let (store, inventory) = inventory();
        inventory.apply_delta(PositionKey::new(90000, OptionType::Call), 146.0).await.unwrap();
        inventory.apply_delta(PositionKey::new(85000, OptionType::Put), -20.0).await.unwrap();
        store.hash_incr_by_float(DEALER_INVENTORY, "garbage", 1.0).await.unwrap();

        let positions = inventory.snapshot().await.unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions.get_at(90000, OptionType::Call), 146.0);
        assert_eq!(positions.get_at(85000, OptionType::Put), -20.0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (_, inventory) = inventory();
        inventory.apply_delta(PositionKey::new(90000, OptionType::Call), 5.0).await.unwrap();
        inventory.reset().await.unwrap();
        assert!(inventory.snapshot().await.unwrap().is_empty());
    }
}
