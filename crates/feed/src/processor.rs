//! Flow pipeline: trades in, dealer inventory and exposure results out.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{GexResult, Trade};
use gex_engine::{GexEngine, RecalcScheduler};
use market_data::{InstrumentSnapshotProvider, RefreshOutcome, VenueClient};
use observability::{ExposureMetrics, FeedMetrics};
use storage::{DealerInventory, ResultStore, StoreResult};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::client::{FeedHandler, PollReason};

/// Trades at or above this size are logged at info.
const NOTABLE_TRADE_CONTRACTS: f64 = 1.0;

/// Positions listed in the periodic inventory summary.
const SUMMARY_TOP_POSITIONS: usize = 5;

/// Everything the processor needs, built once at startup.
pub struct ProcessorParts<V> {
    pub inventory: DealerInventory,
    pub results: ResultStore,
    pub snapshots: InstrumentSnapshotProvider<V>,
    pub engine: GexEngine,
    pub scheduler: RecalcScheduler,
    pub summary_interval: Duration,
    pub feed_metrics: FeedMetrics,
    pub exposure_metrics: ExposureMetrics,
}

pub struct FlowProcessor<V> {
    inventory: DealerInventory,
    results: ResultStore,
    snapshots: InstrumentSnapshotProvider<V>,
    engine: GexEngine,
    scheduler: RecalcScheduler,
    summary_interval: Duration,
    last_summary: Option<Instant>,
    trades_total: u64,
    feed_metrics: FeedMetrics,
    exposure_metrics: ExposureMetrics,
}

impl<V: VenueClient> FlowProcessor<V> {
    pub fn new(parts: ProcessorParts<V>) -> Self {
        Self {
            inventory: parts.inventory,
            results: parts.results,
            snapshots: parts.snapshots,
            engine: parts.engine,
            scheduler: parts.scheduler,
            summary_interval: parts.summary_interval,
            last_summary: None,
            trades_total: 0,
            feed_metrics: parts.feed_metrics,
            exposure_metrics: parts.exposure_metrics,
        }
    }

    /// Trades applied since startup.
    pub fn trades_total(&self) -> u64 {
        self.trades_total
    }

    /// Fetch the first snapshot; call before connecting to the feed.
    pub async fn prime(&mut self) {
        self.refresh_snapshot().await;
    }

    async fn refresh_snapshot(&mut self) {
        match self.snapshots.refresh_if_due(Utc::now()).await {
            RefreshOutcome::NotDue => {}
            RefreshOutcome::Refreshed => {
                if let Some(snapshot) = self.snapshots.current() {
                    if let Err(e) = self.results.set_spot(snapshot.spot).await {
                        warn!(error = %e, "Failed to store spot price");
                    }
                }
            }
            RefreshOutcome::Failed(_) => self.exposure_metrics.snapshot_refresh_failed(),
        }
    }

    /// Recompute exposure from the current inventory and publish it.
    ///
    /// Returns `None` when no instrument snapshot has been fetched yet.
    pub async fn recalculate(&mut self) -> StoreResult<Option<GexResult>> {
        let Some(snapshot) = self.snapshots.current() else {
            debug!("No instrument snapshot yet, skipping recalculation");
            return Ok(None);
        };

        let started = Instant::now();
        let positions = self.inventory.snapshot().await?;
        let result = self.engine.calculate_snapshot(&positions, &snapshot, Utc::now());
        self.results.publish(&result).await?;

        self.exposure_metrics
            .record_recalculation(started.elapsed(), result.net_gex, result.flip_level);
        info!(
            regime = result.regime().label(),
            net_gex = result.net_gex,
            flip = ?result.flip_level,
            strikes = result.gex_by_strike.len(),
            spot = result.spot_price,
            "GEX recalculated"
        );
        Ok(Some(result))
    }

    async fn maybe_recalculate(&mut self) {
        let now = Instant::now();
        if !self.scheduler.should_run(now) {
            return;
        }
        match self.recalculate().await {
            Ok(Some(_)) => self.scheduler.mark_run(now),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "GEX recalculation failed");
                self.scheduler.mark_run(now);
            }
        }
    }

    async fn maybe_log_summary(&mut self) {
        let now = Instant::now();
        let due = self
            .last_summary
            .map_or(true, |last| now.saturating_duration_since(last) >= self.summary_interval);
        if !due {
            return;
        }
        self.last_summary = Some(now);

        match self.inventory.snapshot().await {
            Ok(positions) => {
                let largest: Vec<String> = positions
                    .largest(SUMMARY_TOP_POSITIONS)
                    .into_iter()
                    .map(|(key, position)| format!("{}={:+.1}", key, position))
                    .collect();
                info!(
                    positions = positions.len(),
                    strikes = positions.strikes_tracked(),
                    total_abs = positions.total_abs_position(),
                    trades = self.trades_total,
                    largest = %largest.join(", "),
                    "Dealer inventory summary"
                );
            }
            Err(e) => warn!(error = %e, "Failed to read inventory for summary"),
        }
    }
}

#[async_trait]
impl<V: VenueClient> FeedHandler for FlowProcessor<V> {
    async fn on_trade(&mut self, trade: Trade) {
        match self.inventory.apply_trade(&trade).await {
            Ok(position) => {
                self.trades_total += 1;
                self.scheduler.record_trade();
                self.feed_metrics.trade_applied();
                if trade.amount.abs() >= NOTABLE_TRADE_CONTRACTS {
                    info!(
                        side = %trade.side,
                        amount = trade.amount,
                        option_type = %trade.key.option_type,
                        strike = trade.key.strike,
                        dealer_position = position,
                        "Trade"
                    );
                }
            }
            Err(e) => {
                error!(error = %e, instrument = %trade.instrument_name, "Failed to apply trade");
                self.feed_metrics.trades_dropped(1);
            }
        }
    }

    async fn on_dropped(&mut self, count: usize) {
        self.feed_metrics.trades_dropped(count as u64);
    }

    async fn on_poll(&mut self, reason: PollReason) {
        if reason == PollReason::SessionStart {
            debug!(trades_total = self.trades_total, "Processor attached to new session");
        }
        self.refresh_snapshot().await;
        self.maybe_recalculate().await;
        self.maybe_log_summary().await;
    }
}
