//! Prometheus metrics infrastructure
//!
//! Handles are cheap to clone and record nothing until [`init_metrics`]
//! installs a recorder, so tests need no setup.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// Exposes `/metrics` over HTTP on the given port.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Trade feed metrics
///
/// * `feed_trades_total` - trades applied to inventory
/// * `feed_trades_dropped_total` - records dropped as malformed or non-option
/// * `feed_reconnects_total` - sessions that ended and were retried
/// * `feed_connected` - 1 while listening, 0 otherwise
/// * `feed_heartbeat_probes_total` - liveness probes answered or sent
#[derive(Clone)]
pub struct FeedMetrics {
    trades: Counter,
    dropped: Counter,
    reconnects: Counter,
    connected: Gauge,
    heartbeat_probes: Counter,
}

impl FeedMetrics {
    pub fn new(asset: &str) -> Self {
        let asset = asset.to_string();
        Self {
            trades: counter!("feed_trades_total", "asset" => asset.clone()),
            dropped: counter!("feed_trades_dropped_total", "asset" => asset.clone()),
            reconnects: counter!("feed_reconnects_total", "asset" => asset.clone()),
            connected: gauge!("feed_connected", "asset" => asset.clone()),
            heartbeat_probes: counter!("feed_heartbeat_probes_total", "asset" => asset),
        }
    }

    pub fn trade_applied(&self) {
        self.trades.increment(1);
    }

    pub fn trades_dropped(&self, count: u64) {
        self.dropped.increment(count);
    }

    pub fn reconnect(&self) {
        self.reconnects.increment(1);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(if connected { 1.0 } else { 0.0 });
    }

    pub fn heartbeat_probe(&self) {
        self.heartbeat_probes.increment(1);
    }
}

/// Exposure engine metrics
///
/// * `gex_recalculations_total`
/// * `gex_net` - net GEX of the last result
/// * `gex_flip_level` - last flip level, 0 when none
/// * `gex_recalculation_duration_seconds`
/// * `snapshot_refresh_failures_total`
#[derive(Clone)]
pub struct ExposureMetrics {
    recalculations: Counter,
    net_gex: Gauge,
    flip_level: Gauge,
    duration: Histogram,
    refresh_failures: Counter,
}

impl ExposureMetrics {
    pub fn new(asset: &str) -> Self {
        let asset = asset.to_string();
        Self {
            recalculations: counter!("gex_recalculations_total", "asset" => asset.clone()),
            net_gex: gauge!("gex_net", "asset" => asset.clone()),
            flip_level: gauge!("gex_flip_level", "asset" => asset.clone()),
            duration: histogram!("gex_recalculation_duration_seconds", "asset" => asset.clone()),
            refresh_failures: counter!("snapshot_refresh_failures_total", "asset" => asset),
        }
    }

    /// Record a completed recalculation
    pub fn record_recalculation(&self, duration: Duration, net_gex: f64, flip_level: Option<f64>) {
        self.recalculations.increment(1);
        self.duration.record(duration.as_secs_f64());
        self.net_gex.set(net_gex);
        self.flip_level.set(flip_level.unwrap_or(0.0));
    }

    pub fn snapshot_refresh_failed(&self) {
        self.refresh_failures.increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_work_without_recorder() {
        let feed = FeedMetrics::new("BTC");
        feed.trade_applied();
        feed.trades_dropped(2);
        feed.set_connected(true);
        feed.heartbeat_probe();
        feed.reconnect();

        let exposure = ExposureMetrics::new("BTC");
        exposure.record_recalculation(Duration::from_millis(3), -1.5e6, None);
        exposure.snapshot_refresh_failed();
    }
}
