use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of `hedgeiq.yaml`. Every section may be omitted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HedgeConfig {
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VenueConfig {
    /// Underlying asset, e.g. `BTC`.
    #[serde(default = "default_asset")]
    pub asset: String,
    /// Index used as spot, e.g. `btc_usd`.
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            asset: default_asset(),
            index_name: default_index_name(),
            ws_url: default_ws_url(),
            rest_url: default_rest_url(),
            client_id: None,
            client_secret: None,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl VenueConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_heartbeat_interval_seconds")]
    pub heartbeat_interval_seconds: u64,
    /// Must be strictly greater than the heartbeat interval.
    #[serde(default = "default_read_timeout_seconds")]
    pub read_timeout_seconds: u64,
    #[serde(default = "default_reconnect_delay_seconds")]
    pub reconnect_delay_seconds: u64,
    #[serde(default = "default_summary_interval_seconds")]
    pub summary_interval_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_seconds: default_heartbeat_interval_seconds(),
            read_timeout_seconds: default_read_timeout_seconds(),
            reconnect_delay_seconds: default_reconnect_delay_seconds(),
            summary_interval_seconds: default_summary_interval_seconds(),
        }
    }
}

impl FeedConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_seconds)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_seconds)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_secs(self.summary_interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_recalc_every_n_trades")]
    pub recalc_every_n_trades: u64,
    #[serde(default = "default_recalc_interval_seconds")]
    pub recalc_interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            recalc_every_n_trades: default_recalc_every_n_trades(),
            recalc_interval_seconds: default_recalc_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnapshotConfig {
    #[serde(default = "default_refresh_interval_seconds")]
    pub refresh_interval_seconds: u64,
    #[serde(default = "default_max_days_to_expiry")]
    pub max_days_to_expiry: f64,
    /// Used for instruments the venue returns no summary for (percent).
    #[serde(default = "default_mark_iv")]
    pub default_mark_iv: f64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: default_refresh_interval_seconds(),
            max_days_to_expiry: default_max_days_to_expiry(),
            default_mark_iv: default_mark_iv(),
        }
    }
}

impl SnapshotConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default = "default_min_hours_to_expiry")]
    pub min_hours_to_expiry: f64,
    /// Half-width of the flip search window as a fraction of spot.
    #[serde(default = "default_flip_range_pct")]
    pub flip_range_pct: f64,
    #[serde(default = "default_min_position")]
    pub min_position: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: default_risk_free_rate(),
            min_hours_to_expiry: default_min_hours_to_expiry(),
            flip_range_pct: default_flip_range_pct(),
            min_position: default_min_position(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// `redis` or `memory`.
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default)]
    pub redis_url: Option<String>,
    #[serde(default = "default_store_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            redis_url: None,
            connect_timeout_seconds: default_store_connect_timeout_seconds(),
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}
