// Venue defaults
pub fn default_asset() -> String {
    "BTC".to_string()
}

pub fn default_index_name() -> String {
    "btc_usd".to_string()
}

pub fn default_ws_url() -> String {
    "wss://www.deribit.com/ws/api/v2".to_string()
}

pub fn default_rest_url() -> String {
    "https://www.deribit.com/api/v2/public".to_string()
}

pub fn default_request_timeout_seconds() -> u64 {
    10
}

// Feed defaults
pub fn default_heartbeat_interval_seconds() -> u64 {
    30
}

pub fn default_read_timeout_seconds() -> u64 {
    45
}

pub fn default_reconnect_delay_seconds() -> u64 {
    5
}

pub fn default_summary_interval_seconds() -> u64 {
    60
}

// Scheduler defaults
pub fn default_recalc_every_n_trades() -> u64 {
    10
}

pub fn default_recalc_interval_seconds() -> u64 {
    5
}

// Snapshot defaults
pub fn default_refresh_interval_seconds() -> u64 {
    300
}

pub fn default_max_days_to_expiry() -> f64 {
    30.0
}

/// Percent, as quoted by the venue.
pub fn default_mark_iv() -> f64 {
    50.0
}

// Engine defaults
pub fn default_risk_free_rate() -> f64 {
    0.0
}

pub fn default_min_hours_to_expiry() -> f64 {
    2.0
}

pub fn default_flip_range_pct() -> f64 {
    0.15
}

pub fn default_min_position() -> f64 {
    0.001
}

// Store defaults
pub fn default_store_backend() -> String {
    "memory".to_string()
}

pub fn default_store_connect_timeout_seconds() -> u64 {
    5
}

// Metrics defaults
pub fn default_metrics_port() -> u16 {
    9090
}
