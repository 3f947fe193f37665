use crate::*;
use thiserror::Error;
use url::Url;

const STORE_BACKENDS: [&str; 4] = ["redis", "memory", "inmemory", "in_memory"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("venue.asset is required")]
    MissingAsset,

    #[error("venue.index_name is required")]
    MissingIndexName,

    #[error("{field} is not a valid URL: {message}")]
    InvalidUrl { field: String, message: String },

    #[error("{field} must use one of the schemes: {expected}")]
    InvalidUrlScheme { field: String, expected: String },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be a positive float")]
    InvalidPositiveFloat { field: String },

    #[error("{field} must not be negative")]
    NegativeValue { field: String },

    #[error(
        "feed.read_timeout_seconds ({read_timeout}) must be greater than feed.heartbeat_interval_seconds ({heartbeat})"
    )]
    ReadTimeoutNotAboveHeartbeat { read_timeout: u64, heartbeat: u64 },

    #[error("engine.flip_range_pct must be between 0 and 1 (exclusive), got: {0}")]
    InvalidFlipRange(f64),

    #[error("engine.risk_free_rate must be a finite number, got: {0}")]
    InvalidRiskFreeRate(f64),

    #[error("Invalid store backend: {0}. Must be one of: redis, memory")]
    InvalidStoreBackend(String),
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &HedgeConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_venue(&config.venue, &mut report);
    validate_feed(&config.feed, &mut report);
    validate_scheduler(&config.scheduler, &mut report);
    validate_snapshot(&config.snapshot, &mut report);
    validate_engine(&config.engine, &mut report);
    validate_store(&config.store, &mut report);
    validate_metrics(&config.metrics, &mut report);

    report
}

fn validate_venue(venue: &VenueConfig, report: &mut ValidationReport) {
    if venue.asset.trim().is_empty() {
        report.add_error(ValidationError::MissingAsset);
    }
    if venue.index_name.trim().is_empty() {
        report.add_error(ValidationError::MissingIndexName);
    }

    validate_url("venue.ws_url", &venue.ws_url, &["ws", "wss"], report);
    validate_url("venue.rest_url", &venue.rest_url, &["http", "https"], report);

    if venue.request_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "venue.request_timeout_seconds".to_string(),
        });
    }

    for (field, value) in [
        ("venue.client_id", &venue.client_id),
        ("venue.client_secret", &venue.client_secret),
    ] {
        match value {
            None => report.add_warning(
                field,
                "Not set; authentication will fail and the feed will keep retrying",
            ),
            Some(v) if has_unresolved_env_vars(v) => report.add_warning(
                field,
                &format!("Unresolved environment variable placeholder: {}", v),
            ),
            Some(v) if v.trim().is_empty() => report.add_warning(field, "Empty value"),
            Some(_) => {}
        }
    }
}

fn validate_url(field: &str, value: &str, schemes: &[&str], report: &mut ValidationReport) {
    if has_unresolved_env_vars(value) {
        report.add_warning(
            field,
            &format!("Unresolved environment variable placeholder: {}", value),
        );
        return;
    }

    match Url::parse(value) {
        Ok(url) => {
            if !schemes.contains(&url.scheme()) {
                report.add_error(ValidationError::InvalidUrlScheme {
                    field: field.to_string(),
                    expected: schemes.join(", "),
                });
            }
        }
        Err(e) => report.add_error(ValidationError::InvalidUrl {
            field: field.to_string(),
            message: e.to_string(),
        }),
    }
}

fn validate_feed(feed: &FeedConfig, report: &mut ValidationReport) {
    for (field, value) in [
        ("feed.heartbeat_interval_seconds", feed.heartbeat_interval_seconds),
        ("feed.read_timeout_seconds", feed.read_timeout_seconds),
        ("feed.reconnect_delay_seconds", feed.reconnect_delay_seconds),
        ("feed.summary_interval_seconds", feed.summary_interval_seconds),
    ] {
        if value == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: field.to_string(),
            });
        }
    }

    if feed.read_timeout_seconds <= feed.heartbeat_interval_seconds {
        report.add_error(ValidationError::ReadTimeoutNotAboveHeartbeat {
            read_timeout: feed.read_timeout_seconds,
            heartbeat: feed.heartbeat_interval_seconds,
        });
    }
}

fn validate_scheduler(scheduler: &SchedulerConfig, report: &mut ValidationReport) {
    if scheduler.recalc_every_n_trades == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "scheduler.recalc_every_n_trades".to_string(),
        });
    }
    if scheduler.recalc_interval_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "scheduler.recalc_interval_seconds".to_string(),
        });
    }
}

fn validate_snapshot(snapshot: &SnapshotConfig, report: &mut ValidationReport) {
    if snapshot.refresh_interval_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "snapshot.refresh_interval_seconds".to_string(),
        });
    }
    if !(snapshot.max_days_to_expiry > 0.0) {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "snapshot.max_days_to_expiry".to_string(),
        });
    }
    if !(snapshot.default_mark_iv > 0.0) {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: "snapshot.default_mark_iv".to_string(),
        });
    }
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if !engine.risk_free_rate.is_finite() {
        report.add_error(ValidationError::InvalidRiskFreeRate(engine.risk_free_rate));
    }
    if !(engine.flip_range_pct > 0.0 && engine.flip_range_pct < 1.0) {
        report.add_error(ValidationError::InvalidFlipRange(engine.flip_range_pct));
    }
    if !(engine.min_hours_to_expiry >= 0.0) {
        report.add_error(ValidationError::NegativeValue {
            field: "engine.min_hours_to_expiry".to_string(),
        });
    }
    if !(engine.min_position >= 0.0) {
        report.add_error(ValidationError::NegativeValue {
            field: "engine.min_position".to_string(),
        });
    }
}

fn validate_store(store: &StoreConfig, report: &mut ValidationReport) {
    let backend = store.backend.to_lowercase();
    if !STORE_BACKENDS.contains(&backend.as_str()) {
        report.add_error(ValidationError::InvalidStoreBackend(store.backend.clone()));
        return;
    }

    if backend == "redis" {
        match &store.redis_url {
            None => {
                report.add_warning("store.redis_url", "Redis backend selected without a URL");
                report.add_default("store.backend", "memory");
            }
            Some(url) if has_unresolved_env_vars(url) => report.add_warning(
                "store.redis_url",
                &format!("Unresolved environment variable placeholder: {}", url),
            ),
            Some(url) => validate_url("store.redis_url", url, &["redis", "rediss"], report),
        }
        if store.connect_timeout_seconds == 0 {
            report.add_error(ValidationError::InvalidPositiveInteger {
                field: "store.connect_timeout_seconds".to_string(),
            });
        }
    }
}

fn validate_metrics(metrics: &MetricsConfig, report: &mut ValidationReport) {
    if metrics.enabled && metrics.port == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "metrics.port".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> HedgeConfig {
        let mut config = HedgeConfig::default();
        config.venue.client_id = Some("id".to_string());
        config.venue.client_secret = Some("secret".to_string());
        config
    }

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&valid_config());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_read_timeout_must_exceed_heartbeat() {
        let mut config = valid_config();
        config.feed.read_timeout_seconds = 30;
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::ReadTimeoutNotAboveHeartbeat {
            read_timeout: 30,
            heartbeat: 30,
        }));
    }

    #[test]
    fn test_invalid_urls_and_ranges() {
        let mut config = valid_config();
        config.venue.ws_url = "not a url".to_string();
        config.venue.rest_url = "wss://www.deribit.com".to_string();
        config.engine.flip_range_pct = 1.5;
        config.venue.asset = String::new();
        config.scheduler.recalc_every_n_trades = 0;

        let report = validate_config(&config);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| matches!(e, ValidationError::InvalidUrl { field, .. } if field == "venue.ws_url")));
        assert!(report.errors.iter().any(|e| matches!(e, ValidationError::InvalidUrlScheme { field, .. } if field == "venue.rest_url")));
        assert!(report.errors.contains(&ValidationError::InvalidFlipRange(1.5)));
        assert!(report.errors.contains(&ValidationError::MissingAsset));
        assert!(report.errors.contains(&ValidationError::InvalidPositiveInteger {
            field: "scheduler.recalc_every_n_trades".to_string(),
        }));
    }

    #[test]
    fn test_placeholders_and_missing_credentials_warn() {
        let mut config = HedgeConfig::default();
        config.venue.client_id = Some("${HEDGEIQ_UNSET_CLIENT}".to_string());
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "venue.client_id"));
        assert!(report.warnings.iter().any(|w| w.field == "venue.client_secret"));
    }

    #[test]
    fn test_redis_without_url_falls_back() {
        let mut config = valid_config();
        config.store.backend = "redis".to_string();
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "store.redis_url"));
        assert_eq!(report.defaults_applied[0].value, "memory");

        config.store.backend = "postgres".to_string();
        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::InvalidStoreBackend("postgres".to_string())));
    }
}
