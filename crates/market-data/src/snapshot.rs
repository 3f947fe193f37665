//! Instrument Snapshot Provider
//!
//! A refreshable cache of the option universe and spot price. A failed
//! refresh leaves the previous snapshot in place.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use common::{Instrument, InstrumentSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::MarketDataError;
use crate::venue::{BookSummary, VenueClient};
use crate::Result;

/// How the provider talks to the venue and filters what it gets back.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSettings {
    /// Currency the universe is requested for, e.g. `BTC`.
    pub asset: String,
    /// Index used as spot, e.g. `btc_usd`.
    pub index_name: String,
    pub refresh_interval: Duration,
    /// Expiries further out than this are dropped.
    pub max_days_to_expiry: f64,
    /// Percent IV for instruments without a usable summary.
    pub default_mark_iv: f64,
}

impl SnapshotSettings {
    pub fn from_config(venue: &config::VenueConfig, snapshot: &config::SnapshotConfig) -> Self {
        Self {
            asset: venue.asset.clone(),
            index_name: venue.index_name.clone(),
            refresh_interval: snapshot.refresh_interval(),
            max_days_to_expiry: snapshot.max_days_to_expiry,
            default_mark_iv: snapshot.default_mark_iv,
        }
    }
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self::from_config(&config::VenueConfig::default(), &config::SnapshotConfig::default())
    }
}

/// What a call to [`InstrumentSnapshotProvider::refresh_if_due`] did.
#[derive(Debug)]
pub enum RefreshOutcome {
    NotDue,
    Refreshed,
    /// The previous snapshot, if any, is still current.
    Failed(MarketDataError),
}

pub struct InstrumentSnapshotProvider<V> {
    venue: V,
    settings: SnapshotSettings,
    current: Option<Arc<InstrumentSnapshot>>,
    last_attempt: Option<DateTime<Utc>>,
}

impl<V: VenueClient> InstrumentSnapshotProvider<V> {
    pub fn new(venue: V, settings: SnapshotSettings) -> Self {
        Self {
            venue,
            settings,
            current: None,
            last_attempt: None,
        }
    }

    /// The snapshot in use, if one was ever fetched.
    pub fn current(&self) -> Option<Arc<InstrumentSnapshot>> {
        self.current.clone()
    }

    /// Due on first use and once per refresh interval after the last attempt.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => (now - last)
                .to_std()
                .map(|elapsed| elapsed >= self.settings.refresh_interval)
                .unwrap_or(false),
        }
    }

    pub async fn refresh_if_due(&mut self, now: DateTime<Utc>) -> RefreshOutcome {
        if !self.is_due(now) {
            return RefreshOutcome::NotDue;
        }
        match self.refresh(now).await {
            Ok(_) => RefreshOutcome::Refreshed,
            Err(e) => RefreshOutcome::Failed(e),
        }
    }

    /// Fetch and swap in a new snapshot.
    pub async fn refresh(&mut self, now: DateTime<Utc>) -> Result<Arc<InstrumentSnapshot>> {
        self.last_attempt = Some(now);
        match self.fetch(now).await {
            Ok(snapshot) => {
                info!(
                    instruments = snapshot.len(),
                    spot = snapshot.spot,
                    "Instrument snapshot refreshed"
                );
                let snapshot = Arc::new(snapshot);
                self.current = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    has_previous = self.current.is_some(),
                    "Instrument snapshot refresh failed, keeping previous snapshot"
                );
                Err(e)
            }
        }
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<InstrumentSnapshot> {
        let universe = self.venue.list_instruments(&self.settings.asset).await?;
        let summaries: HashMap<String, BookSummary> = self
            .venue
            .book_summaries(&self.settings.asset)
            .await?
            .into_iter()
            .map(|s| (s.instrument_name.clone(), s))
            .collect();
        let spot = self.venue.index_price(&self.settings.index_name).await?;

        if !(spot.is_finite() && spot > 0.0) {
            return Err(MarketDataError::InvalidData(format!(
                "index price for {} is {}",
                self.settings.index_name, spot
            )));
        }

        let horizon = now + days(self.settings.max_days_to_expiry);
        let mut instruments = Vec::with_capacity(universe.len());

        for entry in universe {
            if !entry.is_active {
                continue;
            }
            let Some(expiration) = Utc.timestamp_millis_opt(entry.expiration_timestamp).single() else {
                debug!(instrument = %entry.instrument_name, "Skipping instrument with invalid expiration");
                continue;
            };
            if expiration <= now || expiration > horizon {
                continue;
            }
            if !(entry.strike.is_finite() && entry.strike > 0.0) {
                continue;
            }

            let summary = summaries.get(&entry.instrument_name);
            let mark_iv_pct = summary
                .and_then(|s| s.mark_iv)
                .filter(|iv| iv.is_finite() && *iv > 0.0)
                .unwrap_or(self.settings.default_mark_iv);
            let open_interest = summary.and_then(|s| s.open_interest).unwrap_or(0.0);

            instruments.push(Instrument {
                name: entry.instrument_name,
                strike: entry.strike.round() as i64,
                option_type: entry.option_type,
                expiration,
                mark_iv: mark_iv_pct / 100.0,
                open_interest,
            });
        }

        Ok(InstrumentSnapshot::new(instruments, spot, now))
    }
}

fn days(n: f64) -> ChronoDuration {
    ChronoDuration::milliseconds((n * 86_400_000.0) as i64)
}
