//! Market inputs consumed by the exposure pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InstrumentName, OptionType, PositionKey, TakerSide};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// One tradable option contract as of the last universe refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Venue instrument name, e.g. `BTC-27DEC24-85000-P`.
    pub name: String,
    pub strike: i64,
    pub option_type: OptionType,
    pub expiration: DateTime<Utc>,
    /// Implied volatility as a decimal fraction (0.5 == 50%).
    pub mark_iv: f64,
    pub open_interest: f64,
}

impl Instrument {
    /// Fractional days between `as_of` and expiration. Negative once expired.
    pub fn days_to_expiry(&self, as_of: DateTime<Utc>) -> f64 {
        let millis = (self.expiration - as_of).num_milliseconds() as f64;
        millis / 1000.0 / SECONDS_PER_DAY
    }

    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.strike, self.option_type)
    }
}

/// The option universe and spot price captured by one refresh.
///
/// Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSnapshot {
    pub instruments: Vec<Instrument>,
    pub spot: f64,
    pub fetched_at: DateTime<Utc>,
}

impl InstrumentSnapshot {
    pub fn new(instruments: Vec<Instrument>, spot: f64, fetched_at: DateTime<Utc>) -> Self {
        Self {
            instruments,
            spot,
            fetched_at,
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// A trade execution parsed from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub instrument_name: String,
    pub key: PositionKey,
    /// Contracts traded, signed as received from the feed.
    pub amount: f64,
    pub side: TakerSide,
    pub price: f64,
    /// Implied volatility at execution, as reported by the venue.
    pub iv: Option<f64>,
}

impl Trade {
    /// Build a trade from raw feed fields.
    ///
    /// Returns `None` when the instrument name is not an option, so callers
    /// can drop it silently.
    pub fn parse(
        instrument_name: &str,
        amount: f64,
        side: TakerSide,
        price: f64,
        iv: Option<f64>,
    ) -> Option<Self> {
        let parsed = InstrumentName::parse(instrument_name)?;
        if !amount.is_finite() {
            return None;
        }
        Some(Self {
            instrument_name: instrument_name.to_string(),
            key: parsed.position_key(),
            amount,
            side,
            price,
            iv,
        })
    }

    /// Signed change this trade applies to the dealer position.
    pub fn dealer_delta(&self) -> f64 {
        self.side.dealer_delta(self.amount)
    }
}
