//! Gamma exposure result records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::OptionType;

/// Aggregate exposure at one strike, calls and puts combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeExposure {
    pub strike: i64,
    /// Time-weighted exposure.
    pub gex: f64,
    /// Unweighted exposure.
    pub gex_raw: f64,
    /// Net dealer position (call + put).
    pub dealer_position: f64,
}

/// Exposure contributed by a single retained instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureContribution {
    pub strike: i64,
    pub option_type: OptionType,
    pub position: f64,
    pub gamma: f64,
    pub gex_raw: f64,
    pub gex: f64,
    pub time_weight: f64,
    pub days_to_expiry: f64,
    /// Implied volatility exactly as it appeared in the snapshot.
    pub iv: f64,
}

/// Whether dealer hedging dampens or amplifies spot moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GammaRegime {
    /// Dealers net long gamma: they sell rallies and buy dips.
    Stabilizing,
    /// Dealers net short gamma: they chase the move.
    Amplifying,
    /// No exposure computed.
    Neutral,
}

impl GammaRegime {
    pub fn label(&self) -> &'static str {
        match self {
            GammaRegime::Stabilizing => "positive gamma (stabilizing)",
            GammaRegime::Amplifying => "negative gamma (amplifying)",
            GammaRegime::Neutral => "neutral",
        }
    }
}

/// One computed gamma exposure profile.
///
/// `max_support` and `max_resistance` hold `(0, 0.0)` when no strike has
/// positive (respectively negative) exposure. Check [`GexResult::is_empty`]
/// before reading the aggregate fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GexResult {
    pub net_gex: f64,
    pub flip_level: Option<f64>,
    pub max_support: (i64, f64),
    pub max_resistance: (i64, f64),
    /// Per-strike breakdown in ascending strike order.
    pub gex_by_strike: Vec<StrikeExposure>,
    #[serde(default)]
    pub contributions: Vec<ExposureContribution>,
    pub spot_price: f64,
    /// Fetch time of the instrument snapshot used.
    pub snapshot_at: Option<DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

impl GexResult {
    /// The sentinel result returned when there is nothing to aggregate.
    pub fn empty(spot_price: f64, snapshot_at: Option<DateTime<Utc>>, timestamp: DateTime<Utc>) -> Self {
        Self {
            net_gex: 0.0,
            flip_level: None,
            max_support: (0, 0.0),
            max_resistance: (0, 0.0),
            gex_by_strike: Vec::new(),
            contributions: Vec::new(),
            spot_price,
            snapshot_at,
            timestamp,
        }
    }

    /// True for the sentinel result.
    pub fn is_empty(&self) -> bool {
        self.gex_by_strike.is_empty()
    }

    pub fn regime(&self) -> GammaRegime {
        if self.is_empty() || self.net_gex == 0.0 {
            GammaRegime::Neutral
        } else if self.net_gex > 0.0 {
            GammaRegime::Stabilizing
        } else {
            GammaRegime::Amplifying
        }
    }

    /// Serialize for the `gex:current` record.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_is_sentinel() {
        let now = Utc::now();
        let result = GexResult::empty(87800.0, None, now);
        assert!(result.is_empty());
        assert_eq!(result.net_gex, 0.0);
        assert_eq!(result.flip_level, None);
        assert_eq!(result.max_support, (0, 0.0));
        assert_eq!(result.max_resistance, (0, 0.0));
        assert_eq!(result.regime(), GammaRegime::Neutral);
    }

    #[test]
    fn test_json_preserves_flip() {
        let now = Utc::now();
        let mut result = GexResult::empty(87800.0, Some(now), now);
        result.net_gex = -1200.5;
        result.flip_level = Some(90666.67);
        result.gex_by_strike.push(StrikeExposure {
            strike: 90000,
            gex: -1200.5,
            gex_raw: -1200.5,
            dealer_position: -3.0,
        });

        let decoded = GexResult::from_json(&result.to_json().unwrap()).unwrap();
        assert_eq!(decoded, result);
        assert_eq!(decoded.regime(), GammaRegime::Amplifying);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(GexResult::from_json("{not json").is_err());
    }
}
