//! Flow-based gamma exposure calculation
//!
//! Exposure per 1% spot move at a strike is
//! `gamma * dealer_position * spot^2 * 0.01`, weighted by
//! `1 / sqrt(days_to_expiry)` so near-dated gamma dominates. A positive
//! value means dealers are long gamma there and hedge against the move.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{
    DealerPositions, ExposureContribution, GexResult, Instrument, InstrumentSnapshot, PositionKey,
    StrikeExposure,
};
use market_data::black_scholes::{gamma, iv_to_decimal, years_from_days, BSInputs};

/// Scale from per-unit gamma exposure to exposure per 1% spot move.
const ONE_PERCENT: f64 = 0.01;
const HOURS_PER_DAY: f64 = 24.0;

/// Tunables of the exposure calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub risk_free_rate: f64,
    /// Instruments this close to expiry (or past it) are ignored.
    pub min_hours_to_expiry: f64,
    /// Flip search window, as a fraction of spot on either side.
    pub flip_range_pct: f64,
    /// Positions smaller than this in absolute size are ignored.
    pub min_position: f64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self::from(&config::EngineConfig::default())
    }
}

impl From<&config::EngineConfig> for EngineParams {
    fn from(config: &config::EngineConfig) -> Self {
        Self {
            risk_free_rate: config.risk_free_rate,
            min_hours_to_expiry: config.min_hours_to_expiry,
            flip_range_pct: config.flip_range_pct,
            min_position: config.min_position,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GexEngine {
    params: EngineParams,
}

impl GexEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Compute exposure from a full snapshot, using its spot and fetch time.
    pub fn calculate_snapshot(
        &self,
        positions: &DealerPositions,
        snapshot: &InstrumentSnapshot,
        as_of: DateTime<Utc>,
    ) -> GexResult {
        let mut result = self.calculate(positions, &snapshot.instruments, snapshot.spot, as_of);
        result.snapshot_at = Some(snapshot.fetched_at);
        result
    }

    /// Compute the exposure profile.
    ///
    /// `as_of` is both the reference time for days-to-expiry and the result
    /// timestamp. Returns the sentinel result when spot is unusable, no
    /// instrument survives the expiry filter, or no retained instrument
    /// carries a meaningful dealer position.
    pub fn calculate(
        &self,
        positions: &DealerPositions,
        instruments: &[Instrument],
        spot: f64,
        as_of: DateTime<Utc>,
    ) -> GexResult {
        if !(spot.is_finite() && spot > 0.0) {
            return GexResult::empty(spot, None, as_of);
        }

        let nearest = self.nearest_expiries(instruments, as_of);
        if nearest.is_empty() {
            return GexResult::empty(spot, None, as_of);
        }

        let contributions: Vec<ExposureContribution> = nearest
            .into_iter()
            .filter_map(|(key, (instrument, days))| {
                self.contribution(positions.get(&key), instrument, days, spot)
            })
            .collect();
        if contributions.is_empty() {
            return GexResult::empty(spot, None, as_of);
        }

        let gex_by_strike = aggregate_by_strike(&contributions);
        let net_gex = gex_by_strike.iter().map(|s| s.gex).sum();
        let (max_support, max_resistance) = extremes(&gex_by_strike);
        let flip_level = find_flip_level(&gex_by_strike, spot, self.params.flip_range_pct);

        GexResult {
            net_gex,
            flip_level,
            max_support,
            max_resistance,
            gex_by_strike,
            contributions,
            spot_price: spot,
            snapshot_at: None,
            timestamp: as_of,
        }
    }

    /// Per (strike, type), the live instrument with the fewest days left.
    fn nearest_expiries<'a>(
        &self,
        instruments: &'a [Instrument],
        as_of: DateTime<Utc>,
    ) -> BTreeMap<PositionKey, (&'a Instrument, f64)> {
        let min_days = (self.params.min_hours_to_expiry / HOURS_PER_DAY).max(0.0);
        let mut nearest: BTreeMap<PositionKey, (&Instrument, f64)> = BTreeMap::new();

        for instrument in instruments {
            let days = instrument.days_to_expiry(as_of);
            if !(days > min_days && days > 0.0) {
                continue;
            }
            match nearest.entry(instrument.position_key()) {
                Entry::Vacant(slot) => {
                    slot.insert((instrument, days));
                }
                Entry::Occupied(mut slot) => {
                    if days < slot.get().1 {
                        slot.insert((instrument, days));
                    }
                }
            }
        }
        nearest
    }

    fn contribution(
        &self,
        position: f64,
        instrument: &Instrument,
        days: f64,
        spot: f64,
    ) -> Option<ExposureContribution> {
        if position.abs() < self.params.min_position {
            return None;
        }
        let vol = iv_to_decimal(instrument.mark_iv);
        if !(vol > 0.0) {
            return None;
        }

        let gamma = gamma(&BSInputs {
            spot,
            strike: instrument.strike as f64,
            time: years_from_days(days),
            vol,
            rate: self.params.risk_free_rate,
        });
        let gex_raw = gamma * position * spot * spot * ONE_PERCENT;
        let time_weight = 1.0 / days.sqrt();

        Some(ExposureContribution {
            strike: instrument.strike,
            option_type: instrument.option_type,
            position,
            gamma,
            gex_raw,
            gex: gex_raw * time_weight,
            time_weight,
            days_to_expiry: days,
            iv: instrument.mark_iv,
        })
    }
}

fn aggregate_by_strike(contributions: &[ExposureContribution]) -> Vec<StrikeExposure> {
    let mut by_strike: BTreeMap<i64, StrikeExposure> = BTreeMap::new();
    for c in contributions {
        let row = by_strike.entry(c.strike).or_insert(StrikeExposure {
            strike: c.strike,
            gex: 0.0,
            gex_raw: 0.0,
            dealer_position: 0.0,
        });
        row.gex += c.gex;
        row.gex_raw += c.gex_raw;
        row.dealer_position += c.position;
    }
    by_strike.into_values().collect()
}

/// Most positive and most negative strikes, `(0, 0.0)` when absent.
fn extremes(exposures: &[StrikeExposure]) -> ((i64, f64), (i64, f64)) {
    let mut support = (0, 0.0);
    let mut resistance = (0, 0.0);
    for row in exposures {
        if row.gex > support.1 {
            support = (row.strike, row.gex);
        }
        if row.gex < resistance.1 {
            resistance = (row.strike, row.gex);
        }
    }
    (support, resistance)
}

/// Interpolated strike where aggregate exposure first changes sign.
///
/// Only strikes within `spot * (1 ± range_pct)` are scanned, in ascending
/// order. A zero aggregate is neither side of a crossing. Returns `None`
/// when no sign change is found in range.
pub fn find_flip_level(exposures: &[StrikeExposure], spot: f64, range_pct: f64) -> Option<f64> {
    let low = spot * (1.0 - range_pct);
    let high = spot * (1.0 + range_pct);

    let mut in_range: Vec<(f64, f64)> = exposures
        .iter()
        .map(|row| (row.strike as f64, row.gex))
        .filter(|(strike, _)| *strike >= low && *strike <= high)
        .collect();
    in_range.sort_by(|a, b| a.0.total_cmp(&b.0));

    in_range.windows(2).find_map(|pair| {
        let (strike_a, gex_a) = pair[0];
        let (strike_b, gex_b) = pair[1];
        let crosses = (gex_a > 0.0 && gex_b < 0.0) || (gex_a < 0.0 && gex_b > 0.0);
        crosses.then(|| strike_a + gex_a.abs() / (gex_a.abs() + gex_b.abs()) * (strike_b - strike_a))
    })
}
