//! Dealer position map
//!
//! Positions are read with get-or-zero semantics and only ever changed by
//! adding a delta. Reading a missing key never creates it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{OptionType, PositionKey};

/// Signed dealer positions keyed by (strike, option type).
///
/// Positive values mean the dealer is net long.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealerPositions {
    positions: BTreeMap<PositionKey, f64>,
}

impl DealerPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position at `key`, or zero when nothing was ever applied there.
    pub fn get(&self, key: &PositionKey) -> f64 {
        self.positions.get(key).copied().unwrap_or(0.0)
    }

    /// Position at `(strike, option_type)`, or zero.
    pub fn get_at(&self, strike: i64, option_type: OptionType) -> f64 {
        self.get(&PositionKey::new(strike, option_type))
    }

    /// Add `delta` to the position at `key` and return the new value.
    pub fn apply(&mut self, key: PositionKey, delta: f64) -> f64 {
        let entry = self.positions.entry(key).or_insert(0.0);
        *entry += delta;
        *entry
    }

    /// Iterate positions in (strike, option type) order.
    pub fn iter(&self) -> impl Iterator<Item = (&PositionKey, f64)> {
        self.positions.iter().map(|(key, value)| (key, *value))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of distinct strikes holding any position entry.
    pub fn strikes_tracked(&self) -> usize {
        let mut strikes: Vec<i64> = self.positions.keys().map(|k| k.strike).collect();
        strikes.dedup();
        strikes.len()
    }

    /// Sum of absolute call and put positions across all strikes.
    pub fn total_abs_position(&self) -> f64 {
        self.positions.values().map(|v| v.abs()).sum()
    }

    /// The `n` largest positions by absolute size.
    pub fn largest(&self, n: usize) -> Vec<(PositionKey, f64)> {
        let mut entries: Vec<(PositionKey, f64)> =
            self.positions.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        entries.truncate(n);
        entries
    }
}

impl FromIterator<(PositionKey, f64)> for DealerPositions {
    /// Collects by applying each pair as a delta, so repeated keys sum.
    fn from_iter<I: IntoIterator<Item = (PositionKey, f64)>>(iter: I) -> Self {
        let mut positions = DealerPositions::new();
        for (key, delta) in iter {
            positions.apply(key, delta);
        }
        positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_zero_does_not_insert() {
        let positions = DealerPositions::new();
        assert_eq!(positions.get_at(90000, OptionType::Call), 0.0);
        assert!(positions.is_empty());
    }

    #[test]
    fn test_apply_accumulates() {
        let mut positions = DealerPositions::new();
        let key = PositionKey::new(90000, OptionType::Call);
        assert_eq!(positions.apply(key, -2.0), -2.0);
        assert_eq!(positions.apply(key, 5.5), 3.5);
        assert_eq!(positions.get(&key), 3.5);
        assert_eq!(positions.len(), 1);
    }

    #[test]
    fn test_stats_helpers() {
        let positions: DealerPositions = vec![
            (PositionKey::new(90000, OptionType::Call), 10.0),
            (PositionKey::new(90000, OptionType::Put), -4.0),
            (PositionKey::new(95000, OptionType::Call), -20.0),
            (PositionKey::new(95000, OptionType::Call), 5.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(positions.len(), 3);
        assert_eq!(positions.strikes_tracked(), 2);
        assert_eq!(positions.total_abs_position(), 29.0);

        let largest = positions.largest(2);
        assert_eq!(largest[0], (PositionKey::new(95000, OptionType::Call), -15.0));
        assert_eq!(largest[1], (PositionKey::new(90000, OptionType::Call), 10.0));
    }
}
