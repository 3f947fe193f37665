//! Core domain types shared across HedgeIQ
//!
//! - `OptionType`: Call or Put
//! - `TakerSide`: which side the price-taking counterparty traded
//! - `PositionKey`: the (strike, option type) pair dealer inventory is keyed by
//! - `InstrumentName`: the venue's `ASSET-DDMMMYY-STRIKE-C|P` grammar

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::Error;

/// Type of option: Call or Put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option - right to buy at strike price.
    Call,
    /// Put option - right to sell at strike price.
    Put,
}

impl OptionType {
    /// Get the short code used in instrument names.
    pub fn code(&self) -> &'static str {
        match self {
            OptionType::Call => "C",
            OptionType::Put => "P",
        }
    }

    /// Lowercase name used in store fields and venue payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        }
    }

    /// Parse the lowercase name used in store fields and venue payloads.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "call" => Some(OptionType::Call),
            "put" => Some(OptionType::Put),
            _ => None,
        }
    }

    /// Parse the short code used in instrument names.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "C" => Some(OptionType::Call),
            "P" => Some(OptionType::Put),
            _ => None,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the price-taking counterparty in a trade.
///
/// The dealer is assumed to sit on the opposite side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakerSide {
    /// Taker bought, dealer sold.
    Buy,
    /// Taker sold, dealer bought.
    Sell,
}

impl TakerSide {
    /// Signed change to the dealer's position for a trade of `amount` contracts.
    ///
    /// Taker buys push the dealer shorter, taker sells push the dealer longer.
    pub fn dealer_delta(&self, amount: f64) -> f64 {
        match self {
            TakerSide::Buy => -amount,
            TakerSide::Sell => amount,
        }
    }
}

impl fmt::Display for TakerSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TakerSide::Buy => f.write_str("buy"),
            TakerSide::Sell => f.write_str("sell"),
        }
    }
}

/// Key of a dealer position: integer strike plus option type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PositionKey {
    /// Strike in whole units of the quote currency.
    pub strike: i64,
    /// Call or put.
    pub option_type: OptionType,
}

impl PositionKey {
    pub fn new(strike: i64, option_type: OptionType) -> Self {
        Self { strike, option_type }
    }

    /// Store field representation, e.g. `90000:call`.
    pub fn field(&self) -> String {
        format!("{}:{}", self.strike, self.option_type)
    }

    /// Parse a store field written by [`PositionKey::field`].
    pub fn from_field(field: &str) -> Option<Self> {
        let (strike, option_type) = field.split_once(':')?;
        let strike = strike.parse::<i64>().ok()?;
        let option_type = OptionType::from_name(option_type)?;
        Some(Self { strike, option_type })
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.strike, self.option_type)
    }
}

/// A parsed option instrument name such as `BTC-27DEC24-85000-P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentName {
    /// Underlying asset, e.g. `BTC`.
    pub underlying: String,
    /// Expiry label as printed by the venue, e.g. `27DEC24`.
    pub expiry: String,
    /// Integer strike.
    pub strike: i64,
    /// Call or put.
    pub option_type: OptionType,
}

impl InstrumentName {
    /// Parse a venue instrument name.
    ///
    /// Returns `None` for futures, perpetuals, combos and anything else that
    /// does not match `ASSET-DDMMMYY-STRIKE-C|P` exactly.
    pub fn parse(name: &str) -> Option<Self> {
        let caps = instrument_pattern()?.captures(name)?;
        let strike = caps[3].parse::<i64>().ok()?;
        let option_type = OptionType::from_code(&caps[4])?;

        Some(Self {
            underlying: caps[1].to_string(),
            expiry: caps[2].to_string(),
            strike,
            option_type,
        })
    }

    /// The position this instrument's trades are booked against.
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.strike, self.option_type)
    }
}

impl FromStr for InstrumentName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::parse(format!("not an option instrument: {}", s)))
    }
}

impl fmt::Display for InstrumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.underlying,
            self.expiry,
            self.strike,
            self.option_type.code()
        )
    }
}

/// Asset, `D{1,2}MMMYY` expiry, integer strike and a one-letter type code.
const INSTRUMENT_PATTERN: &str = r"^([A-Z]+)-(\d{1,2}[A-Z]{3}\d{2})-(\d+)-([CP])$";

fn instrument_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(INSTRUMENT_PATTERN).ok()).as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_put_instrument() {
        let parsed = InstrumentName::parse("BTC-27DEC24-85000-P").unwrap();
        assert_eq!(parsed.underlying, "BTC");
        assert_eq!(parsed.expiry, "27DEC24");
        assert_eq!(parsed.strike, 85000);
        assert_eq!(parsed.option_type, OptionType::Put);
        assert_eq!(parsed.to_string(), "BTC-27DEC24-85000-P");
    }

    #[test]
    fn test_parse_single_digit_day() {
        let parsed = InstrumentName::parse("ETH-5JAN25-3200-C").unwrap();
        assert_eq!(parsed.strike, 3200);
        assert_eq!(parsed.option_type, OptionType::Call);
    }

    #[test]
    fn test_reject_non_options() {
        assert!(InstrumentName::parse("BTC-PERPETUAL").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24-85000-X").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24-85000-P-extra").is_none());
        assert!(InstrumentName::parse("btc-27DEC24-85000-P").is_none());
        assert!(InstrumentName::parse("BTC-27DEC2024-85000-P").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24-85k-P").is_none());
        assert!(InstrumentName::parse("").is_none());
        assert!("BTC-PERPETUAL".parse::<InstrumentName>().is_err());
    }

    #[test]
    fn test_instrument_pattern_bounds() {
        assert!(instrument_pattern().is_some());
        assert!(InstrumentName::parse("BTC-127DEC24-85000-P").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24-85000-P\n").is_none());
        assert!(InstrumentName::parse("BTC-27DEC24-99999999999999999999-C").is_none());
        assert!(InstrumentName::parse("BTC-1MAR26-0-C").is_some());
    }

    #[test]
    fn test_position_key_field_roundtrip() {
        let key = PositionKey::new(90000, OptionType::Call);
        assert_eq!(key.field(), "90000:call");
        assert_eq!(PositionKey::from_field("90000:call"), Some(key));
        assert_eq!(PositionKey::from_field("90000"), None);
        assert_eq!(PositionKey::from_field("abc:put"), None);
        assert_eq!(PositionKey::from_field("90000:straddle"), None);
    }

    #[test]
    fn test_dealer_delta_sign() {
        assert_eq!(TakerSide::Buy.dealer_delta(2.5), -2.5);
        assert_eq!(TakerSide::Sell.dealer_delta(2.5), 2.5);
    }

    #[test]
    fn test_taker_side_deserialize() {
        let side: TakerSide = serde_json::from_str("\"buy\"").unwrap();
        assert_eq!(side, TakerSide::Buy);
        assert!(serde_json::from_str::<TakerSide>("\"hold\"").is_err());
    }
}
