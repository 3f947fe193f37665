//! Common types and utilities for HedgeIQ
//!
//! This crate provides the domain vocabulary shared by the feed, the state
//! store and the exposure engine.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Option type, taker side, position key, instrument-name grammar
//! - [`market`] - Instrument snapshots and parsed trades
//! - [`positions`] - Dealer position map
//! - [`exposure`] - Gamma exposure result records

pub mod error;
pub mod exposure;
pub mod market;
pub mod positions;
pub mod types;

pub use error::{Error, Result};
pub use exposure::{ExposureContribution, GammaRegime, GexResult, StrikeExposure};
pub use market::{Instrument, InstrumentSnapshot, Trade};
pub use positions::DealerPositions;
pub use types::*;
