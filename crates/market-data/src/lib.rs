//! Market data inputs for HedgeIQ
//!
//! # Core Components
//!
//! - [`black_scholes`] - Gamma kernel shared by every exposure calculation
//! - [`venue`] - Query client for the option universe, summaries and index price
//! - [`snapshot`] - Refreshable instrument snapshot cache
//!
//! # Key Invariants
//!
//! - Implied volatility is a decimal fraction everywhere past the venue client
//! - A failed refresh never discards a usable snapshot

pub mod black_scholes;
pub mod error;
pub mod snapshot;
pub mod venue;

pub use error::MarketDataError;
pub use snapshot::{InstrumentSnapshotProvider, RefreshOutcome, SnapshotSettings};
pub use venue::{BookSummary, DeribitRestClient, StaticVenueClient, VenueClient, VenueInstrument};

pub type Result<T> = std::result::Result<T, MarketDataError>;
