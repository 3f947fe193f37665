//! Gamma exposure engine for HedgeIQ
//!
//! - [`engine`] - Pure (inventory, instruments, spot) to [`common::GexResult`] calculation
//! - [`scheduler`] - Trade-count / elapsed-time recalculation trigger
//! - [`report`] - Human-readable rendering of a result
//!
//! # Key Invariants
//!
//! - `calculate` has no hidden state: identical inputs give identical outputs
//! - Insufficient input yields the sentinel result, never an error
//! - Only the nearest expiry per (strike, type) contributes

pub mod engine;
pub mod report;
pub mod scheduler;

pub use engine::{find_flip_level, EngineParams, GexEngine};
pub use report::render_report;
pub use scheduler::RecalcScheduler;
