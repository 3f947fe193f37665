//! Observability infrastructure for HedgeIQ
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Metric handles for the trade feed and the exposure engine
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! init_logging("hedgeiq", LogFormat::Pretty)?;
//!
//! // Optional; handles are no-ops until a recorder is installed
//! observability::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, ExposureMetrics, FeedMetrics};
