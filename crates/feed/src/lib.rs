//! Trade feed for HedgeIQ
//!
//! Streams option trades from the venue, books each one against the dealer
//! inventory and keeps the published exposure result fresh.
//!
//! # Layout
//!
//! - [`protocol`] - JSON-RPC request builders and inbound frame classification
//! - [`transport`] - connection abstraction, WebSocket and scripted transports
//! - [`client`] - connection state machine with fixed-delay reconnects
//! - [`processor`] - inventory updates, snapshot refresh and recalculation

pub mod client;
pub mod error;
pub mod processor;
pub mod protocol;
pub mod transport;

pub use client::{
    ConnectionState, FeedClient, FeedHandler, FeedSettings, PollReason, SessionOutcome,
    SessionStats,
};
pub use error::{FeedError, FeedResult};
pub use processor::{FlowProcessor, ProcessorParts};
pub use transport::{
    Connector, FeedTransport, ScriptedConnector, SessionEnd, SessionScript, WsConnector,
};
