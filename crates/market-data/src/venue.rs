//! Venue query client - trait and implementations
//!
//! The snapshot provider only needs three request-response calls: the
//! active option universe, per-instrument book summaries, and the index
//! price used as spot.

use async_trait::async_trait;
use common::OptionType;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::MarketDataError;
use crate::Result;

/// One entry of the option universe.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VenueInstrument {
    pub instrument_name: String,
    pub strike: f64,
    pub option_type: OptionType,
    /// Expiration as Unix milliseconds.
    pub expiration_timestamp: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Per-instrument market summary.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BookSummary {
    pub instrument_name: String,
    /// Mark implied volatility in percent.
    #[serde(default)]
    pub mark_iv: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
}

/// Client trait for the venue's query interface - protocol agnostic
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Active, non-expired option instruments for `currency`
    async fn list_instruments(&self, currency: &str) -> Result<Vec<VenueInstrument>>;

    /// Mark IV and open interest for every option on `currency`
    async fn book_summaries(&self, currency: &str) -> Result<Vec<BookSummary>>;

    /// Current value of the index named `index_name`
    async fn index_price(&self, index_name: &str) -> Result<f64>;
}

// ==================== HTTP Implementation ====================

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<EnvelopeError>,
}

impl<T> Envelope<T> {
    /// A venue error wins over any result; no result at all is an error too.
    fn into_result(self, method: &str) -> Result<T> {
        if let Some(err) = self.error {
            return Err(MarketDataError::Venue {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| MarketDataError::EmptyResponse(method.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct EnvelopeError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct IndexPrice {
    index_price: f64,
}

/// Deribit public REST client
#[derive(Clone)]
pub struct DeribitRestClient {
    http: Client,
    base_url: String,
}

impl DeribitRestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| MarketDataError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        let envelope: Envelope<T> = resp.json().await?;
        envelope.into_result(method)
    }
}

#[async_trait]
impl VenueClient for DeribitRestClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_instruments(&self, currency: &str) -> Result<Vec<VenueInstrument>> {
        let instruments: Vec<VenueInstrument> = self
            .call(
                "get_instruments",
                &[("currency", currency), ("kind", "option"), ("expired", "false")],
            )
            .await?;
        debug!(count = instruments.len(), "Option universe fetched");
        Ok(instruments)
    }

    #[instrument(skip(self), level = "debug")]
    async fn book_summaries(&self, currency: &str) -> Result<Vec<BookSummary>> {
        let summaries: Vec<BookSummary> = self
            .call(
                "get_book_summary_by_currency",
                &[("currency", currency), ("kind", "option")],
            )
            .await?;
        debug!(count = summaries.len(), "Book summaries fetched");
        Ok(summaries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn index_price(&self, index_name: &str) -> Result<f64> {
        let index: IndexPrice = self
            .call("get_index_price", &[("index_name", index_name)])
            .await?;
        debug!(index_price = index.index_price, "Index price fetched");
        Ok(index.index_price)
    }
}

// ==================== Static Implementation ====================

/// Fixed-response venue client for tests and offline runs
#[derive(Debug, Default)]
pub struct StaticVenueClient {
    instruments: Vec<VenueInstrument>,
    summaries: Vec<BookSummary>,
    index_price: f64,
    failing: std::sync::atomic::AtomicBool,
}

impl StaticVenueClient {
    pub fn new(index_price: f64) -> Self {
        Self {
            index_price,
            ..Self::default()
        }
    }

    /// Add an instrument, optionally with a book summary
    pub fn with_instrument(
        mut self,
        instrument: VenueInstrument,
        mark_iv: Option<f64>,
        open_interest: Option<f64>,
    ) -> Self {
        if mark_iv.is_some() || open_interest.is_some() {
            self.summaries.push(BookSummary {
                instrument_name: instrument.instrument_name.clone(),
                mark_iv,
                open_interest,
            });
        }
        self.instruments.push(instrument);
        self
    }

    /// Make every subsequent call fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing
            .store(failing, std::sync::atomic::Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MarketDataError::EmptyResponse("static venue".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VenueClient for StaticVenueClient {
    async fn list_instruments(&self, _currency: &str) -> Result<Vec<VenueInstrument>> {
        self.check()?;
        Ok(self.instruments.clone())
    }

    async fn book_summaries(&self, _currency: &str) -> Result<Vec<BookSummary>> {
        self.check()?;
        Ok(self.summaries.clone())
    }

    async fn index_price(&self, _index_name: &str) -> Result<f64> {
        self.check()?;
        Ok(self.index_price)
    }
}

#[async_trait]
impl<V: VenueClient + ?Sized> VenueClient for std::sync::Arc<V> {
    async fn list_instruments(&self, currency: &str) -> Result<Vec<VenueInstrument>> {
        (**self).list_instruments(currency).await
    }

    async fn book_summaries(&self, currency: &str) -> Result<Vec<BookSummary>> {
        (**self).book_summaries(currency).await
    }

    async fn index_price(&self, index_name: &str) -> Result<f64> {
        (**self).index_price(index_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_instruments_envelope() {
        let raw = r#"{
            "jsonrpc": "2.0",
            "result": [
                {"instrument_name": "BTC-27DEC24-90000-C", "strike": 90000.0, "option_type": "call",
                 "expiration_timestamp": 1735286400000, "is_active": true, "kind": "option"},
                {"instrument_name": "BTC-27DEC24-85000-P", "strike": 85000.0, "option_type": "put",
                 "expiration_timestamp": 1735286400000}
            ]
        }"#;
        let envelope: Envelope<Vec<VenueInstrument>> = serde_json::from_str(raw).unwrap();
        let instruments = envelope.result.unwrap();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].option_type, OptionType::Call);
        assert!(instruments[1].is_active);
    }

    #[test]
    fn test_parse_error_envelope() {
        let raw = r#"{"jsonrpc": "2.0", "error": {"code": 10001, "message": "bad currency"}}"#;
        let envelope: Envelope<Vec<BookSummary>> = serde_json::from_str(raw).unwrap();
        assert!(envelope.result.is_none());
        assert_eq!(envelope.error.unwrap().code, 10001);
    }

    #[test]
    fn test_parse_summary_with_null_iv() {
        let raw = r#"{"result": [{"instrument_name": "BTC-27DEC24-90000-C", "mark_iv": null, "open_interest": 12.5}]}"#;
        let envelope: Envelope<Vec<BookSummary>> = serde_json::from_str(raw).unwrap();
        let summary = &envelope.result.unwrap()[0];
        assert_eq!(summary.mark_iv, None);
        assert_eq!(summary.open_interest, Some(12.5));
    }

    fn decode<T: DeserializeOwned>(raw: &str, method: &str) -> Result<T> {
        serde_json::from_str::<Envelope<T>>(raw)
            .unwrap()
            .into_result(method)
    }

    #[test]
    fn test_envelope_into_result() {
        let index: IndexPrice =
            decode(r#"{"jsonrpc":"2.0","result":{"index_price":87800.0}}"#, "get_index_price").unwrap();
        assert_eq!(index.index_price, 87800.0);

        let err = decode::<IndexPrice>(
            r#"{"jsonrpc":"2.0","error":{"code":10001,"message":"bad index"}}"#,
            "get_index_price",
        )
        .unwrap_err();
        assert!(matches!(err, MarketDataError::Venue { code: 10001, ref message } if message == "bad index"));

        let err = decode::<IndexPrice>("{}", "get_index_price").unwrap_err();
        assert!(matches!(err, MarketDataError::EmptyResponse(ref m) if m == "get_index_price"));
    }

    #[tokio::test]
    async fn test_static_client_failure_toggle() {
        let venue = StaticVenueClient::new(87800.0);
        assert_eq!(venue.index_price("btc_usd").await.unwrap(), 87800.0);
        venue.set_failing(true);
        assert!(venue.index_price("btc_usd").await.is_err());
    }
}
