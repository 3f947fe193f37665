//! JSON-RPC 2.0 message model for the venue's streaming API
//!
//! Outbound requests are built from typed params; inbound frames are
//! classified into the few shapes the client acts on.

use common::{TakerSide, Trade};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FeedResult;

pub const METHOD_AUTH: &str = "public/auth";
pub const METHOD_SUBSCRIBE: &str = "public/subscribe";
pub const METHOD_SET_HEARTBEAT: &str = "public/set_heartbeat";
pub const METHOD_TEST: &str = "public/test";

const TRADE_CHANNEL_PREFIX: &str = "trades.option";

/// Channel carrying every option trade on `asset`, e.g. `trades.option.BTC.raw`.
pub fn trade_channel(asset: &str) -> String {
    format!("{}.{}.raw", TRADE_CHANNEL_PREFIX, asset)
}

#[derive(Debug, Serialize)]
struct Request<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

fn encode<P: Serialize>(id: u64, method: &str, params: P) -> FeedResult<String> {
    Ok(serde_json::to_string(&Request {
        jsonrpc: "2.0",
        id,
        method,
        params,
    })?)
}

#[derive(Debug, Serialize)]
struct AuthParams<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Serialize)]
struct SubscribeParams<'a> {
    channels: &'a [String],
}

#[derive(Debug, Serialize)]
struct HeartbeatParams {
    interval: u64,
}

#[derive(Debug, Serialize)]
struct EmptyParams {}

pub fn auth_request(id: u64, client_id: &str, client_secret: &str) -> FeedResult<String> {
    encode(
        id,
        METHOD_AUTH,
        AuthParams {
            grant_type: "client_credentials",
            client_id,
            client_secret,
        },
    )
}

pub fn subscribe_request(id: u64, channels: &[String]) -> FeedResult<String> {
    encode(id, METHOD_SUBSCRIBE, SubscribeParams { channels })
}

pub fn set_heartbeat_request(id: u64, interval_secs: u64) -> FeedResult<String> {
    encode(
        id,
        METHOD_SET_HEARTBEAT,
        HeartbeatParams {
            interval: interval_secs,
        },
    )
}

/// No-op request used both as the heartbeat reply and as an idle probe.
pub fn test_request(id: u64) -> FeedResult<String> {
    encode(id, METHOD_TEST, EmptyParams {})
}

/// Error object of a rejected request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// An inbound frame, reduced to what the client acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Reply to one of our requests. Success iff the frame had a `result`.
    Response {
        id: u64,
        outcome: Result<Value, RpcError>,
    },
    /// Server liveness probe; must be answered with [`test_request`].
    HeartbeatProbe,
    /// Any other heartbeat frame.
    Heartbeat,
    /// Trade-channel notification. `dropped` counts records that were
    /// malformed or not options.
    Trades {
        channel: String,
        trades: Vec<Trade>,
        dropped: usize,
    },
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct RawTrade {
    instrument_name: String,
    amount: f64,
    direction: TakerSide,
    #[serde(default)]
    price: f64,
    #[serde(default)]
    iv: Option<f64>,
}

/// Classify one text frame. Frames that are not JSON are `Unrecognized`.
pub fn classify(text: &str) -> Inbound {
    let Ok(frame) = serde_json::from_str::<Value>(text) else {
        return Inbound::Unrecognized;
    };
    let Some(obj) = frame.as_object() else {
        return Inbound::Unrecognized;
    };

    match obj.get("method").and_then(Value::as_str) {
        Some("heartbeat") => {
            let kind = obj
                .get("params")
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            return if kind == Some("test_request") {
                Inbound::HeartbeatProbe
            } else {
                Inbound::Heartbeat
            };
        }
        Some("subscription") | None => {}
        Some(_) => return Inbound::Unrecognized,
    }

    if let Some(params) = obj.get("params") {
        if let Some(channel) = params.get("channel").and_then(Value::as_str) {
            if !channel.starts_with(TRADE_CHANNEL_PREFIX) {
                return Inbound::Unrecognized;
            }
            let records = params
                .get("data")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let (trades, dropped) = parse_trades(records);
            return Inbound::Trades {
                channel: channel.to_string(),
                trades,
                dropped,
            };
        }
    }

    if let Some(id) = obj.get("id").and_then(Value::as_u64) {
        if let Some(result) = obj.get("result") {
            return Inbound::Response {
                id,
                outcome: Ok(result.clone()),
            };
        }
        let error = obj
            .get("error")
            .cloned()
            .and_then(|e| serde_json::from_value::<RpcError>(e).ok())
            .unwrap_or(RpcError {
                code: 0,
                message: "response without result".to_string(),
            });
        return Inbound::Response {
            id,
            outcome: Err(error),
        };
    }

    Inbound::Unrecognized
}

/// Parse records one by one so a bad record never costs the whole batch.
fn parse_trades(records: &[Value]) -> (Vec<Trade>, usize) {
    let mut trades = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        let parsed = serde_json::from_value::<RawTrade>(record.clone())
            .ok()
            .and_then(|raw| {
                Trade::parse(
                    &raw.instrument_name,
                    raw.amount,
                    raw.direction,
                    raw.price,
                    raw.iv,
                )
            });
        match parsed {
            Some(trade) => trades.push(trade),
            None => dropped += 1,
        }
    }
    (trades, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::{OptionType, PositionKey};

    #[test]
    fn test_request_shapes() {
        let auth: Value = serde_json::from_str(&auth_request(7, "id", "secret").unwrap()).unwrap();
        assert_eq!(auth["jsonrpc"], "2.0");
        assert_eq!(auth["id"], 7);
        assert_eq!(auth["method"], "public/auth");
        assert_eq!(auth["params"]["grant_type"], "client_credentials");
        assert_eq!(auth["params"]["client_id"], "id");
        assert_eq!(auth["params"]["client_secret"], "secret");

        let channels = vec![trade_channel("BTC")];
        let sub: Value = serde_json::from_str(&subscribe_request(8, &channels).unwrap()).unwrap();
        assert_eq!(sub["params"]["channels"][0], "trades.option.BTC.raw");

        let hb: Value = serde_json::from_str(&set_heartbeat_request(9, 30).unwrap()).unwrap();
        assert_eq!(hb["method"], "public/set_heartbeat");
        assert_eq!(hb["params"]["interval"], 30);

        let test: Value = serde_json::from_str(&test_request(10).unwrap()).unwrap();
        assert_eq!(test["method"], "public/test");
        assert!(test["params"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_classify_heartbeats() {
        let probe = r#"{"jsonrpc":"2.0","method":"heartbeat","params":{"type":"test_request"}}"#;
        assert_eq!(classify(probe), Inbound::HeartbeatProbe);

        let beat = r#"{"jsonrpc":"2.0","method":"heartbeat","params":{"type":"heartbeat"}}"#;
        assert_eq!(classify(beat), Inbound::Heartbeat);
    }

    #[test]
    fn test_classify_responses() {
        let ok = r#"{"jsonrpc":"2.0","id":3,"result":["trades.option.BTC.raw"]}"#;
        assert_matches!(classify(ok), Inbound::Response { id: 3, outcome: Ok(_) });

        let err = r#"{"jsonrpc":"2.0","id":4,"error":{"code":13004,"message":"invalid_credentials"}}"#;
        assert_matches!(
            classify(err),
            Inbound::Response { id: 4, outcome: Err(RpcError { code: 13004, .. }) }
        );
    }

    #[test]
    fn test_classify_trades_drops_bad_records() {
        let frame = r#"{
            "jsonrpc":"2.0",
            "method":"subscription",
            "params":{
                "channel":"trades.option.BTC.raw",
                "data":[
                    {"instrument_name":"BTC-27DEC24-90000-C","amount":2.0,"direction":"sell","price":0.05,"iv":48.5},
                    {"instrument_name":"BTC-PERPETUAL","amount":10.0,"direction":"buy","price":87000.0},
                    {"instrument_name":"BTC-27DEC24-85000-P","direction":"buy"},
                    {"instrument_name":"BTC-27DEC24-85000-P","amount":0.5,"direction":"buy","price":0.01}
                ]
            }
        }"#;

        match classify(frame) {
            Inbound::Trades {
                channel,
                trades,
                dropped,
            } => {
                assert_eq!(channel, "trades.option.BTC.raw");
                assert_eq!(dropped, 2);
                assert_eq!(trades.len(), 2);
                assert_eq!(trades[0].key, PositionKey::new(90000, OptionType::Call));
                assert_eq!(trades[0].dealer_delta(), 2.0);
                assert_eq!(trades[0].iv, Some(48.5));
                assert_eq!(trades[1].key, PositionKey::new(85000, OptionType::Put));
                assert_eq!(trades[1].dealer_delta(), -0.5);
            }
            other => panic!("expected trades, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unrecognized() {
        assert_eq!(classify("not json"), Inbound::Unrecognized);
        assert_eq!(classify("[1,2,3]"), Inbound::Unrecognized);
        let other_channel =
            r#"{"method":"subscription","params":{"channel":"book.BTC-PERPETUAL.raw","data":{}}}"#;
        assert_eq!(classify(other_channel), Inbound::Unrecognized);
        assert_eq!(classify(r#"{"method":"public/hello"}"#), Inbound::Unrecognized);
    }
}
