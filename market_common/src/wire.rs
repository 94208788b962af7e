//! JSON messages exchanged over the `/ws` feed.
//!
//! Server → client frames carry a `type` discriminator, a `data` payload and a
//! millisecond timestamp:
//!
//! ```json
//! {"type": "price_update", "data": {"symbol": "TCS", "price": 3645.25, ...}, "timestamp": 1700000000000}
//! ```
//!
//! Client → server frames name an `event` and a list of symbols:
//!
//! ```json
//! {"event": "subscribe", "symbols": ["RELIANCE", "TCS"]}
//! ```
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::model::{InstrumentQuote, Snapshot};

/// Kind of a server frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Whole snapshot, sent on connect and in snapshot push mode.
    MarketData,
    /// Single instrument update for subscribers of that symbol.
    PriceUpdate,
}

/// Payload of a server frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    /// Complete generator output.
    Snapshot(Box<Snapshot>),
    /// One instrument.
    Quote(InstrumentQuote),
}

/// Frame pushed from the server to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    /// Frame discriminator.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Snapshot or single quote, depending on `kind`.
    pub data: MessagePayload,
    /// Send time in milliseconds since Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ServerMessage {
    /// Creates a `market_data` frame for a whole snapshot.
    pub fn market_data(snapshot: Snapshot, timestamp: i64) -> Self {
        ServerMessage {
            kind: MessageKind::MarketData,
            data: MessagePayload::Snapshot(Box::new(snapshot)),
            timestamp: Some(timestamp),
        }
    }

    /// Creates a `price_update` frame for one instrument.
    pub fn price_update(quote: InstrumentQuote, timestamp: i64) -> Self {
        ServerMessage {
            kind: MessageKind::PriceUpdate,
            data: MessagePayload::Quote(quote),
            timestamp: Some(timestamp),
        }
    }

    /// Symbol of a `price_update` frame, `None` for snapshots.
    pub fn symbol(&self) -> Option<&str> {
        match &self.data {
            MessagePayload::Quote(quote) => Some(&quote.symbol),
            MessagePayload::Snapshot(_) => None,
        }
    }

    /// Encode the frame to JSON text.
    pub fn to_json(&self) -> Result<String, MarketError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frame sent by a client to change its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Add symbols to the connection's topic set.
    Subscribe {
        /// Symbols to add.
        symbols: Vec<String>,
    },
    /// Remove symbols from the connection's topic set.
    Unsubscribe {
        /// Symbols to remove.
        symbols: Vec<String>,
    },
}

impl ClientMessage {
    /// Parse an inbound text frame.
    pub fn parse(text: &str) -> Result<Self, MarketError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the frame to JSON text.
    pub fn to_json(&self) -> Result<String, MarketError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Instrument;
    use crate::model::{Indices, InstrumentQuote};
    use std::collections::BTreeMap;

    fn quote(instrument: Instrument, price: f64) -> InstrumentQuote {
        InstrumentQuote::new(instrument, price, price, 7)
    }

    #[test]
    fn price_update_wire_shape() {
        let msg = ServerMessage::price_update(quote(Instrument::RELIANCE, 2735.6), 99);
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "price_update");
        assert_eq!(json["data"]["symbol"], "RELIANCE");
        assert_eq!(json["timestamp"], 99);
        assert_eq!(msg.symbol(), Some("RELIANCE"));
    }

    #[test]
    fn market_data_decodes_back_to_snapshot() {
        let mut quotes = BTreeMap::new();
        quotes.insert("TCS".to_string(), quote(Instrument::TCS, 3645.25));
        let snapshot = Snapshot {
            quotes,
            indices: Indices {
                primary: quote(Instrument::NIFTY50, 19_500.0),
                secondary: quote(Instrument::SENSEX, 65_000.0),
                tertiary: quote(Instrument::BANKNIFTY, 44_000.0),
            },
            candles: Vec::new(),
        };
        let text = ServerMessage::market_data(snapshot.clone(), 1).to_json().unwrap();
        let decoded: ServerMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded.kind, MessageKind::MarketData);
        assert_eq!(decoded.data, MessagePayload::Snapshot(Box::new(snapshot)));
        assert_eq!(decoded.symbol(), None);
    }

    #[test]
    fn parses_client_events() {
        let msg = ClientMessage::parse(r#"{"event":"subscribe","symbols":["TCS","infy"]}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Subscribe {
                symbols: vec!["TCS".into(), "infy".into()]
            }
        );
        let msg = ClientMessage::parse(r#"{"event":"unsubscribe","symbols":[]}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unsubscribe { symbols: vec![] });
    }

    #[test]
    fn rejects_malformed_client_events() {
        assert!(ClientMessage::parse(r#"{"event":"subscribe","symbols":"TCS"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"event":"trade","symbols":[]}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
    }
}
