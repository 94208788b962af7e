//! Market data model shared by the generator and its subscribers.
//!
//! - `InstrumentQuote`: the latest state of one equity or index.
//! - `Candle`: one OHLCV bar of the synthetic price history.
//! - `Indices`: the three index aggregates carried in every snapshot.
//! - `Snapshot`: one complete generator output.
//!
//! All types serialize to camelCase JSON, which is what browser clients consume.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::instruments::Instrument;

/// Latest quote for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentQuote {
    /// Symbol identifier (string form of `Instrument`).
    pub symbol: String,
    /// Human-readable instrument name.
    pub display_name: String,
    /// Last price, never negative.
    pub price: f64,
    /// `price - previous price`.
    pub change: f64,
    /// `change / previous price * 100`, zero when the previous price was zero.
    pub change_percent: f64,
    /// Opening price of the session.
    pub open: f64,
    /// Session high as reported with this tick.
    pub high: f64,
    /// Session low as reported with this tick.
    pub low: f64,
    /// Synthetic traded volume; indices report zero.
    pub volume: u64,
    /// UTC timestamp in milliseconds since Unix epoch.
    pub timestamp: i64,
}

impl InstrumentQuote {
    /// Create a quote at `price` with no movement yet.
    pub fn new(instrument: Instrument, price: f64, open: f64, timestamp: i64) -> Self {
        Self {
            symbol: instrument.to_string(),
            display_name: instrument.display_name().to_string(),
            price,
            change: 0.0,
            change_percent: 0.0,
            open,
            high: price,
            low: price,
            volume: 0,
            timestamp,
        }
    }

    /// Move the quote to `price`, recomputing change figures against the current price.
    ///
    /// A zero previous price yields zero percentage change rather than a division by zero.
    pub fn reprice(&mut self, price: f64) {
        let previous = self.price;
        self.price = price.max(0.0);
        if previous > 0.0 {
            self.change = self.price - previous;
            self.change_percent = self.change / previous * 100.0;
        } else {
            self.change = 0.0;
            self.change_percent = 0.0;
        }
    }
}

/// One OHLCV bar.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time in milliseconds since Unix epoch.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    /// `low <= min(open, close)` and `high >= max(open, close)`.
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// Index aggregates published with every snapshot.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indices {
    pub primary: InstrumentQuote,
    pub secondary: InstrumentQuote,
    pub tertiary: InstrumentQuote,
}

impl Indices {
    /// Iterate the three index quotes in order.
    pub fn iter(&self) -> impl Iterator<Item = &InstrumentQuote> {
        [&self.primary, &self.secondary, &self.tertiary].into_iter()
    }
}

/// One complete generator output.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Equity quotes keyed by symbol.
    pub quotes: BTreeMap<String, InstrumentQuote>,
    pub indices: Indices,
    /// Candle window, oldest first.
    pub candles: Vec<Candle>,
}

impl Snapshot {
    /// Every quote in the snapshot, equities first, then indices.
    pub fn all_quotes(&self) -> impl Iterator<Item = &InstrumentQuote> {
        self.quotes.values().chain(self.indices.iter())
    }

    /// Look up an equity or index quote by symbol.
    pub fn quote(&self, symbol: &str) -> Option<&InstrumentQuote> {
        self.all_quotes().find(|q| q.symbol == symbol)
    }
}
