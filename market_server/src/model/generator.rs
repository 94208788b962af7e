//! Synthetic market data generator.
//!
//! The `MarketGenerator` owns the last known state of every tracked instrument and the
//! candle window. Each call to [`MarketGenerator::produce`] advances that state by one
//! step and returns a complete [`Snapshot`]:
//!
//! - equities move by a uniform delta in `[-5%, +5%)` of their last price, report a
//!   fresh high/low within 5% of the new price and a random volume;
//! - indices move the same way from their own base values and report a fixed band;
//! - the candle window grows by one bar that opens at the previous close.
//!
//! Generation never fails. The random source is owned by the generator so tests can
//! seed it and replay the exact same walk.

use crate::model::candles::{CandleSeries, round2, synth_candle};
use chrono::Utc;
use market_common::instruments::{Instrument, InstrumentKind};
use market_common::model::{Indices, InstrumentQuote, Snapshot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// Largest per-tick price move, as a fraction of the previous price.
const MAX_TICK_MOVE: f64 = 0.05;
/// Largest distance of an equity's high/low from its price, as a fraction.
const MAX_RANGE: f64 = 0.05;
/// Upper bound for synthetic equity volume.
const MAX_VOLUME: u64 = 10_000_000;
/// Equity base prices are drawn from `[MIN_BASE_PRICE, MIN_BASE_PRICE + BASE_PRICE_SPAN)`.
const MIN_BASE_PRICE: f64 = 100.0;
const BASE_PRICE_SPAN: f64 = 3000.0;
/// Price the synthetic candle history starts from.
pub const CANDLE_START_PRICE: f64 = 2500.0;

/// Tunables for the generator.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorConfig {
    /// Number of candles kept in the window.
    pub candle_window: usize,
    /// Time between consecutive candles, in milliseconds.
    pub candle_step_ms: i64,
    /// Pre-fill the window with a full history ending now.
    pub seed_history: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            candle_window: 100,
            candle_step_ms: 60_000,
            seed_history: true,
        }
    }
}

/// Random-walk generator over the instrument catalogue.
pub struct MarketGenerator {
    rng: StdRng,
    quotes: BTreeMap<String, InstrumentQuote>,
    indices: Indices,
    candles: CandleSeries,
    candle_step_ms: i64,
}

impl MarketGenerator {
    /// Create a generator seeded from the operating system.
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Create a generator with a fixed seed, producing a reproducible walk.
    pub fn with_seed(config: GeneratorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GeneratorConfig, mut rng: StdRng) -> Self {
        let now = Utc::now().timestamp_millis();

        let quotes = Instrument::EQUITIES
            .iter()
            .map(|instrument| {
                let base = rng.random_range(MIN_BASE_PRICE..MIN_BASE_PRICE + BASE_PRICE_SPAN);
                let open = base * rng.random_range(1.0 - MAX_RANGE..1.0 + MAX_RANGE);
                let quote = InstrumentQuote::new(*instrument, round2(base), round2(open), now);
                (quote.symbol.clone(), quote)
            })
            .collect();

        let [primary, secondary, tertiary] = Instrument::INDICES.map(|instrument| {
            let base = match instrument.kind() {
                InstrumentKind::Index { base, .. } => base,
                InstrumentKind::Equity => 0.0,
            };
            InstrumentQuote::new(instrument, base, base, now)
        });

        let mut candles = CandleSeries::new(config.candle_window);
        if config.seed_history {
            let span = (config.candle_window as i64).saturating_mul(config.candle_step_ms);
            let mut time = now - span;
            let mut open = CANDLE_START_PRICE;
            for _ in 0..config.candle_window {
                let candle = synth_candle(&mut rng, open, time);
                open = candle.close;
                time += config.candle_step_ms;
                candles.push(candle);
            }
        }

        Self {
            rng,
            quotes,
            indices: Indices {
                primary,
                secondary,
                tertiary,
            },
            candles,
            candle_step_ms: config.candle_step_ms,
        }
    }

    /// Current state without advancing it.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            quotes: self.quotes.clone(),
            indices: self.indices.clone(),
            candles: self.candles.to_vec(),
        }
    }

    /// Advance every instrument and the candle window by one step.
    pub fn produce(&mut self) -> Snapshot {
        let now = Utc::now().timestamp_millis();

        for quote in self.quotes.values_mut() {
            step_equity(&mut self.rng, quote, now);
        }
        for (quote, instrument) in [
            &mut self.indices.primary,
            &mut self.indices.secondary,
            &mut self.indices.tertiary,
        ]
        .into_iter()
        .zip(Instrument::INDICES)
        {
            let band = match instrument.kind() {
                InstrumentKind::Index { band, .. } => band,
                InstrumentKind::Equity => 0.0,
            };
            step_index(&mut self.rng, quote, band, now);
        }

        let (open, time) = match self.candles.last() {
            Some(last) => (last.close, last.time + self.candle_step_ms),
            None => (CANDLE_START_PRICE, now),
        };
        let candle = synth_candle(&mut self.rng, open, time);
        self.candles.push(candle);

        self.snapshot()
    }
}

fn next_price<R: Rng + ?Sized>(rng: &mut R, current_price: f64) -> f64 {
    let change: f64 = rng.random_range(-MAX_TICK_MOVE..MAX_TICK_MOVE);
    round2(current_price * (1.0 + change)).max(0.0)
}

fn step_equity<R: Rng + ?Sized>(rng: &mut R, quote: &mut InstrumentQuote, now: i64) {
    let price = next_price(rng, quote.price);
    quote.reprice(price);
    let up = quote.price * rng.random_range(0.0..MAX_RANGE);
    let down = quote.price * rng.random_range(0.0..MAX_RANGE);
    quote.high = round2(quote.price + up);
    quote.low = round2(quote.price - down).max(0.0);
    quote.volume = rng.random_range(0..MAX_VOLUME);
    quote.timestamp = now;
}

fn step_index<R: Rng + ?Sized>(rng: &mut R, quote: &mut InstrumentQuote, band: f64, now: i64) {
    let price = next_price(rng, quote.price);
    quote.reprice(price);
    quote.high = round2(quote.price + band);
    quote.low = round2(quote.price - band).max(0.0);
    quote.volume = 0;
    quote.timestamp = now;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unseeded_history(window: usize) -> GeneratorConfig {
        GeneratorConfig {
            candle_window: window,
            candle_step_ms: 60_000,
            seed_history: false,
        }
    }

    #[test]
    fn snapshot_covers_catalogue() {
        let generator = MarketGenerator::with_seed(GeneratorConfig::default(), 1);
        let snapshot = generator.snapshot();
        assert_eq!(snapshot.quotes.len(), Instrument::EQUITIES.len());
        assert_eq!(snapshot.indices.primary.symbol, "NIFTY50");
        assert_eq!(snapshot.indices.secondary.symbol, "SENSEX");
        assert_eq!(snapshot.indices.tertiary.symbol, "BANKNIFTY");
        assert_eq!(snapshot.indices.secondary.price, 65_000.0);
        assert_eq!(snapshot.candles.len(), 100);
        assert_eq!(snapshot.candles[0].open, CANDLE_START_PRICE);
        for quote in snapshot.quotes.values() {
            assert!((MIN_BASE_PRICE..MIN_BASE_PRICE + BASE_PRICE_SPAN + 0.01).contains(&quote.price));
        }
    }

    #[test]
    fn every_candle_keeps_ohlc_ordering() {
        let mut generator = MarketGenerator::with_seed(GeneratorConfig::default(), 11);
        for snapshot in std::iter::repeat_with(|| generator.produce()).take(500) {
            for candle in &snapshot.candles {
                assert!(candle.is_well_formed(), "malformed candle {:?}", candle);
            }
        }
    }

    #[test]
    fn quotes_stay_non_negative_and_change_matches_previous_price() {
        let mut generator = MarketGenerator::with_seed(GeneratorConfig::default(), 23);
        let mut previous = generator.snapshot();
        for _ in 0..500 {
            let current = generator.produce();
            for quote in current.all_quotes() {
                let before = previous.quote(&quote.symbol).map(|q| q.price).unwrap();
                assert!(quote.price >= 0.0);
                assert!(quote.low >= 0.0 && quote.low <= quote.price && quote.high >= quote.price);
                assert_eq!(quote.change, quote.price - before);
                if before > 0.0 {
                    assert_eq!(quote.change_percent, quote.change / before * 100.0);
                    assert_eq!(
                        quote.change.partial_cmp(&0.0),
                        quote.change_percent.partial_cmp(&0.0)
                    );
                }
            }
            previous = current;
        }
    }

    #[test]
    fn zero_previous_price_reports_zero_change() {
        let mut generator = MarketGenerator::with_seed(GeneratorConfig::default(), 5);
        if let Some(quote) = generator.quotes.get_mut("TCS") {
            quote.price = 0.0;
        }
        let snapshot = generator.produce();
        let tcs = snapshot.quote("TCS").unwrap();
        assert_eq!(tcs.price, 0.0);
        assert_eq!(tcs.change, 0.0);
        assert_eq!(tcs.change_percent, 0.0);
    }

    #[test]
    fn empty_window_fills_then_evicts_oldest() {
        let mut generator = MarketGenerator::with_seed(unseeded_history(100), 3);
        assert!(generator.snapshot().candles.is_empty());

        let mut produced = Vec::new();
        for _ in 0..150 {
            let snapshot = generator.produce();
            produced.push(*snapshot.candles.last().unwrap());
            assert!(snapshot.candles.len() <= 100);
        }

        let candles = generator.snapshot().candles;
        assert_eq!(candles.len(), 100);
        assert_eq!(candles[0], produced[50]);
        assert_eq!(candles[99], produced[149]);
        assert_eq!(candles[99].time - candles[0].time, 99 * 60_000);
    }

    #[test]
    fn seeded_history_continues_from_last_close() {
        let mut generator = MarketGenerator::with_seed(GeneratorConfig::default(), 9);
        let before = generator.snapshot().candles;
        let after = generator.produce().candles;
        assert_eq!(after.len(), before.len());
        assert_eq!(after[0], before[1]);
        let last = after[after.len() - 1];
        assert_eq!(last.open, before[before.len() - 1].close);
        assert_eq!(last.time, before[before.len() - 1].time + 60_000);
    }

    #[test]
    fn same_seed_replays_same_walk() {
        let config = unseeded_history(10);
        let mut a = MarketGenerator::with_seed(config, 42);
        let mut b = MarketGenerator::with_seed(config, 42);
        for _ in 0..20 {
            let (sa, sb) = (a.produce(), b.produce());
            let prices_a: Vec<f64> = sa.all_quotes().map(|q| q.price).collect();
            let prices_b: Vec<f64> = sb.all_quotes().map(|q| q.price).collect();
            assert_eq!(prices_a, prices_b);
        }
    }
}
