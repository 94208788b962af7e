//! Bounded candle history and synthetic bar construction.
//!
//! `CandleSeries` is an append-only window over the most recent bars: once it holds
//! `capacity` candles, every push evicts the oldest one. `synth_candle` builds the next
//! bar from the previous close so that `low <= min(open, close)` and
//! `high >= max(open, close)` hold for every bar, not just on average.

use market_common::model::Candle;
use rand::Rng;
use std::collections::VecDeque;

/// Maximum close-to-open move of one synthetic bar, as a fraction.
const MAX_BAR_MOVE: f64 = 0.02;
/// Maximum wick extension beyond the bar body, as a fraction.
const MAX_WICK: f64 = 0.02;
/// Upper bound for synthetic bar volume.
const MAX_BAR_VOLUME: u64 = 1_000_000;

/// Fixed-capacity window of candles, oldest first.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleSeries {
    /// Create an empty series holding at most `capacity` candles.
    pub fn new(capacity: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a candle, evicting the oldest when the window is full.
    pub fn push(&mut self, candle: Candle) {
        if self.capacity == 0 {
            return;
        }
        if self.candles.len() == self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    /// Most recent candle, if any.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Copy the window out, oldest first.
    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }
}

/// Round a price to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the bar that follows a close of `open` and starts at `time`.
///
/// Rounding is monotonic, so rounding every field keeps the OHLC ordering intact.
pub fn synth_candle<R: Rng + ?Sized>(rng: &mut R, open: f64, time: i64) -> Candle {
    let open = open.max(0.0);
    let close = (open * (1.0 + rng.random_range(-MAX_BAR_MOVE..MAX_BAR_MOVE))).max(0.0);
    let high = open.max(close) * (1.0 + rng.random_range(0.0..MAX_WICK));
    let low = open.min(close) * (1.0 - rng.random_range(0.0..MAX_WICK));

    Candle {
        time,
        open: round2(open),
        high: round2(high),
        low: round2(low),
        close: round2(close),
        volume: rng.random_range(0..MAX_BAR_VOLUME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn candle_at(time: i64) -> Candle {
        Candle {
            time,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0,
        }
    }

    #[test]
    fn evicts_oldest_once_full() {
        let mut series = CandleSeries::new(3);
        for t in 0..5 {
            series.push(candle_at(t));
        }
        let times: Vec<i64> = series.to_vec().iter().map(|c| c.time).collect();
        assert_eq!(times, vec![2, 3, 4]);
        assert_eq!(series.last().map(|c| c.time), Some(4));
    }

    #[test]
    fn zero_capacity_stays_empty() {
        let mut series = CandleSeries::new(0);
        series.push(candle_at(1));
        assert!(series.to_vec().is_empty());
        assert!(series.last().is_none());
    }

    #[test]
    fn synthetic_bars_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut open = 2500.0;
        for i in 0..10_000 {
            let candle = synth_candle(&mut rng, open, i);
            assert!(candle.is_well_formed(), "malformed candle {:?}", candle);
            assert!(candle.low >= 0.0);
            open = candle.close;
        }
    }

    #[test]
    fn bar_from_zero_open_stays_flat() {
        let mut rng = StdRng::seed_from_u64(1);
        let candle = synth_candle(&mut rng, 0.0, 0);
        assert_eq!((candle.open, candle.high, candle.low, candle.close), (0.0, 0.0, 0.0, 0.0));
        assert!(candle.is_well_formed());
    }
}
