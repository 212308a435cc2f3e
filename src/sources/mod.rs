//! Market data providers.
//!
//! The engine never fetches data itself. Callers obtain ordered candles from
//! a provider and pass them in.

pub mod json_file;
pub mod synthetic;

pub use json_file::JsonFileProvider;
pub use synthetic::SyntheticProvider;

use crate::error::Result;
use crate::types::{Candle, Resolution, Ticker};

/// Source of ordered candles and ticker snapshots.
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Up to `count` most recent candles, oldest first.
    fn get_candles(&self, symbol: &str, resolution: Resolution, count: usize) -> Result<Vec<Candle>>;

    /// Current ticker snapshot.
    fn get_ticker(&self, symbol: &str) -> Result<Ticker>;
}

/// Derive a ticker from the trailing 24 hours of candles.
pub(crate) fn ticker_from_candles(symbol: &str, candles: &[Candle]) -> Option<Ticker> {
    let last = candles.last()?;
    let cutoff = last.timestamp - 24 * 60 * 60 * 1000;
    let window: Vec<&Candle> = candles.iter().filter(|c| c.timestamp > cutoff).collect();
    let first = window.first()?;

    let reference = first.open;
    let change_24h = if reference > 0.0 {
        (last.close - reference) / reference * 100.0
    } else {
        0.0
    };

    Some(Ticker {
        symbol: symbol.to_uppercase(),
        price: last.close,
        change_24h,
        volume_24h: window.iter().map(|c| c.volume).sum(),
        high_24h: window.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        low_24h: window.iter().map(|c| c.low).fold(f64::MAX, f64::min),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_covers_trailing_day_only() {
        let hour = 60 * 60 * 1000;
        let candles: Vec<Candle> = (0..48)
            .map(|i| {
                let price = 100.0 + i as f64;
                Candle::new(i * hour, price, price + 1.0, price - 1.0, price + 0.5, 10.0)
            })
            .collect();

        let ticker = ticker_from_candles("btc", &candles).unwrap();
        assert_eq!(ticker.symbol, "BTC");
        assert_eq!(ticker.price, 147.5);
        assert_eq!(ticker.volume_24h, 240.0);
        assert_eq!(ticker.high_24h, 148.0);
        assert_eq!(ticker.low_24h, 123.0);
    }

    #[test]
    fn test_ticker_needs_candles() {
        assert!(ticker_from_candles("btc", &[]).is_none());
    }
}
