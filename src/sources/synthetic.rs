use super::{ticker_from_candles, MarketDataProvider};
use crate::error::{EngineError, Result};
use crate::types::{Candle, Resolution, Ticker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random walk for demos and offline runs.
///
/// The same seed, symbol and resolution always produce the same prices.
/// Timestamps end at the most recent bucket boundary before `now`.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    now_ms: i64,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            now_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Pin the clock, for reproducible timestamps.
    pub fn with_now(mut self, now_ms: i64) -> Self {
        self.now_ms = now_ms;
        self
    }

    fn rng(&self, symbol: &str, resolution: Resolution) -> StdRng {
        let symbol_hash = symbol
            .to_lowercase()
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            });
        StdRng::seed_from_u64(self.seed ^ symbol_hash ^ resolution.seconds() as u64)
    }

    /// Generate synthetic candles.
    fn generate(&self, symbol: &str, resolution: Resolution, count: usize) -> Vec<Candle> {
        let mut rng = self.rng(symbol, resolution);
        let interval_ms = resolution.seconds() * 1000;
        let end = self.now_ms / interval_ms * interval_ms;
        let start = end - (count as i64 - 1) * interval_ms;

        let mut candles = Vec::with_capacity(count);
        let mut price: f64 = 100.0;
        // Volatility scales with the bucket size
        let step = (resolution.seconds() as f64 / 3600.0).sqrt() * 0.01;

        for i in 0..count {
            let open = price;
            // Random walk with drift
            let change = rng.gen_range(-step..step) + step * 0.02;
            price = (price * (1.0 + change)).max(0.01);

            let high = open.max(price) * (1.0 + rng.gen_range(0.0..step / 2.0));
            let low = open.min(price) * (1.0 - rng.gen_range(0.0..step / 2.0));
            let volume = rng.gen_range(1000.0..100000.0);

            candles.push(Candle::new(
                start + i as i64 * interval_ms,
                open,
                high,
                low,
                price,
                volume,
            ));
        }

        candles
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn get_candles(&self, symbol: &str, resolution: Resolution, count: usize) -> Result<Vec<Candle>> {
        if count == 0 {
            return Err(EngineError::InvalidInput("candle count must be positive".to_string()));
        }
        Ok(self.generate(symbol, resolution, count))
    }

    fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let candles = self.generate(symbol, Resolution::OneHour, 24);
        ticker_from_candles(symbol, &candles)
            .ok_or_else(|| EngineError::insufficient(format!("{} ticker", symbol), 1, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandleSeries;

    #[test]
    fn test_same_seed_same_prices() {
        let a = SyntheticProvider::new(7).with_now(1_700_000_000_000);
        let b = SyntheticProvider::new(7).with_now(1_700_000_000_000);
        assert_eq!(
            a.get_candles("btc", Resolution::OneHour, 100).unwrap(),
            b.get_candles("BTC", Resolution::OneHour, 100).unwrap()
        );
    }

    #[test]
    fn test_resolutions_differ() {
        let p = SyntheticProvider::new(7);
        let hourly = p.get_candles("btc", Resolution::OneHour, 50).unwrap();
        let daily = p.get_candles("btc", Resolution::OneDay, 50).unwrap();
        assert_ne!(hourly[49].close, daily[49].close);
    }

    #[test]
    fn test_generated_candles_are_valid() {
        let candles = SyntheticProvider::new(1)
            .get_candles("eth", Resolution::FifteenMinutes, 300)
            .unwrap();
        assert_eq!(candles.len(), 300);
        assert!(CandleSeries::validate(&candles).is_ok());
    }
}
