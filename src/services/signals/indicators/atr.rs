//! Average True Range (ATR) indicator.

use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// ATR (Average True Range) indicator.
///
/// Measures market volatility by averaging true ranges:
/// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
///
/// Uses Wilder smoothing. The first value appears at index `period`.
pub struct Atr {
    period: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

/// Wilder smoothing over a series whose first value sits at `offset`.
///
/// Seeds with the mean of the first `period` values, so the first output is
/// at `offset + period - 1`.
pub fn wilder_smooth(values: &[f64], offset: usize, period: usize, len: usize) -> Series {
    let mut series = Series::unavailable(len);
    if period == 0 || values.len() < period {
        return series;
    }

    let mut smoothed = values.iter().take(period).sum::<f64>() / period as f64;
    series.set(offset + period - 1, smoothed);

    for (i, value) in values.iter().enumerate().skip(period) {
        smoothed = (smoothed * (period - 1) as f64 + value) / period as f64;
        series.set(offset + i, smoothed);
    }

    series
}

impl Indicator for Atr {
    type Output = Series;

    fn id(&self) -> &str {
        "atr"
    }

    fn name(&self) -> &str {
        "ATR (14)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Series> {
        if self.period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        // True ranges start at index 1
        let true_ranges: Vec<f64> = candles
            .windows(2)
            .map(|w| w[1].true_range(&w[0]))
            .collect();

        Some(wilder_smooth(&true_ranges, 1, self.period, candles.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uptrend_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                Candle::new(
                    1000000 + i as i64 * 60000,
                    base,
                    base + 2.0,
                    base - 1.0,
                    base + 1.0,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_atr_id_and_name() {
        let atr = Atr::default();
        assert_eq!(atr.id(), "atr");
        assert_eq!(atr.name(), "ATR (14)");
        assert_eq!(atr.category(), SignalCategory::Volatility);
    }

    #[test]
    fn test_atr_min_periods() {
        assert_eq!(Atr::default().min_periods(), 15);
        let candles = create_uptrend_candles(10);
        assert!(Atr::default().calculate(&candles).is_none());
    }

    #[test]
    fn test_atr_constant_range() {
        // Every candle: high - low = 3, gaps never exceed it
        let candles = create_uptrend_candles(30);
        let atr = Atr::default().calculate(&candles).unwrap();
        assert_eq!(atr.first_available(), Some(14));
        assert!((atr.last().unwrap() - 3.0).abs() < 1e-9);
    }
}
