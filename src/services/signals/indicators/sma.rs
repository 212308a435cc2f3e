//! Simple Moving Average (SMA) indicator.

use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// SMA (Simple Moving Average) indicator.
///
/// Calculates the average close over a trailing window. The first value
/// appears at index `period - 1`.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

/// Rolling mean of `values` over `period`.
pub fn sma_series(values: &[f64], period: usize) -> Series {
    let mut series = Series::unavailable(values.len());
    if period == 0 || values.len() < period {
        return series;
    }

    let mut sum: f64 = values.iter().take(period).sum();
    series.set(period - 1, sum / period as f64);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        series.set(i, sum / period as f64);
    }

    series
}

impl Indicator for Sma {
    type Output = Series;

    fn id(&self) -> &str {
        match self.period {
            20 => "sma20",
            50 => "sma50",
            _ => "sma",
        }
    }

    fn name(&self) -> &str {
        match self.period {
            20 => "SMA (20)",
            50 => "SMA (50)",
            _ => "SMA",
        }
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<Series> {
        if candles.len() < self.min_periods() {
            return None;
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        Some(sma_series(&closes, self.period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_values() {
        let values = [10.0, 20.0, 30.0, 40.0, 50.0];
        let sma = sma_series(&values, 3);
        assert_eq!(sma.len(), 5);
        assert_eq!(sma.get(0), None);
        assert_eq!(sma.get(1), None);
        assert!((sma.get(2).unwrap() - 20.0).abs() < 1e-9);
        // SMA of last 3: (30 + 40 + 50) / 3 = 40
        assert!((sma.last().unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let candles: Vec<Candle> = (0..10)
            .map(|i| Candle::new(i, 1.0, 1.0, 1.0, 1.0, 1.0))
            .collect();
        assert!(Sma::new(20).calculate(&candles).is_none());
    }

    #[test]
    fn test_sma_id_and_name() {
        let sma = Sma::new(50);
        assert_eq!(sma.id(), "sma50");
        assert_eq!(sma.name(), "SMA (50)");
    }
}
