//! Bollinger Bands indicator.

use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// Standard deviation is the population deviation over the window.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Self {
        Self {
            period,
            std_dev_multiplier,
        }
    }

    /// Calculate standard deviation.
    fn std_dev(values: &[f64], mean: f64) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        variance.sqrt()
    }
}

/// Band series plus derived bandwidth and %B.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub middle: Series,
    pub upper: Series,
    pub lower: Series,
    /// (upper - lower) / middle, in percent.
    pub bandwidth: Series,
    /// Close position within the bands: 0 at lower, 1 at upper.
    pub percent_b: Series,
}

impl Indicator for BollingerBands {
    type Output = BollingerSeries;

    fn id(&self) -> &str {
        "bollinger"
    }

    fn name(&self) -> &str {
        "Bollinger Bands"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Volatility
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Option<BollingerSeries> {
        if self.period == 0 || candles.len() < self.period {
            return None;
        }

        let len = candles.len();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let mut out = BollingerSeries {
            middle: Series::unavailable(len),
            upper: Series::unavailable(len),
            lower: Series::unavailable(len),
            bandwidth: Series::unavailable(len),
            percent_b: Series::unavailable(len),
        };

        for i in (self.period - 1)..len {
            let window = &closes[i + 1 - self.period..=i];
            let middle = window.iter().sum::<f64>() / self.period as f64;
            let std_dev = Self::std_dev(window, middle);

            let upper = middle + self.std_dev_multiplier * std_dev;
            let lower = middle - self.std_dev_multiplier * std_dev;
            let band_width = upper - lower;

            // %B > 1: above upper band, %B < 0: below lower band
            let percent_b = if band_width > 0.0 {
                (closes[i] - lower) / band_width
            } else {
                0.5
            };
            let bandwidth = if middle != 0.0 {
                band_width / middle * 100.0
            } else {
                0.0
            };

            out.middle.set(i, middle);
            out.upper.set(i, upper);
            out.lower.set(i, lower);
            out.bandwidth.set(i, bandwidth);
            out.percent_b.set(i, percent_b);
        }

        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64, c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn test_bollinger_population_std_dev() {
        // Window [2, 4, 4, 4, 5, 5, 7, 9]: mean 5, population sd 2
        let candles = candles_from(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let bands = BollingerBands::new(8, 2.0).calculate(&candles).unwrap();
        assert!((bands.middle.last().unwrap() - 5.0).abs() < 1e-9);
        assert!((bands.upper.last().unwrap() - 9.0).abs() < 1e-9);
        assert!((bands.lower.last().unwrap() - 1.0).abs() < 1e-9);
        assert!((bands.bandwidth.last().unwrap() - 160.0).abs() < 1e-9);
        assert!((bands.percent_b.last().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_flat_prices() {
        let candles = candles_from(&[10.0; 25]);
        let bands = BollingerBands::default().calculate(&candles).unwrap();
        assert_eq!(bands.bandwidth.last(), Some(0.0));
        assert_eq!(bands.percent_b.last(), Some(0.5));
        assert_eq!(bands.middle.first_available(), Some(19));
    }
}
