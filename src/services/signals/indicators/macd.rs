//! MACD (Moving Average Convergence Divergence) indicator.

use super::ema::ema_series;
use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// MACD indicator.
///
/// Shows the relationship between two EMAs:
/// - MACD Line = EMA(12) - EMA(26)
/// - Signal Line = EMA(9) of MACD Line
/// - Histogram = MACD Line - Signal Line
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
        }
    }
}

/// MACD line, signal line and histogram, aligned to the candles.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: Series,
    pub signal: Series,
    pub histogram: Series,
}

impl Indicator for Macd {
    type Output = MacdSeries;

    fn id(&self) -> &str {
        "macd"
    }

    fn name(&self) -> &str {
        "MACD"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn calculate(&self, candles: &[Candle]) -> Option<MacdSeries> {
        if self.fast_period >= self.slow_period || candles.len() < self.min_periods() {
            return None;
        }

        let closes: Vec<Option<f64>> = candles.iter().map(|c| Some(c.close)).collect();
        let fast = ema_series(&closes, self.fast_period);
        let slow = ema_series(&closes, self.slow_period);

        // Fast EMA starts earlier; the line exists where both do
        let line_values: Vec<Option<f64>> = (0..candles.len())
            .map(|i| match (fast.get(i), slow.get(i)) {
                (Some(f), Some(s)) => Some(f - s),
                _ => None,
            })
            .collect();
        let line = Series::from_values(line_values);

        // Signal line (EMA of MACD)
        let signal = ema_series(line.values(), self.signal_period);

        let histogram = Series::from_values(
            (0..candles.len())
                .map(|i| match (line.get(i), signal.get(i)) {
                    (Some(m), Some(s)) => Some(m - s),
                    _ => None,
                })
                .collect(),
        );

        Some(MacdSeries {
            line,
            signal,
            histogram,
        })
    }
}
