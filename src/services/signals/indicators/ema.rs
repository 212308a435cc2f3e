//! Exponential Moving Average (EMA) indicator.

use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// EMA (Exponential Moving Average) indicator.
///
/// Like SMA but gives more weight to recent prices. Uses the smoothing
/// constant `2 / (period + 1)` seeded by the SMA of the first `period` values.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

/// EMA over a possibly sparse series.
///
/// Seeded by the SMA of the first `period` consecutive available values.
/// Gaps after the seed are skipped and left unavailable.
pub fn ema_series(values: &[Option<f64>], period: usize) -> Series {
    let mut series = Series::unavailable(values.len());
    if period == 0 {
        return series;
    }

    let mut run = 0;
    let mut seed_end = None;
    for (i, value) in values.iter().enumerate() {
        run = if value.is_some() { run + 1 } else { 0 };
        if run == period {
            seed_end = Some(i + 1);
            break;
        }
    }
    let Some(seed_end) = seed_end else {
        return series;
    };

    let multiplier = 2.0 / (period as f64 + 1.0);

    // First EMA is SMA
    let mut ema = values[seed_end - period..seed_end].iter().flatten().sum::<f64>() / period as f64;
    series.set(seed_end - 1, ema);

    for (i, value) in values.iter().enumerate().skip(seed_end) {
        if let Some(v) = value {
            ema = (v - ema) * multiplier + ema;
            series.set(i, ema);
        }
    }

    series
}

impl Indicator for Ema {
    type Output = Series;

    fn id(&self) -> &str {
        match self.period {
            12 => "ema12",
            20 => "ema20",
            26 => "ema26",
            50 => "ema50",
            _ => "ema",
        }
    }

    fn name(&self) -> &str {
        match self.period {
            12 => "EMA (12)",
            20 => "EMA (20)",
            26 => "EMA (26)",
            50 => "EMA (50)",
            _ => "EMA",
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

        let closes: Vec<Option<f64>> = candles.iter().map(|c| Some(c.close)).collect();
        Some(ema_series(&closes, self.period))
    }
}
