use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// OHLCV candle for a fixed time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, Unix milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True range against the previous candle.
    /// TR = max(High-Low, |High-PrevClose|, |Low-PrevClose|)
    pub fn true_range(&self, previous: &Candle) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - previous.close).abs();
        let lc = (self.low - previous.close).abs();
        hl.max(hc).max(lc)
    }

    /// Whether the candle closed above its open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    fn check(&self, index: usize) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::InvalidInput(format!(
                    "candle {} has non-finite {}",
                    index, name
                )));
            }
            if value < 0.0 {
                return Err(EngineError::InvalidInput(format!(
                    "candle {} has negative {} ({})",
                    index, name, value
                )));
            }
        }
        if self.high < self.low {
            return Err(EngineError::InvalidInput(format!(
                "candle {} has high {} below low {}",
                index, self.high, self.low
            )));
        }
        Ok(())
    }
}

/// Validated, timestamp-ordered candle sequence.
///
/// Every indicator series, pivot index and detector finding is positionally
/// aligned to one of these.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Validate and wrap a candle vector.
    ///
    /// Rejects empty input, non-increasing timestamps and NaN, infinite or
    /// negative prices/volumes before any computation begins.
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        Self::validate(&candles)?;
        Ok(Self { candles })
    }

    /// Validate a borrowed slice without taking ownership.
    pub fn validate(candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Err(EngineError::insufficient("candle series", 1, 0));
        }

        for (i, candle) in candles.iter().enumerate() {
            candle.check(i)?;
            if i > 0 && candle.timestamp <= candles[i - 1].timestamp {
                return Err(EngineError::InvalidInput(format!(
                    "timestamps must be strictly increasing: candle {} ({}) follows {}",
                    i,
                    candle.timestamp,
                    candles[i - 1].timestamp
                )));
            }
        }

        Ok(())
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn into_inner(self) -> Vec<Candle> {
        self.candles
    }
}

/// Numeric series aligned to a candle sequence.
///
/// `None` marks positions where the lookback window is not yet full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    values: Vec<Option<f64>>,
}

impl Series {
    /// Series of `len` unavailable values.
    pub fn unavailable(len: usize) -> Self {
        Self {
            values: vec![None; len],
        }
    }

    pub fn from_values(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, `None` when unavailable or out of range.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Value at the final position.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn set(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = Some(value);
        }
    }

    /// Index of the first available value.
    pub fn first_available(&self) -> Option<usize> {
        self.values.iter().position(|v| v.is_some())
    }

    /// Mean of the available values in `[start, end)`.
    pub fn mean(&self, start: usize, end: usize) -> Option<f64> {
        let end = end.min(self.values.len());
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in self.values.get(start..end)?.iter().flatten() {
            sum += v;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close + 1.0, close - 1.0, close, 1000.0)
    }

    #[test]
    fn test_series_rejects_empty() {
        let err = CandleSeries::new(Vec::new()).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_series_rejects_duplicate_timestamps() {
        let err = CandleSeries::new(vec![candle(1, 10.0), candle(1, 11.0)]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_series_rejects_nan_and_negative() {
        let mut bad = candle(2, 10.0);
        bad.close = f64::NAN;
        assert!(CandleSeries::new(vec![candle(1, 10.0), bad]).is_err());

        let mut negative = candle(2, 10.0);
        negative.volume = -1.0;
        assert!(CandleSeries::new(vec![candle(1, 10.0), negative]).is_err());
    }

    #[test]
    fn test_series_rejects_inverted_range() {
        let inverted = Candle::new(1, 10.0, 9.0, 11.0, 10.0, 1.0);
        assert!(CandleSeries::new(vec![inverted]).is_err());
    }

    #[test]
    fn test_true_range_uses_previous_close() {
        let prev = candle(1, 100.0);
        let gap_up = Candle::new(2, 110.0, 112.0, 108.0, 111.0, 1.0);
        assert!((gap_up.true_range(&prev) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_series_mean_skips_unavailable() {
        let s = Series::from_values(vec![None, Some(2.0), Some(4.0), None]);
        assert_eq!(s.mean(0, 4), Some(3.0));
        assert_eq!(s.mean(3, 4), None);
        assert_eq!(s.first_available(), Some(1));
        assert_eq!(s.last(), None);
    }
}
