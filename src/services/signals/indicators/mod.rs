//! Technical indicator implementations.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use adx::{Adx, AdxSeries};
pub use atr::Atr;
pub use bollinger::{BollingerBands, BollingerSeries};
pub use ema::{ema_series, Ema};
pub use macd::{Macd, MacdSeries};
pub use rsi::Rsi;
pub use sma::{sma_series, Sma};

use super::Indicator;
use crate::config::ScoringConfig;
use crate::error::{EngineError, Result};
use crate::types::{Candle, Series};

/// Period of the trailing volume average.
pub const VOLUME_AVERAGE_PERIOD: usize = 20;

/// Every indicator the engine consumes, computed once over a candle sequence.
///
/// All present series have exactly `len()` values. A `None` field means the
/// sequence was shorter than that indicator's minimum period.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    len: usize,
    pub sma20: Option<Series>,
    pub sma50: Option<Series>,
    pub ema12: Option<Series>,
    pub ema20: Option<Series>,
    pub ema26: Option<Series>,
    pub ema50: Option<Series>,
    pub rsi: Option<Series>,
    pub macd: Option<MacdSeries>,
    pub bollinger: Option<BollingerSeries>,
    pub adx: Option<AdxSeries>,
    pub atr: Option<Series>,
    pub volume_sma: Option<Series>,
}

impl IndicatorSet {
    /// Compute all indicators over `candles`.
    pub fn compute(candles: &[Candle], config: &ScoringConfig) -> Self {
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        let volume_sma = if candles.len() >= VOLUME_AVERAGE_PERIOD {
            Some(sma_series(&volumes, VOLUME_AVERAGE_PERIOD))
        } else {
            None
        };

        Self {
            len: candles.len(),
            sma20: Sma::new(20).calculate(candles),
            sma50: Sma::new(50).calculate(candles),
            ema12: Ema::new(12).calculate(candles),
            ema20: Ema::new(20).calculate(candles),
            ema26: Ema::new(26).calculate(candles),
            ema50: Ema::new(50).calculate(candles),
            rsi: Rsi::default().calculate(candles),
            macd: Macd::default().calculate(candles),
            bollinger: BollingerBands::new(config.bollinger_period, config.bollinger_std_dev)
                .calculate(candles),
            adx: Adx::default().calculate(candles),
            atr: Atr::default().calculate(candles),
            volume_sma,
        }
    }

    /// Number of candles the set is aligned to.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reject a set computed over a different candle sequence.
    pub fn ensure_aligned(&self, candles: &[Candle]) -> Result<()> {
        if self.len != candles.len() {
            return Err(EngineError::InvalidInput(format!(
                "indicator set covers {} candles, sequence has {}",
                self.len,
                candles.len()
            )));
        }
        Ok(())
    }

    /// Every present series, labelled, for alignment checks and export.
    pub fn series(&self) -> Vec<(&'static str, &Series)> {
        let mut out: Vec<(&'static str, &Series)> = Vec::new();
        let singles = [
            ("sma20", &self.sma20),
            ("sma50", &self.sma50),
            ("ema12", &self.ema12),
            ("ema20", &self.ema20),
            ("ema26", &self.ema26),
            ("ema50", &self.ema50),
            ("rsi", &self.rsi),
            ("atr", &self.atr),
            ("volume_sma", &self.volume_sma),
        ];
        for (name, series) in singles {
            if let Some(s) = series {
                out.push((name, s));
            }
        }
        if let Some(m) = &self.macd {
            out.push(("macd_line", &m.line));
            out.push(("macd_signal", &m.signal));
            out.push(("macd_histogram", &m.histogram));
        }
        if let Some(b) = &self.bollinger {
            out.push(("bb_middle", &b.middle));
            out.push(("bb_upper", &b.upper));
            out.push(("bb_lower", &b.lower));
            out.push(("bb_bandwidth", &b.bandwidth));
            out.push(("bb_percent_b", &b.percent_b));
        }
        if let Some(a) = &self.adx {
            out.push(("adx", &a.adx));
            out.push(("plus_di", &a.plus_di));
            out.push(("minus_di", &a.minus_di));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_wave_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
                Candle::new(
                    i as i64 * 60_000,
                    base - 0.2,
                    base + 1.0,
                    base - 1.0,
                    base,
                    1000.0 + (i % 7) as f64 * 50.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_indicator_set_alignment() {
        let candles = create_wave_candles(120);
        let set = IndicatorSet::compute(&candles, &ScoringConfig::default());
        assert_eq!(set.len(), 120);
        let series = set.series();
        assert_eq!(series.len(), 20);
        for (name, s) in series {
            assert_eq!(s.len(), 120, "{} misaligned", name);
        }
    }

    #[test]
    fn test_indicator_set_short_input_is_unavailable() {
        let candles = create_wave_candles(25);
        let set = IndicatorSet::compute(&candles, &ScoringConfig::default());
        assert!(set.sma20.is_some());
        assert!(set.rsi.is_some());
        assert!(set.sma50.is_none());
        assert!(set.macd.is_none());
        assert!(set.adx.is_none());
    }

    #[test]
    fn test_indicator_set_rejects_other_sequence() {
        let candles = create_wave_candles(60);
        let set = IndicatorSet::compute(&candles[..40], &ScoringConfig::default());
        assert!(set.ensure_aligned(&candles[..40]).is_ok());
        assert!(matches!(
            set.ensure_aligned(&candles),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_indicator_set_is_deterministic() {
        let candles = create_wave_candles(90);
        let a = IndicatorSet::compute(&candles, &ScoringConfig::default());
        let b = IndicatorSet::compute(&candles, &ScoringConfig::default());
        assert_eq!(a, b);
    }
}
