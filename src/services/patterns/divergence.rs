//! Price / oscillator divergence detection.
//!
//! Troughs are read from candle lows and peaks from candle highs. Each is
//! compared against RSI and the MACD histogram:
//! - Lower price low, higher oscillator low: bullish
//! - Higher price high, lower oscillator high: bearish
//! - Higher price low, lower oscillator low: hidden bullish
//! - Lower price high, higher oscillator high: hidden bearish

use crate::config::DivergenceConfig;
use crate::error::{EngineError, Result};
use crate::services::signals::indicators::{IndicatorSet, Macd, Rsi};
use crate::services::signals::{clamp_score, find_pivots_sparse, Indicator};
use crate::types::{
    AnchorPoint, Candle, CandleSeries, Direction, Divergence, DivergenceAnalysis,
    DivergenceIndicator, DivergenceType, Pivot, PivotKind,
};
use tracing::debug;

/// Divergence detector.
#[derive(Debug, Clone, Default)]
pub struct DivergenceDetector {
    config: DivergenceConfig,
}

impl DivergenceDetector {
    pub fn new(config: DivergenceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DivergenceConfig {
        &self.config
    }

    /// Candles needed before both oscillators exist.
    pub fn min_candles(&self) -> usize {
        Macd::default()
            .min_periods()
            .max(Rsi::default().min_periods())
            .max(2 * self.config.pivot_window + 1)
    }

    /// Run RSI and MACD divergence checks over the lookback window.
    pub fn detect(&self, candles: &[Candle], indicators: &IndicatorSet) -> Result<DivergenceAnalysis> {
        CandleSeries::validate(candles)?;
        indicators.ensure_aligned(candles)?;
        if candles.len() < self.min_candles() {
            return Err(EngineError::insufficient(
                "divergence detection",
                self.min_candles(),
                candles.len(),
            ));
        }

        let (Some(rsi), Some(macd)) = (&indicators.rsi, &indicators.macd) else {
            return Err(EngineError::insufficient(
                "divergence oscillators",
                self.min_candles(),
                candles.len(),
            ));
        };

        let lows: Vec<Option<f64>> = candles.iter().map(|c| Some(c.low)).collect();
        let highs: Vec<Option<f64>> = candles.iter().map(|c| Some(c.high)).collect();

        let oscillators = [
            (DivergenceIndicator::Rsi, rsi.values()),
            (DivergenceIndicator::Macd, macd.histogram.values()),
        ];

        let mut divergences = Vec::new();
        for (indicator, values) in oscillators {
            for (kind, price) in [(PivotKind::Low, &lows), (PivotKind::High, &highs)] {
                if let Some(d) = self.detect_series(price, values, kind, indicator) {
                    divergences.push(d);
                }
            }
        }
        divergences.sort_by_key(|d| d.candles_ago);

        let analysis = self.summarize(divergences);
        debug!(
            "Divergence scan: {} found, {} active, confirmed={}",
            analysis.divergences.len(),
            analysis.active.len(),
            analysis.confirmed
        );
        Ok(analysis)
    }

    /// Compare the two most recent price pivots of `kind` against the
    /// oscillator pivots nearest to them.
    ///
    /// Both series must be aligned. Only the trailing lookback window is
    /// searched. `candles_ago` counts from the series end.
    pub fn detect_series(
        &self,
        price: &[Option<f64>],
        oscillator: &[Option<f64>],
        kind: PivotKind,
        indicator: DivergenceIndicator,
    ) -> Option<Divergence> {
        let len = price.len().min(oscillator.len());
        if len == 0 {
            return None;
        }
        let start = len.saturating_sub(self.config.lookback);
        let window = self.config.pivot_window;

        let price_pivots = find_pivots_sparse(&price[start..len], window).shifted(start);
        let osc_pivots = find_pivots_sparse(&oscillator[start..len], window).shifted(start);

        let price_side = price_pivots.of_kind(kind);
        if price_side.len() < 2 {
            return None;
        }
        let older = &price_side[price_side.len() - 2];
        let newer = &price_side[price_side.len() - 1];

        let osc_side = osc_pivots.of_kind(kind);
        let osc_older = self.nearest(osc_side, older.index)?;
        let osc_newer = self.nearest(osc_side, newer.index)?;
        if osc_older.index >= osc_newer.index {
            return None;
        }

        let price_delta = newer.value - older.value;
        let osc_delta = osc_newer.value - osc_older.value;

        let divergence_type = match kind {
            PivotKind::Low if price_delta < 0.0 && osc_delta > 0.0 => DivergenceType::Bullish,
            PivotKind::Low if price_delta > 0.0 && osc_delta < 0.0 => DivergenceType::HiddenBullish,
            PivotKind::High if price_delta > 0.0 && osc_delta < 0.0 => DivergenceType::Bearish,
            PivotKind::High if price_delta < 0.0 && osc_delta > 0.0 => DivergenceType::HiddenBearish,
            _ => return None,
        };

        Some(Divergence {
            divergence_type,
            indicator,
            strength: strength(older.value, price_delta, osc_older.value, osc_delta),
            candles_ago: len - 1 - newer.index,
            anchor_points: vec![anchor(older, osc_older), anchor(newer, osc_newer)],
        })
    }

    /// Oscillator pivot closest to `index` within the match tolerance.
    /// Ties go to the earlier pivot.
    fn nearest<'a>(&self, pivots: &'a [Pivot], index: usize) -> Option<&'a Pivot> {
        pivots
            .iter()
            .filter(|p| p.index.abs_diff(index) <= self.config.match_tolerance)
            .min_by_key(|p| (p.index.abs_diff(index), p.index))
    }

    fn summarize(&self, divergences: Vec<Divergence>) -> DivergenceAnalysis {
        let active: Vec<Divergence> = divergences
            .iter()
            .filter(|d| d.candles_ago <= self.config.recency_window)
            .cloned()
            .collect();

        let strongest = |indicator: DivergenceIndicator, direction: Direction| {
            active
                .iter()
                .filter(|d| d.indicator == indicator && d.divergence_type.direction() == direction)
                .map(|d| d.strength)
                .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
        };

        // Confirmation: both oscillators point the same way
        let mut confirmation: Option<(Direction, f64)> = None;
        for direction in [Direction::Bullish, Direction::Bearish] {
            if let (Some(a), Some(b)) = (
                strongest(DivergenceIndicator::Rsi, direction),
                strongest(DivergenceIndicator::Macd, direction),
            ) {
                let combined = clamp_score(a.max(b) + 0.5 * a.min(b));
                if confirmation.map_or(true, |(_, best)| combined > best) {
                    confirmation = Some((direction, combined));
                }
            }
        }

        let (confirmed, combined_score, bias) = match confirmation {
            Some((direction, score)) => (true, score, direction),
            None => {
                let top = active.iter().max_by(|a, b| a.strength.total_cmp(&b.strength));
                match top {
                    Some(d) => (false, d.strength, d.divergence_type.direction()),
                    None => (false, 0.0, Direction::Neutral),
                }
            }
        };

        DivergenceAnalysis {
            divergences,
            active,
            confirmed,
            combined_score,
            bias,
        }
    }
}

/// Bounded function of both relative deltas. Price moves count heavier.
fn strength(price_base: f64, price_delta: f64, osc_base: f64, osc_delta: f64) -> f64 {
    let price_pct = if price_base != 0.0 {
        (price_delta / price_base).abs() * 100.0
    } else {
        0.0
    };
    let osc_pct = if osc_base != 0.0 {
        (osc_delta / osc_base).abs() * 100.0
    } else {
        100.0
    };
    clamp_score(price_pct * 5.0 + osc_pct * 0.5)
}

fn anchor(price: &Pivot, oscillator: &Pivot) -> AnchorPoint {
    AnchorPoint {
        price_index: price.index,
        price: price.value,
        indicator_index: oscillator.index,
        indicator_value: oscillator.value,
    }
}
