//! Breakout likelihood detection.
//!
//! Four independent checks, combined with fixed weights plus a bonus for
//! each additional finding:
//! - Volatility squeeze (compressed Bollinger bandwidth)
//! - Volume anomaly, including quiet accumulation
//! - Consolidation in a narrow range
//! - Active breakout from the prior range

use crate::config::BreakoutConfig;
use crate::error::{EngineError, Result};
use crate::services::signals::indicators::IndicatorSet;
use crate::services::signals::{clamp_score, pct_diff};
use crate::types::{
    BreakoutAnalysis, BreakoutFinding, BreakoutKind, Candle, CandleSeries, Direction,
};
use tracing::debug;

/// Bonus added to a volume confirmed active breakout.
const CONFIRMED_BREAKOUT_BONUS: f64 = 10.0;

/// Breakout detector.
#[derive(Debug, Clone, Default)]
pub struct BreakoutDetector {
    config: BreakoutConfig,
}

impl BreakoutDetector {
    pub fn new(config: BreakoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BreakoutConfig {
        &self.config
    }

    /// Candles needed for the consolidation and active breakout checks.
    pub fn min_candles(&self) -> usize {
        (self.config.consolidation_period + 1).max(self.config.volume_average_period + 1)
    }

    /// Run all four checks on the final candle.
    ///
    /// The squeeze check is skipped while the bandwidth history is too short.
    pub fn detect(&self, candles: &[Candle], indicators: &IndicatorSet) -> Result<BreakoutAnalysis> {
        CandleSeries::validate(candles)?;
        indicators.ensure_aligned(candles)?;
        if candles.len() < self.min_candles() {
            return Err(EngineError::insufficient(
                "breakout detection",
                self.min_candles(),
                candles.len(),
            ));
        }

        let findings: Vec<BreakoutFinding> = [
            self.squeeze(candles, indicators),
            self.volume(candles),
            self.consolidation(candles),
            self.active_breakout(candles),
        ]
        .into_iter()
        .flatten()
        .collect();

        let (breakout_score, direction) = self.combine(&findings);
        debug!(
            "Breakout scan: {} findings, score {:.1}",
            findings.len(),
            breakout_score
        );

        Ok(BreakoutAnalysis {
            findings,
            breakout_score,
            direction,
        })
    }

    fn weight(&self, kind: BreakoutKind) -> f64 {
        match kind {
            BreakoutKind::Squeeze => self.config.squeeze_weight,
            BreakoutKind::Volume => self.config.volume_weight,
            BreakoutKind::Consolidation => self.config.consolidation_weight,
            BreakoutKind::ActiveBreakout => self.config.active_weight,
        }
    }

    fn combine(&self, findings: &[BreakoutFinding]) -> (f64, Direction) {
        if findings.is_empty() {
            return (0.0, Direction::Neutral);
        }

        let weighted: f64 = findings.iter().map(|f| f.score * self.weight(f.kind)).sum();
        let mut score =
            clamp_score(weighted + self.config.multi_signal_bonus * (findings.len() - 1) as f64);

        let confirmed = findings
            .iter()
            .find(|f| f.kind == BreakoutKind::ActiveBreakout && f.confirmed == Some(true));
        if let Some(active) = confirmed {
            score = clamp_score(score.max(active.score) + CONFIRMED_BREAKOUT_BONUS);
            return (score, active.direction);
        }

        let bias: f64 = findings
            .iter()
            .map(|f| {
                let sign = match f.direction {
                    Direction::Bullish => 1.0,
                    Direction::Bearish => -1.0,
                    Direction::Neutral => 0.0,
                };
                sign * f.score * self.weight(f.kind)
            })
            .sum();
        let direction = if bias > 0.0 {
            Direction::Bullish
        } else if bias < 0.0 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        (score, direction)
    }

    // =========================================================================
    // Sub-detectors
    // =========================================================================

    fn squeeze(&self, candles: &[Candle], indicators: &IndicatorSet) -> Option<BreakoutFinding> {
        let bands = indicators.bollinger.as_ref()?;
        let last = candles.len() - 1;
        let period = self.config.bandwidth_average_period;

        let first = bands.bandwidth.first_available()?;
        if last < first + period {
            return None;
        }

        let current = bands.bandwidth.get(last)?;
        let average = bands.bandwidth.mean(last - period, last)?;
        if average <= 0.0 {
            return None;
        }
        let threshold = average * self.config.squeeze_ratio;
        if current >= threshold {
            return None;
        }

        let duration = (first..=last)
            .rev()
            .take_while(|&i| bands.bandwidth.get(i).is_some_and(|bw| bw < threshold))
            .count();
        let compression = 1.0 - current / average;
        let score = clamp_score(compression * 100.0 + (duration as f64 * 3.0).min(30.0));

        let close = candles[last].close;
        let direction = match bands.middle.get(last) {
            Some(middle) if close > middle => Direction::Bullish,
            Some(middle) if close < middle => Direction::Bearish,
            _ => Direction::Neutral,
        };

        Some(BreakoutFinding {
            kind: BreakoutKind::Squeeze,
            score,
            direction,
            rationale: format!(
                "Bandwidth {:.2}% is {:.0}% below its {}-candle average, compressed for {} candles",
                current,
                compression * 100.0,
                period,
                duration
            ),
            confirmed: None,
        })
    }

    fn volume(&self, candles: &[Candle]) -> Option<BreakoutFinding> {
        let last = candles.len() - 1;
        let period = self.config.volume_average_period;
        let average = mean_volume(&candles[last - period..last])?;
        let current = candles[last];
        let ratio = current.volume / average;

        if ratio >= self.config.volume_spike_ratio {
            let direction = if current.close > candles[last - 1].close {
                Direction::Bullish
            } else if current.close < candles[last - 1].close {
                Direction::Bearish
            } else {
                Direction::Neutral
            };
            return Some(BreakoutFinding {
                kind: BreakoutKind::Volume,
                score: clamp_score((ratio - 1.0) * 40.0),
                direction,
                rationale: format!("Volume spike: {:.1}x the {}-candle average", ratio, period),
                confirmed: None,
            });
        }

        // Accumulation: volume building while price holds a tight band
        let window = self.config.accumulation_window;
        if candles.len() < window + period {
            return None;
        }
        let recent = &candles[candles.len() - window..];
        let prior = &candles[candles.len() - window - period..candles.len() - window];
        let build = mean_volume(recent)? / mean_volume(prior)?;
        let (high, low) = range(recent);
        let band = if low > 0.0 { (high - low) / low * 100.0 } else { f64::INFINITY };

        if build >= self.config.accumulation_volume_ratio && band <= self.config.accumulation_band_pct {
            return Some(BreakoutFinding {
                kind: BreakoutKind::Volume,
                score: clamp_score(40.0 + (build - 1.0) * 50.0),
                direction: Direction::Neutral,
                rationale: format!(
                    "Accumulation: volume up {:.0}% over {} candles within a {:.1}% band",
                    (build - 1.0) * 100.0,
                    window,
                    band
                ),
                confirmed: None,
            });
        }

        None
    }

    fn consolidation(&self, candles: &[Candle]) -> Option<BreakoutFinding> {
        let period = self.config.consolidation_period;
        let recent = &candles[candles.len() - period..];
        let (high, low) = range(recent);
        if low <= 0.0 {
            return None;
        }
        let range_pct = (high - low) / low * 100.0;
        if range_pct > self.config.consolidation_max_range_pct {
            return None;
        }

        let close = candles[candles.len() - 1].close;
        let position = if high > low { (close - low) / (high - low) } else { 0.5 };
        let direction = if position > 0.7 {
            Direction::Bullish
        } else if position < 0.3 {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        Some(BreakoutFinding {
            kind: BreakoutKind::Consolidation,
            score: clamp_score(40.0 + (1.0 - range_pct / self.config.consolidation_max_range_pct) * 60.0),
            direction,
            rationale: format!(
                "Range of {:.1}% over {} candles, close at {:.0}% of range",
                range_pct,
                period,
                position * 100.0
            ),
            confirmed: None,
        })
    }

    fn active_breakout(&self, candles: &[Candle]) -> Option<BreakoutFinding> {
        let last = candles.len() - 1;
        let period = self.config.consolidation_period;
        let prior = &candles[last - period..last];
        let (high, low) = range(prior);
        if low <= 0.0 || (high - low) / low * 100.0 > self.config.breakout_base_max_range_pct {
            return None;
        }

        let current = candles[last];
        let (direction, beyond) = if current.close > high {
            (Direction::Bullish, pct_diff(current.close, high))
        } else if current.close < low {
            (Direction::Bearish, (low - current.close) / low * 100.0)
        } else {
            return None;
        };

        let volume_ratio = mean_volume(prior).map_or(0.0, |avg| current.volume / avg);
        let confirmed = volume_ratio >= self.config.breakout_volume_ratio;
        let score = if confirmed {
            70.0 + (beyond * 10.0).min(30.0)
        } else {
            40.0 + (beyond * 5.0).min(20.0)
        };

        Some(BreakoutFinding {
            kind: BreakoutKind::ActiveBreakout,
            score: clamp_score(score),
            direction,
            rationale: format!(
                "Closed {:.1}% {} the {}-candle range on {:.1}x volume ({})",
                beyond,
                if direction == Direction::Bullish { "above" } else { "below" },
                period,
                volume_ratio,
                if confirmed { "confirmed" } else { "unconfirmed" }
            ),
            confirmed: Some(confirmed),
        })
    }
}

fn mean_volume(candles: &[Candle]) -> Option<f64> {
    if candles.is_empty() {
        return None;
    }
    let mean = candles.iter().map(|c| c.volume).sum::<f64>() / candles.len() as f64;
    (mean > 0.0).then_some(mean)
}

/// Highest high and lowest low.
fn range(candles: &[Candle]) -> (f64, f64) {
    candles.iter().fold((f64::MIN, f64::MAX), |(high, low), c| {
        (high.max(c.high), low.min(c.low))
    })
}
