//! Composite scoring engine.
//!
//! Turns one candle sequence into a [`Recommendation`]:
//! - Weighted sub-scores (trend, MACD, EMA cross, ADX, RSI, Bollinger)
//! - Recommendation class from the threshold table
//! - Entry quality, independent of the long-horizon score
//! - Independent risk warnings
//! - Signal status from (class, entry quality bucket, high warnings)
//! - ATR stop-loss levels

use super::indicators::IndicatorSet;
use super::{clamp_score, pct_diff};
use crate::config::ScoringConfig;
use crate::error::{EngineError, Result};
use crate::types::{
    Candle, CandleSeries, EntryQualityBucket, Recommendation, RecommendationClass,
    ScoreBreakdown, Series, Severity, SignalStatus, StopLoss, VolumeAnalysis, VolumeTrend,
    Warning,
};
use tracing::debug;

/// Candles needed before every weighted input is available (SMA 50).
pub const MIN_SCORING_CANDLES: usize = 50;

/// Candles inspected for a fresh EMA cross.
const CROSS_LOOKBACK: usize = 3;

/// Candles in each half of the volume trend comparison.
const VOLUME_TREND_WINDOW: usize = 5;

/// Indicator readings at one candle.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    close: f64,
    sma20: f64,
    sma50: f64,
    ema12: f64,
    ema20: f64,
    ema26: f64,
    ema50: f64,
    rsi: f64,
    macd_line: f64,
    histogram: f64,
    previous_histogram: Option<f64>,
    upper_band: f64,
    percent_b: f64,
    adx: f64,
    plus_di: f64,
    minus_di: f64,
    atr: f64,
    average_volume: f64,
}

/// Composite scoring engine.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }
}

impl ScoringEngine {
    /// Create an engine, rejecting invalid weights or thresholds.
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Minimum candles for a score.
    pub fn min_candles(&self) -> usize {
        MIN_SCORING_CANDLES.max(self.config.bollinger_period)
    }

    /// Score the final candle of a sequence.
    pub fn score(&self, candles: &[Candle]) -> Result<Recommendation> {
        CandleSeries::validate(candles)?;
        if candles.len() < self.min_candles() {
            return Err(EngineError::insufficient(
                "composite score",
                self.min_candles(),
                candles.len(),
            ));
        }

        let indicators = IndicatorSet::compute(candles, &self.config);
        self.score_at(candles, &indicators, candles.len() - 1)
    }

    /// Score candle `index` using indicators precomputed over `candles`.
    ///
    /// Only values at or before `index` are read, so the result equals
    /// scoring `&candles[..=index]` directly.
    pub fn score_at(
        &self,
        candles: &[Candle],
        indicators: &IndicatorSet,
        index: usize,
    ) -> Result<Recommendation> {
        indicators.ensure_aligned(candles)?;
        if index >= candles.len() {
            return Err(EngineError::InvalidInput(format!(
                "candle index {} out of range for {} candles",
                index,
                candles.len()
            )));
        }
        if index + 1 < self.min_candles() {
            return Err(EngineError::insufficient(
                "composite score",
                self.min_candles(),
                index + 1,
            ));
        }

        let snap = self.snapshot(candles, indicators, index)?;
        let candle = &candles[index];

        let breakdown = ScoreBreakdown {
            trend: Self::trend_score(&snap),
            macd: Self::macd_score(&snap),
            ema_cross: Self::ema_cross_score(&snap, indicators, index),
            adx: Self::adx_score(&snap),
            rsi: Self::rsi_score(snap.rsi),
            bollinger: Self::bollinger_score(snap.percent_b),
            volume: Self::volume_score(candles, &snap, index),
        };

        let w = &self.config.weights;
        let score = clamp_score(
            breakdown.trend * w.trend
                + breakdown.macd * w.macd
                + breakdown.ema_cross * w.ema_cross
                + breakdown.adx * w.adx
                + breakdown.rsi * w.rsi
                + breakdown.bollinger * w.bollinger,
        );
        let recommendation_class = self.config.thresholds.classify(score);

        let entry_quality = Self::entry_quality(candles, &snap, index);
        let entry_quality_bucket = self.bucket(entry_quality);

        let volume_analysis = Self::volume_analysis(candles, &snap, index);
        let warnings = self.warnings(candles, &snap, &volume_analysis, index);
        let has_high_warning = warnings.iter().any(|w| w.severity == Severity::High);

        let signal_status =
            Self::derive_status(recommendation_class, entry_quality_bucket, has_high_warning);

        debug!(
            "Scored candle {}: {:.1} ({}, {})",
            index,
            score,
            recommendation_class.label(),
            signal_status.label()
        );

        Ok(Recommendation {
            price: candle.close,
            timestamp: candle.timestamp,
            score,
            recommendation_class,
            signal_status,
            entry_quality,
            entry_quality_bucket,
            warnings,
            stop_loss: self.stop_loss(candle.close, snap.atr),
            breakdown,
            volume_analysis,
            rsi: snap.rsi,
            atr: snap.atr,
        })
    }

    /// Refine a class into a signal status.
    ///
    /// Bullish classes become an immediate buy only with a good entry and no
    /// high severity warning; otherwise they wait for a pullback. Neutral and
    /// bearish classes map straight through.
    pub fn derive_status(
        class: RecommendationClass,
        bucket: EntryQualityBucket,
        has_high_warning: bool,
    ) -> SignalStatus {
        match class {
            RecommendationClass::StrongBuy | RecommendationClass::Buy => {
                if has_high_warning || bucket == EntryQualityBucket::Low {
                    SignalStatus::WatchForPullback
                } else if bucket == EntryQualityBucket::High {
                    SignalStatus::StrongBuyNow
                } else {
                    SignalStatus::BuyPartial
                }
            }
            RecommendationClass::Hold => SignalStatus::Hold,
            RecommendationClass::Sell => SignalStatus::Sell,
            RecommendationClass::StrongSell => SignalStatus::StrongSell,
        }
    }

    /// Entry quality bucket under the configured cut-offs.
    pub fn bucket(&self, entry_quality: f64) -> EntryQualityBucket {
        if entry_quality >= self.config.entry_quality_high {
            EntryQualityBucket::High
        } else if entry_quality >= self.config.entry_quality_medium {
            EntryQualityBucket::Medium
        } else {
            EntryQualityBucket::Low
        }
    }

    fn snapshot(&self, candles: &[Candle], set: &IndicatorSet, index: usize) -> Result<Snapshot> {
        let required = self.min_candles();
        let read = |series: Option<&Series>, name: &str| -> Result<f64> {
            series.and_then(|s| s.get(index)).ok_or_else(|| {
                EngineError::insufficient(format!("{} at candle {}", name, index), required, index + 1)
            })
        };

        let macd = set.macd.as_ref();
        let bollinger = set.bollinger.as_ref();
        let adx = set.adx.as_ref();

        Ok(Snapshot {
            close: candles[index].close,
            sma20: read(set.sma20.as_ref(), "SMA 20")?,
            sma50: read(set.sma50.as_ref(), "SMA 50")?,
            ema12: read(set.ema12.as_ref(), "EMA 12")?,
            ema20: read(set.ema20.as_ref(), "EMA 20")?,
            ema26: read(set.ema26.as_ref(), "EMA 26")?,
            ema50: read(set.ema50.as_ref(), "EMA 50")?,
            rsi: read(set.rsi.as_ref(), "RSI")?,
            macd_line: read(macd.map(|m| &m.line), "MACD line")?,
            histogram: read(macd.map(|m| &m.histogram), "MACD histogram")?,
            previous_histogram: index
                .checked_sub(1)
                .and_then(|i| macd.and_then(|m| m.histogram.get(i))),
            upper_band: read(bollinger.map(|b| &b.upper), "Bollinger upper")?,
            percent_b: read(bollinger.map(|b| &b.percent_b), "Bollinger %B")?,
            adx: read(adx.map(|a| &a.adx), "ADX")?,
            plus_di: read(adx.map(|a| &a.plus_di), "+DI")?,
            minus_di: read(adx.map(|a| &a.minus_di), "-DI")?,
            atr: read(set.atr.as_ref(), "ATR")?,
            average_volume: read(set.volume_sma.as_ref(), "volume average")?,
        })
    }

    // =========================================================================
    // Sub-scores
    // =========================================================================

    /// Graded distance above the long averages, plus the 20/50 SMA stack.
    fn trend_score(s: &Snapshot) -> f64 {
        let graded = |ma: f64| 50.0 + (pct_diff(s.close, ma) * 10.0).clamp(-50.0, 50.0);
        let mut score = (graded(s.sma50) + graded(s.ema50)) / 2.0;

        if s.sma20 > s.sma50 {
            score += 10.0;
        } else if s.sma20 < s.sma50 {
            score -= 10.0;
        }

        clamp_score(score)
    }

    fn macd_score(s: &Snapshot) -> f64 {
        let mut score = 50.0;

        if s.histogram > 0.0 {
            score += 20.0;
        } else if s.histogram < 0.0 {
            score -= 20.0;
        }

        if let Some(previous) = s.previous_histogram {
            if s.histogram > previous {
                score += 15.0;
            } else if s.histogram < previous {
                score -= 15.0;
            }
        }

        if s.macd_line > 0.0 {
            score += 10.0;
        } else if s.macd_line < 0.0 {
            score -= 10.0;
        }

        clamp_score(score)
    }

    /// EMA 12 / EMA 26 spread, with a bonus for a cross in the last few candles.
    fn ema_cross_score(s: &Snapshot, set: &IndicatorSet, index: usize) -> f64 {
        let spread = pct_diff(s.ema12, s.ema26);
        let mut score = 50.0 + (spread * 25.0).clamp(-40.0, 40.0);

        let spread_at = |i: usize| -> Option<f64> {
            let fast = set.ema12.as_ref()?.get(i)?;
            let slow = set.ema26.as_ref()?.get(i)?;
            Some(fast - slow)
        };

        let current = s.ema12 - s.ema26;
        let crossed = (index.saturating_sub(CROSS_LOOKBACK)..index)
            .filter_map(spread_at)
            .any(|earlier| earlier.signum() != current.signum() && earlier != 0.0);
        if crossed {
            if current > 0.0 {
                score += 10.0;
            } else if current < 0.0 {
                score -= 10.0;
            }
        }

        clamp_score(score)
    }

    /// Trend strength signed by the dominant directional index.
    fn adx_score(s: &Snapshot) -> f64 {
        if s.adx < 20.0 {
            return 50.0;
        }
        let strength = (s.adx / 50.0).min(1.0) * 50.0;
        if s.plus_di > s.minus_di {
            clamp_score(50.0 + strength)
        } else if s.plus_di < s.minus_di {
            clamp_score(50.0 - strength)
        } else {
            50.0
        }
    }

    /// Rewards healthy momentum; overbought is penalised harder than oversold.
    fn rsi_score(rsi: f64) -> f64 {
        let score = if rsi > 70.0 {
            75.0 - (rsi - 70.0) * 2.5
        } else if rsi >= 50.0 {
            60.0 + (rsi - 50.0) * 0.75
        } else if rsi >= 30.0 {
            45.0 + (rsi - 30.0) * 0.75
        } else {
            45.0 - (30.0 - rsi) * 0.75
        };
        clamp_score(score)
    }

    /// Mean reversion within the bands: lower band 100, upper band 0.
    fn bollinger_score(percent_b: f64) -> f64 {
        clamp_score((1.0 - percent_b) * 100.0)
    }

    /// Informational: volume expansion signed by the candle's direction.
    fn volume_score(candles: &[Candle], s: &Snapshot, index: usize) -> f64 {
        let ratio = volume_ratio(candles[index].volume, s.average_volume);
        let up = index == 0 || candles[index].close >= candles[index - 1].close;
        let delta = ((ratio - 1.0) * 25.0).clamp(-25.0, 25.0);
        clamp_score(if up { 50.0 + delta } else { 50.0 - delta })
    }

    // =========================================================================
    // Entry quality
    // =========================================================================

    /// Short-horizon readiness to enter, independent of the total score.
    fn entry_quality(candles: &[Candle], s: &Snapshot, index: usize) -> f64 {
        let mut quality = 50.0;
        let trend_intact = s.close > s.ema50;

        // RSI zone: a reset from overbought is the best entry
        quality += if s.rsi > 70.0 {
            -20.0
        } else if s.rsi > 60.0 {
            0.0
        } else if s.rsi >= 40.0 {
            15.0
        } else if s.rsi >= 30.0 {
            10.0
        } else {
            -5.0
        };

        quality += if trend_intact { 10.0 } else { -10.0 };

        let from_ema20 = pct_diff(s.close, s.ema20);
        quality += if from_ema20.abs() <= 2.0 {
            10.0
        } else if from_ema20 > 5.0 {
            -15.0
        } else if from_ema20 > 2.0 {
            -5.0
        } else if trend_intact {
            5.0
        } else {
            -5.0
        };

        if s.percent_b > 1.0 {
            quality -= 15.0;
        } else if s.percent_b > 0.8 {
            quality -= 5.0;
        } else if s.percent_b < 0.2 && trend_intact {
            quality += 5.0;
        }

        if index >= 5 {
            let recent_move = pct_diff(s.close, candles[index - 5].close);
            if recent_move > 10.0 {
                quality -= 15.0;
            } else if recent_move > 5.0 {
                quality -= 8.0;
            } else if recent_move < -10.0 {
                quality -= 10.0;
            }
        }

        clamp_score(quality)
    }

    // =========================================================================
    // Volume, warnings, stops
    // =========================================================================

    fn volume_analysis(candles: &[Candle], s: &Snapshot, index: usize) -> VolumeAnalysis {
        let candle = &candles[index];
        let ratio = volume_ratio(candle.volume, s.average_volume);

        let trend = if index + 1 >= VOLUME_TREND_WINDOW * 2 {
            let mean = |from: usize, to: usize| {
                candles[from..to].iter().map(|c| c.volume).sum::<f64>() / (to - from) as f64
            };
            let recent = mean(index + 1 - VOLUME_TREND_WINDOW, index + 1);
            let prior = mean(
                index + 1 - VOLUME_TREND_WINDOW * 2,
                index + 1 - VOLUME_TREND_WINDOW,
            );
            if prior > 0.0 && recent > prior * 1.1 {
                VolumeTrend::Increasing
            } else if prior > 0.0 && recent < prior * 0.9 {
                VolumeTrend::Decreasing
            } else {
                VolumeTrend::Stable
            }
        } else {
            VolumeTrend::Stable
        };

        VolumeAnalysis {
            current_volume: candle.volume,
            average_volume: s.average_volume,
            ratio,
            trend,
            confirms_price: ratio >= 1.0 && candle.close != candle.open,
        }
    }

    fn warnings(
        &self,
        candles: &[Candle],
        s: &Snapshot,
        volume: &VolumeAnalysis,
        index: usize,
    ) -> Vec<Warning> {
        let mut warnings = Vec::new();

        if s.rsi > self.config.rsi_extreme_warning {
            warnings.push(Warning::new(
                Severity::High,
                format!("RSI extremely overbought at {:.1}", s.rsi),
            ));
        } else if s.rsi > 70.0 {
            warnings.push(Warning::new(
                Severity::Medium,
                format!("RSI overbought at {:.1}", s.rsi),
            ));
        } else if s.rsi < 25.0 {
            warnings.push(Warning::new(
                Severity::Medium,
                format!("RSI deeply oversold at {:.1}", s.rsi),
            ));
        }

        if index > 0 && s.atr > 0.0 {
            let move_in_atr = candles[index].true_range(&candles[index - 1]) / s.atr;
            let high = self.config.large_move_atr_multiple;
            if move_in_atr > high {
                warnings.push(Warning::new(
                    Severity::High,
                    format!("Unusually large candle: {:.1}x ATR", move_in_atr),
                ));
            } else if move_in_atr > high * 2.0 / 3.0 {
                warnings.push(Warning::new(
                    Severity::Medium,
                    format!("Large candle: {:.1}x ATR", move_in_atr),
                ));
            }
        }

        if s.close > s.upper_band {
            warnings.push(Warning::new(
                Severity::Medium,
                "Price closed above the upper Bollinger band",
            ));
        }

        let extension = pct_diff(s.close, s.sma50);
        if extension > 10.0 {
            warnings.push(Warning::new(
                Severity::Medium,
                format!("Price extended {:.1}% above SMA 50", extension),
            ));
        }

        if volume.ratio < 0.5 {
            warnings.push(Warning::new(
                Severity::Low,
                format!("Thin volume: {:.2}x average", volume.ratio),
            ));
        }

        if s.adx < 20.0 {
            warnings.push(Warning::new(
                Severity::Low,
                format!("Weak trend: ADX {:.1}", s.adx),
            ));
        }

        warnings.sort_by(|a, b| b.severity.cmp(&a.severity));
        warnings
    }

    fn stop_loss(&self, entry: f64, atr: f64) -> StopLoss {
        let multiplier = self.config.stop_loss_atr_multiplier;
        let distance = atr * multiplier;
        StopLoss {
            long: entry - distance,
            short: entry + distance,
            distance,
            distance_percent: if entry > 0.0 {
                distance / entry * 100.0
            } else {
                0.0
            },
            atr_multiplier: multiplier,
        }
    }
}

fn volume_ratio(volume: f64, average: f64) -> f64 {
    if average > 0.0 {
        volume / average
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn create_trend_candles(count: usize, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let wobble = (i as f64 * 0.7).sin() * 0.8;
                let base = 100.0 + i as f64 * step + wobble;
                Candle::new(
                    1_000_000 + i as i64 * 60_000,
                    base - step / 2.0,
                    base + 1.0,
                    base - 1.0,
                    base,
                    1000.0 + (i % 5) as f64 * 40.0,
                )
            })
            .collect()
    }

    fn create_wave_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.25).sin() * 8.0 + (i as f64 * 0.05).cos() * 5.0;
                Candle::new(
                    i as i64 * 60_000,
                    base - 0.3,
                    base + 1.2,
                    base - 1.2,
                    base,
                    800.0 + (i % 9) as f64 * 60.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_insufficient_history_is_an_error() {
        let engine = ScoringEngine::default();
        let err = engine.score(&create_trend_candles(49, 0.5)).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = ScoringConfig::default();
        config.weights.trend = 0.9;
        assert!(matches!(
            ScoringEngine::new(config),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_uptrend_scores_bullish() {
        let engine = ScoringEngine::default();
        let rec = engine.score(&create_trend_candles(120, 0.5)).unwrap();
        assert!((0.0..=100.0).contains(&rec.score));
        assert_eq!(rec.recommendation_class.direction(), Direction::Bullish);
        assert!(rec.breakdown.trend > 50.0);
        assert!(rec.breakdown.ema_cross > 50.0);
    }

    #[test]
    fn test_downtrend_scores_bearish() {
        let engine = ScoringEngine::default();
        let rec = engine.score(&create_trend_candles(120, -0.4)).unwrap();
        assert_eq!(rec.recommendation_class.direction(), Direction::Bearish);
        assert!(rec.breakdown.trend < 50.0);
    }

    #[test]
    fn test_score_at_matches_truncated_score() {
        let engine = ScoringEngine::default();
        let candles = create_wave_candles(150);
        let set = IndicatorSet::compute(&candles, engine.config());
        for index in [49, 80, 120, 149] {
            let sliced = engine.score(&candles[..=index]).unwrap();
            let precomputed = engine.score_at(&candles, &set, index).unwrap();
            assert_eq!(sliced, precomputed, "mismatch at {}", index);
        }
    }

    #[test]
    fn test_status_never_contradicts_class() {
        let engine = ScoringEngine::default();
        let candles = create_wave_candles(300);
        let set = IndicatorSet::compute(&candles, engine.config());
        for index in 49..candles.len() {
            let rec = engine.score_at(&candles, &set, index).unwrap();
            assert_eq!(
                rec.signal_status.direction(),
                rec.recommendation_class.direction(),
                "candle {}",
                index
            );
            assert!((0.0..=100.0).contains(&rec.score));
            assert!((0.0..=100.0).contains(&rec.entry_quality));
        }
    }

    #[test]
    fn test_status_table() {
        use EntryQualityBucket::*;
        use RecommendationClass as C;

        assert_eq!(ScoringEngine::derive_status(C::Buy, High, false), SignalStatus::StrongBuyNow);
        assert_eq!(ScoringEngine::derive_status(C::StrongBuy, Medium, false), SignalStatus::BuyPartial);
        assert_eq!(ScoringEngine::derive_status(C::Buy, Low, false), SignalStatus::WatchForPullback);
        assert_eq!(ScoringEngine::derive_status(C::StrongBuy, High, true), SignalStatus::WatchForPullback);
        assert_eq!(ScoringEngine::derive_status(C::Hold, High, false), SignalStatus::Hold);
        assert_eq!(ScoringEngine::derive_status(C::Sell, High, true), SignalStatus::Sell);
        assert_eq!(ScoringEngine::derive_status(C::StrongSell, Low, false), SignalStatus::StrongSell);
    }

    #[test]
    fn test_rsi_extremes_penalised_asymmetrically() {
        assert!(ScoringEngine::rsi_score(65.0) > ScoringEngine::rsi_score(85.0));
        assert!(ScoringEngine::rsi_score(35.0) > ScoringEngine::rsi_score(15.0));
        // 15 points past either edge costs more on the overbought side
        let overbought_drop = ScoringEngine::rsi_score(70.0) - ScoringEngine::rsi_score(85.0);
        let oversold_drop = ScoringEngine::rsi_score(30.0) - ScoringEngine::rsi_score(15.0);
        assert!(overbought_drop > oversold_drop);
    }

    #[test]
    fn test_stop_loss_is_two_atr() {
        let engine = ScoringEngine::default();
        let rec = engine.score(&create_trend_candles(80, 0.5)).unwrap();
        assert!((rec.stop_loss.long - (rec.price - 2.0 * rec.atr)).abs() < 1e-9);
        assert!((rec.stop_loss.short - (rec.price + 2.0 * rec.atr)).abs() < 1e-9);
        assert_eq!(rec.stop_loss.atr_multiplier, 2.0);
    }

    #[test]
    fn test_large_candle_raises_high_warning() {
        let engine = ScoringEngine::default();
        let mut candles = create_trend_candles(80, 0.2);
        let last = candles.len() - 1;
        let prev_close = candles[last - 1].close;
        candles[last] = Candle::new(
            candles[last].timestamp,
            prev_close,
            prev_close + 25.0,
            prev_close - 1.0,
            prev_close + 24.0,
            5000.0,
        );
        let rec = engine.score(&candles).unwrap();
        assert!(rec.has_high_severity_warning());
        assert_eq!(rec.warnings[0].severity, Severity::High);
        assert!(!rec.signal_status.is_immediate_buy());
    }

    #[test]
    fn test_warnings_sorted_by_severity() {
        let engine = ScoringEngine::default();
        let candles = create_wave_candles(300);
        let set = IndicatorSet::compute(&candles, engine.config());
        for index in 49..candles.len() {
            let rec = engine.score_at(&candles, &set, index).unwrap();
            assert!(rec
                .warnings
                .windows(2)
                .all(|w| w[0].severity >= w[1].severity));
        }
    }
}
