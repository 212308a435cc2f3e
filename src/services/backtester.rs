//! Backtesting Engine
//!
//! Replays the composite scoring engine over history to measure how its
//! signals actually played out.
//! Features:
//! - Indicators computed once over the full series, scored per candle
//! - Trigger on class, status or minimum score
//! - Fixed hold period with cooldown between entries
//! - Intra-hold drawdown from the running peak
//! - Win rate, profit factor and expectancy
//! - Outcomes stratified by entry quality and RSI at entry

use crate::config::BacktestConfig;
use crate::error::{EngineError, Result};
use crate::services::signals::{IndicatorSet, ScoringEngine};
use crate::types::{
    BacktestRequest, BacktestResult, BacktestSignal, BacktestStats, BucketStats, Candle,
    CandleSeries, EntryQualityBucket, Recommendation,
};
use tracing::{debug, info};

/// Backtest simulator.
#[derive(Debug, Clone, Default)]
pub struct Backtester {
    scoring: ScoringEngine,
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(scoring: ScoringEngine, config: BacktestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { scoring, config })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run a backtest over `candles`.
    pub fn run(&self, candles: &[Candle], request: &BacktestRequest) -> Result<BacktestResult> {
        CandleSeries::validate(candles)?;
        if request.hold_period == 0 {
            return Err(EngineError::Configuration(
                "Hold period must be at least one candle".to_string(),
            ));
        }
        if request.cooldown == Some(0) {
            return Err(EngineError::Configuration(
                "Cooldown must be at least one candle".to_string(),
            ));
        }

        let warmup = self.scoring.min_candles();
        let required = warmup + request.hold_period;
        if candles.len() < required {
            return Err(EngineError::insufficient("backtest", required, candles.len()));
        }

        let (signals, skipped) = self.simulate(candles, request);
        let stats = self.calculate_stats(&signals, skipped);

        info!(
            "Backtest completed: {} trades over {} candles, {:.1}% win rate",
            stats.total_trades,
            candles.len(),
            stats.win_rate
        );

        Ok(BacktestResult {
            request: request.clone(),
            signals,
            stats,
        })
    }

    /// Walk the series, opening a trade whenever the trigger matches.
    fn simulate(&self, candles: &[Candle], request: &BacktestRequest) -> (Vec<BacktestSignal>, usize) {
        let indicators = IndicatorSet::compute(candles, self.scoring.config());
        let hold = request.hold_period;
        let cooldown = request.effective_cooldown();
        let last_entry = candles.len() - 1 - hold;

        let mut signals = Vec::new();
        let mut skipped = 0usize;
        let mut index = self.scoring.min_candles() - 1;

        while index <= last_entry {
            let recommendation = match self.scoring.score_at(candles, &indicators, index) {
                Ok(r) => r,
                Err(e) => {
                    debug!("Skipping candle {}: {}", index, e);
                    skipped += 1;
                    index += 1;
                    continue;
                }
            };

            if request.trigger.matches(&recommendation) {
                let signal = Self::record_trade(candles, index, hold, &recommendation);
                debug!(
                    "Entry at candle {} ({:.2}) -> {:.2}%",
                    index, signal.entry_price, signal.return_percent
                );
                signals.push(signal);
                index += cooldown;
            } else {
                index += 1;
            }
        }

        (signals, skipped)
    }

    fn record_trade(
        candles: &[Candle],
        entry_index: usize,
        hold: usize,
        recommendation: &Recommendation,
    ) -> BacktestSignal {
        let entry = candles[entry_index];
        let exit_price = candles[entry_index + hold].close;

        let mut peak = entry.close;
        let mut max_drawdown: f64 = 0.0;
        for candle in &candles[entry_index + 1..=entry_index + hold] {
            peak = peak.max(candle.close);
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - candle.close) / peak * 100.0);
            }
        }

        let return_percent = if entry.close > 0.0 {
            (exit_price - entry.close) / entry.close * 100.0
        } else {
            0.0
        };

        BacktestSignal {
            entry_index,
            entry_timestamp: entry.timestamp,
            entry_price: entry.close,
            exit_price,
            score_at_entry: recommendation.score,
            entry_quality_at_entry: recommendation.entry_quality,
            rsi_at_entry: recommendation.rsi,
            return_percent,
            max_drawdown_percent: max_drawdown,
            is_win: return_percent > 0.0,
        }
    }

    /// Calculate performance statistics.
    fn calculate_stats(&self, signals: &[BacktestSignal], skipped_windows: usize) -> BacktestStats {
        let total_trades = signals.len();
        let wins = signals.iter().filter(|s| s.is_win).count();
        let losses = total_trades - wins;
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };

        let gross_profit: f64 = signals
            .iter()
            .filter(|s| s.return_percent > 0.0)
            .map(|s| s.return_percent)
            .sum();
        let gross_loss: f64 = signals
            .iter()
            .filter(|s| s.return_percent < 0.0)
            .map(|s| s.return_percent.abs())
            .sum();
        let profit_factor = if total_trades == 0 {
            0.0
        } else if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else {
            f64::INFINITY
        };

        let average_return = mean(signals.iter().map(|s| s.return_percent));
        let average_win = if wins > 0 { gross_profit / wins as f64 } else { 0.0 };
        let average_loss = if losses > 0 {
            gross_loss / losses as f64
        } else {
            0.0
        };

        let best_return = signals
            .iter()
            .map(|s| s.return_percent)
            .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.max(r))))
            .unwrap_or(0.0);
        let worst_return = signals
            .iter()
            .map(|s| s.return_percent)
            .fold(None, |worst: Option<f64>, r| Some(worst.map_or(r, |w| w.min(r))))
            .unwrap_or(0.0);

        // Expectancy
        let expectancy = (win_rate / 100.0) * average_win - (1.0 - win_rate / 100.0) * average_loss;

        BacktestStats {
            total_trades,
            wins,
            losses,
            win_rate,
            average_return,
            average_win,
            average_loss,
            best_return,
            worst_return,
            profit_factor,
            expectancy,
            average_max_drawdown_percent: mean(signals.iter().map(|s| s.max_drawdown_percent)),
            by_entry_quality: self.by_entry_quality(signals),
            by_rsi: self.by_rsi(signals),
            skipped_windows,
        }
    }

    fn by_entry_quality(&self, signals: &[BacktestSignal]) -> Vec<BucketStats> {
        [
            EntryQualityBucket::High,
            EntryQualityBucket::Medium,
            EntryQualityBucket::Low,
        ]
        .into_iter()
        .map(|bucket| {
            let members: Vec<&BacktestSignal> = signals
                .iter()
                .filter(|s| self.scoring.bucket(s.entry_quality_at_entry) == bucket)
                .collect();
            bucket_stats(bucket.label(), &members)
        })
        .collect()
    }

    fn by_rsi(&self, signals: &[BacktestSignal]) -> Vec<BucketStats> {
        let edges = &self.config.rsi_bucket_edges;
        (0..=edges.len())
            .map(|i| {
                let lower = if i == 0 { None } else { Some(edges[i - 1]) };
                let upper = edges.get(i).copied();
                let label = match (lower, upper) {
                    (None, Some(u)) => format!("RSI < {}", u),
                    (Some(l), Some(u)) => format!("RSI {}-{}", l, u),
                    (Some(l), None) => format!("RSI >= {}", l),
                    (None, None) => "All".to_string(),
                };
                let members: Vec<&BacktestSignal> = signals
                    .iter()
                    .filter(|s| {
                        lower.map_or(true, |l| s.rsi_at_entry >= l)
                            && upper.map_or(true, |u| s.rsi_at_entry < u)
                    })
                    .collect();
                bucket_stats(&label, &members)
            })
            .collect()
    }
}

fn bucket_stats(label: &str, members: &[&BacktestSignal]) -> BucketStats {
    let trades = members.len();
    let wins = members.iter().filter(|s| s.is_win).count();
    BucketStats {
        label: label.to_string(),
        trades,
        win_rate: if trades > 0 {
            wins as f64 / trades as f64 * 100.0
        } else {
            0.0
        },
        average_return: mean(members.iter().map(|s| s.return_percent)),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}
