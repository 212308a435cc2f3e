//! Support/resistance clustering and double top/bottom formations.

use crate::config::PatternConfig;
use crate::error::{EngineError, Result};
use crate::services::signals::{clamp_score, find_pivots, pct_diff, Pivots};
use crate::types::{
    Candle, CandleSeries, DoubleFormation, FormationKind, FormationPoint, Level, PatternAnalysis,
    Pivot,
};
use tracing::debug;

/// Pivots grouped by price proximity.
#[derive(Debug, Clone)]
struct Cluster {
    sum: f64,
    touches: usize,
    last_touch_index: usize,
}

impl Cluster {
    fn mean(&self) -> f64 {
        self.sum / self.touches as f64
    }
}

/// Support/resistance and double formation detector.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PatternConfig {
        &self.config
    }

    pub fn min_candles(&self) -> usize {
        2 * self.config.pivot_window + 1
    }

    /// Detect levels and the most recent double bottom and double top.
    pub fn detect(&self, candles: &[Candle]) -> Result<PatternAnalysis> {
        CandleSeries::validate(candles)?;
        if candles.len() < self.min_candles() {
            return Err(EngineError::insufficient(
                "pattern detection",
                self.min_candles(),
                candles.len(),
            ));
        }

        let start = candles.len().saturating_sub(self.config.lookback);
        let window = &candles[start..];
        let highs: Vec<f64> = window.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = window.iter().map(|c| c.low).collect();

        let pivots = Pivots {
            highs: find_pivots(&highs, self.config.pivot_window).highs,
            lows: find_pivots(&lows, self.config.pivot_window).lows,
        }
        .shifted(start);

        let (support, resistance) = self.levels(candles, &pivots, start);
        let double_bottom = self.double_formation(candles, &pivots, FormationKind::DoubleBottom);
        let double_top = self.double_formation(candles, &pivots, FormationKind::DoubleTop);

        debug!(
            "Patterns: {} support, {} resistance, double bottom={}, double top={}",
            support.len(),
            resistance.len(),
            double_bottom.is_some(),
            double_top.is_some()
        );

        Ok(PatternAnalysis {
            support,
            resistance,
            double_bottom,
            double_top,
        })
    }

    /// Cluster every pivot by price, then split around the current close.
    fn levels(&self, candles: &[Candle], pivots: &Pivots, start: usize) -> (Vec<Level>, Vec<Level>) {
        let mut touches: Vec<&Pivot> = pivots.highs.iter().chain(pivots.lows.iter()).collect();
        touches.sort_by_key(|p| p.index);

        let mut clusters: Vec<Cluster> = Vec::new();
        for pivot in touches {
            let joined = clusters.iter_mut().find(|c| {
                pct_diff(pivot.value, c.mean()).abs() <= self.config.level_tolerance_pct
            });
            match joined {
                Some(cluster) => {
                    cluster.sum += pivot.value;
                    cluster.touches += 1;
                    cluster.last_touch_index = cluster.last_touch_index.max(pivot.index);
                }
                None => clusters.push(Cluster {
                    sum: pivot.value,
                    touches: 1,
                    last_touch_index: pivot.index,
                }),
            }
        }

        let last = candles.len() - 1;
        let close = candles[last].close;
        let span = (candles.len() - start).max(1) as f64;

        let mut support = Vec::new();
        let mut resistance = Vec::new();
        for cluster in clusters {
            let price = cluster.mean();
            let age = (last - cluster.last_touch_index) as f64;
            let level = Level {
                price,
                touches: cluster.touches,
                strength: clamp_score(
                    cluster.touches as f64 * 20.0 + 30.0 * (1.0 - age / span).max(0.0),
                ),
                distance_percent: pct_diff(price, close),
                last_touch_index: cluster.last_touch_index,
            };
            if price < close {
                support.push(level);
            } else if price > close {
                resistance.push(level);
            }
        }

        for side in [&mut support, &mut resistance] {
            side.sort_by(|a, b| a.distance_percent.abs().total_cmp(&b.distance_percent.abs()));
            side.truncate(self.config.max_levels);
        }

        (support, resistance)
    }

    /// Most recent pair of comparable extremes with an opposite pivot between.
    fn double_formation(
        &self,
        candles: &[Candle],
        pivots: &Pivots,
        kind: FormationKind,
    ) -> Option<DoubleFormation> {
        let (extremes, opposite) = match kind {
            FormationKind::DoubleBottom => (&pivots.lows, &pivots.highs),
            FormationKind::DoubleTop => (&pivots.highs, &pivots.lows),
        };

        for pair in extremes.windows(2).rev() {
            let (first, second) = (&pair[0], &pair[1]);
            if second.index - first.index < self.config.double_min_separation {
                continue;
            }

            let average = (first.value + second.value) / 2.0;
            if average <= 0.0 {
                continue;
            }
            let difference_pct = (first.value - second.value).abs() / average * 100.0;
            if difference_pct > self.config.double_tolerance_pct {
                continue;
            }

            let between = opposite
                .iter()
                .filter(|p| p.index > first.index && p.index < second.index);
            let neckline = match kind {
                FormationKind::DoubleBottom => between.max_by(|a, b| a.value.total_cmp(&b.value)),
                FormationKind::DoubleTop => between.min_by(|a, b| a.value.total_cmp(&b.value)),
            };
            let Some(neckline) = neckline else {
                continue;
            };

            let after = &candles[second.index + 1..];
            let (height, target_price, confirmed) = match kind {
                FormationKind::DoubleBottom => {
                    let height = neckline.value - average;
                    (
                        height,
                        neckline.value + height,
                        after.iter().any(|c| c.close > neckline.value),
                    )
                }
                FormationKind::DoubleTop => {
                    let height = average - neckline.value;
                    (
                        height,
                        neckline.value - height,
                        after.iter().any(|c| c.close < neckline.value),
                    )
                }
            };
            if height <= 0.0 {
                continue;
            }

            let close = candles[candles.len() - 1].close;
            let similarity = 1.0 - difference_pct / self.config.double_tolerance_pct;
            let depth = (height / average * 100.0).min(10.0) * 2.0;
            let strength =
                clamp_score(40.0 + similarity * 20.0 + depth + if confirmed { 20.0 } else { 0.0 });

            return Some(DoubleFormation {
                kind,
                first: point(candles, first),
                second: point(candles, second),
                neckline: neckline.value,
                neckline_index: neckline.index,
                target_price,
                target_percent: pct_diff(target_price, close),
                strength,
                confirmed,
            });
        }

        None
    }
}

fn point(candles: &[Candle], pivot: &Pivot) -> FormationPoint {
    FormationPoint {
        index: pivot.index,
        timestamp: candles[pivot.index].timestamp,
        price: pivot.value,
    }
}
