//! Multi-timeframe aggregation.
//!
//! Scores each resolution independently, then reduces the set into an
//! alignment verdict, a confidence level and a recommended action.

use crate::error::{EngineError, Result};
use crate::services::signals::ScoringEngine;
use crate::types::{
    AlignmentType, Candle, Confidence, ConsolidatedWarning, Direction, EntryQualityBucket,
    MultiTimeframeResult, RecommendationClass, Resolution, TimeframeAction,
    TimeframeRecommendation, UnavailableResolution,
};
use futures_util::future::join_all;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Majority margin, as a share of resolutions, for medium confidence.
const MEDIUM_CONFIDENCE_MARGIN: f64 = 0.5;

/// Multi-timeframe aggregator.
#[derive(Debug, Clone, Default)]
pub struct MultiTimeframeAggregator {
    scoring: ScoringEngine,
}

impl MultiTimeframeAggregator {
    pub fn new(scoring: ScoringEngine) -> Self {
        Self { scoring }
    }

    /// Score every resolution in turn and reduce.
    pub fn analyze(&self, series: &BTreeMap<Resolution, Vec<Candle>>) -> Result<MultiTimeframeResult> {
        if series.is_empty() {
            return Err(EngineError::InvalidInput("no resolutions supplied".to_string()));
        }

        let mut timeframes = Vec::new();
        let mut unavailable = Vec::new();
        for (resolution, candles) in series {
            self.collect(*resolution, self.scoring.score(candles), &mut timeframes, &mut unavailable)?;
        }

        self.reduce(timeframes, unavailable)
    }

    /// Score resolutions in parallel on the blocking pool, then reduce.
    pub async fn analyze_concurrent(
        &self,
        series: BTreeMap<Resolution, Vec<Candle>>,
    ) -> Result<MultiTimeframeResult> {
        if series.is_empty() {
            return Err(EngineError::InvalidInput("no resolutions supplied".to_string()));
        }

        let tasks = series.into_iter().map(|(resolution, candles)| {
            let scoring = self.scoring.clone();
            tokio::task::spawn_blocking(move || (resolution, scoring.score(&candles)))
        });

        let mut timeframes = Vec::new();
        let mut unavailable = Vec::new();
        for joined in join_all(tasks).await {
            let (resolution, scored) =
                joined.map_err(|e| EngineError::Task(format!("scoring task: {}", e)))?;
            self.collect(resolution, scored, &mut timeframes, &mut unavailable)?;
        }
        timeframes.sort_by_key(|t| t.resolution);
        unavailable.sort_by_key(|u| u.resolution);

        self.reduce(timeframes, unavailable)
    }

    /// Insufficient history marks a resolution unavailable; anything else aborts.
    fn collect(
        &self,
        resolution: Resolution,
        scored: Result<crate::types::Recommendation>,
        timeframes: &mut Vec<TimeframeRecommendation>,
        unavailable: &mut Vec<UnavailableResolution>,
    ) -> Result<()> {
        match scored {
            Ok(recommendation) => {
                debug!(
                    "{} scored {:.1} ({})",
                    resolution,
                    recommendation.score,
                    recommendation.recommendation_class.label()
                );
                timeframes.push(TimeframeRecommendation {
                    resolution,
                    recommendation,
                });
                Ok(())
            }
            Err(e) if e.is_insufficient_data() => {
                warn!("{} unavailable: {}", resolution, e);
                unavailable.push(UnavailableResolution {
                    resolution,
                    reason: e.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reduce per-resolution recommendations into one verdict.
    pub fn reduce(
        &self,
        timeframes: Vec<TimeframeRecommendation>,
        unavailable: Vec<UnavailableResolution>,
    ) -> Result<MultiTimeframeResult> {
        if timeframes.is_empty() {
            return Err(EngineError::insufficient(
                "multi-timeframe analysis",
                self.scoring.min_candles(),
                0,
            ));
        }

        let count = timeframes.len() as f64;
        let (alignment_type, confidence) = alignment(&timeframes);
        let average_score = timeframes.iter().map(|t| t.recommendation.score).sum::<f64>() / count;
        let average_entry_quality = timeframes
            .iter()
            .map(|t| t.recommendation.entry_quality)
            .sum::<f64>()
            / count;

        let (mut recommended_action, mut action_reason) =
            self.action(alignment_type, confidence, average_entry_quality);

        let flagged: Vec<Resolution> = timeframes
            .iter()
            .filter(|t| t.recommendation.has_high_severity_warning())
            .map(|t| t.resolution)
            .collect();
        if !flagged.is_empty() && recommended_action.is_immediate_buy() {
            recommended_action = TimeframeAction::WatchForPullback;
            action_reason = format!(
                "{}; downgraded by high severity warning on {}",
                action_reason,
                join_labels(&flagged)
            );
        }

        info!(
            "Multi-timeframe: {:?} ({:?}) across {} resolutions -> {:?}",
            alignment_type,
            confidence,
            timeframes.len(),
            recommended_action
        );

        Ok(MultiTimeframeResult {
            consolidated_warnings: consolidate_warnings(&timeframes),
            timeframes,
            unavailable,
            alignment_type,
            confidence,
            average_score,
            average_entry_quality,
            recommended_action,
            action_reason,
        })
    }

    fn action(
        &self,
        alignment: AlignmentType,
        confidence: Confidence,
        average_entry_quality: f64,
    ) -> (TimeframeAction, String) {
        let bucket = self.scoring.bucket(average_entry_quality);
        match alignment {
            AlignmentType::AllStrongBuy | AlignmentType::AllBullish => match bucket {
                EntryQualityBucket::High => (
                    TimeframeAction::BuyNow,
                    format!(
                        "All resolutions bullish with strong entry quality ({:.0})",
                        average_entry_quality
                    ),
                ),
                EntryQualityBucket::Medium => (
                    TimeframeAction::BuyPartial,
                    format!(
                        "All resolutions bullish, entry quality moderate ({:.0})",
                        average_entry_quality
                    ),
                ),
                EntryQualityBucket::Low => (
                    TimeframeAction::WatchForPullback,
                    format!(
                        "All resolutions bullish but entry quality poor ({:.0})",
                        average_entry_quality
                    ),
                ),
            },
            AlignmentType::MostlyBullish => {
                if confidence >= Confidence::Medium && bucket == EntryQualityBucket::High {
                    (
                        TimeframeAction::BuyPartial,
                        "Clear bullish majority with strong entry quality".to_string(),
                    )
                } else {
                    (
                        TimeframeAction::WatchForPullback,
                        "Bullish majority without full agreement".to_string(),
                    )
                }
            }
            AlignmentType::Conflicting => (
                TimeframeAction::Wait,
                "Resolutions disagree on direction".to_string(),
            ),
            AlignmentType::MostlyBearish => (
                TimeframeAction::ReduceExposure,
                "Bearish majority across resolutions".to_string(),
            ),
            AlignmentType::AllBearish | AlignmentType::AllStrongSell => (
                TimeframeAction::Sell,
                "All resolutions bearish".to_string(),
            ),
        }
    }
}

/// Alignment verdict and confidence from class directions.
fn alignment(timeframes: &[TimeframeRecommendation]) -> (AlignmentType, Confidence) {
    let classes: Vec<RecommendationClass> = timeframes
        .iter()
        .map(|t| t.recommendation.recommendation_class)
        .collect();
    let total = classes.len();
    let bullish = classes.iter().filter(|c| c.direction() == Direction::Bullish).count();
    let bearish = classes.iter().filter(|c| c.direction() == Direction::Bearish).count();

    if classes.iter().all(|c| *c == RecommendationClass::StrongBuy) {
        return (AlignmentType::AllStrongBuy, Confidence::VeryHigh);
    }
    if classes.iter().all(|c| *c == RecommendationClass::StrongSell) {
        return (AlignmentType::AllStrongSell, Confidence::VeryHigh);
    }
    if bullish == total {
        return (AlignmentType::AllBullish, Confidence::High);
    }
    if bearish == total {
        return (AlignmentType::AllBearish, Confidence::High);
    }

    let margin = bullish.abs_diff(bearish) as f64 / total as f64;
    let confidence = if margin >= MEDIUM_CONFIDENCE_MARGIN {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    // A side needs a strict majority of all resolutions, neutral ones included
    if bullish * 2 > total {
        (AlignmentType::MostlyBullish, confidence)
    } else if bearish * 2 > total {
        (AlignmentType::MostlyBearish, confidence)
    } else {
        (AlignmentType::Conflicting, Confidence::Low)
    }
}

/// Merge identical warnings, listing the resolutions that raised them.
fn consolidate_warnings(timeframes: &[TimeframeRecommendation]) -> Vec<ConsolidatedWarning> {
    let mut merged: Vec<ConsolidatedWarning> = Vec::new();
    for timeframe in timeframes {
        for warning in &timeframe.recommendation.warnings {
            match merged
                .iter_mut()
                .find(|m| m.severity == warning.severity && m.message == warning.message)
            {
                Some(existing) => existing.resolutions.push(timeframe.resolution),
                None => merged.push(ConsolidatedWarning {
                    severity: warning.severity,
                    message: warning.message.clone(),
                    resolutions: vec![timeframe.resolution],
                }),
            }
        }
    }
    merged.sort_by(|a, b| b.severity.cmp(&a.severity));
    merged
}

fn join_labels(resolutions: &[Resolution]) -> String {
    resolutions
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join(", ")
}
