//! Signal engine facade.
//!
//! One entry point per external operation. Every call is a pure function of
//! its input candles and the configuration fixed at construction.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::services::backtester::Backtester;
use crate::services::multi_timeframe::MultiTimeframeAggregator;
use crate::services::patterns::{BreakoutDetector, DivergenceDetector, PatternDetector};
use crate::services::signals::{IndicatorSet, ScoringEngine};
use crate::types::{
    BacktestRequest, BacktestResult, BreakoutAnalysis, Candle, CandleSeries, DivergenceAnalysis,
    MultiTimeframeResult, PatternAnalysis, Recommendation, Resolution, TriggerCondition,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Score plus every detector for one candle sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalReport {
    pub recommendation: Recommendation,
    pub divergence: DivergenceAnalysis,
    pub patterns: PatternAnalysis,
    pub breakout: BreakoutAnalysis,
}

/// Signal generation and validation engine.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    config: EngineConfig,
    scoring: ScoringEngine,
    divergence: DivergenceDetector,
    patterns: PatternDetector,
    breakout: BreakoutDetector,
    backtester: Backtester,
    multi_timeframe: MultiTimeframeAggregator,
}

impl SignalEngine {
    /// Build an engine, rejecting invalid configuration up front.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let scoring = ScoringEngine::new(config.scoring.clone())?;

        info!("Signal engine ready (min {} candles)", scoring.min_candles());

        Ok(Self {
            divergence: DivergenceDetector::new(config.divergence.clone())?,
            patterns: PatternDetector::new(config.patterns.clone())?,
            breakout: BreakoutDetector::new(config.breakout.clone())?,
            backtester: Backtester::new(scoring.clone(), config.backtest.clone())?,
            multi_timeframe: MultiTimeframeAggregator::new(scoring.clone()),
            scoring,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Candles needed for a score.
    pub fn min_candles(&self) -> usize {
        self.scoring.min_candles()
    }

    pub fn score(&self, candles: &[Candle]) -> Result<Recommendation> {
        self.scoring.score(candles)
    }

    pub fn detect_divergence(&self, candles: &[Candle]) -> Result<DivergenceAnalysis> {
        CandleSeries::validate(candles)?;
        let indicators = IndicatorSet::compute(candles, &self.config.scoring);
        self.divergence.detect(candles, &indicators)
    }

    pub fn detect_patterns(&self, candles: &[Candle]) -> Result<PatternAnalysis> {
        self.patterns.detect(candles)
    }

    pub fn detect_breakout(&self, candles: &[Candle]) -> Result<BreakoutAnalysis> {
        CandleSeries::validate(candles)?;
        let indicators = IndicatorSet::compute(candles, &self.config.scoring);
        self.breakout.detect(candles, &indicators)
    }

    /// Score and run every detector, computing indicators once.
    pub fn analyze(&self, candles: &[Candle]) -> Result<SignalReport> {
        CandleSeries::validate(candles)?;
        let indicators = IndicatorSet::compute(candles, &self.config.scoring);

        Ok(SignalReport {
            recommendation: self.scoring.score_at(candles, &indicators, candles.len() - 1)?,
            divergence: self.divergence.detect(candles, &indicators)?,
            patterns: self.patterns.detect(candles)?,
            breakout: self.breakout.detect(candles, &indicators)?,
        })
    }

    /// Backtest a trigger with the configured cooldown.
    pub fn backtest(
        &self,
        candles: &[Candle],
        trigger: TriggerCondition,
        hold_period: usize,
    ) -> Result<BacktestResult> {
        let request = BacktestRequest {
            hold_period,
            ..self.config.backtest.request(trigger)
        };
        self.backtester.run(candles, &request)
    }

    pub fn backtest_with(&self, candles: &[Candle], request: &BacktestRequest) -> Result<BacktestResult> {
        self.backtester.run(candles, request)
    }

    pub fn analyze_multi_timeframe(
        &self,
        series: &BTreeMap<Resolution, Vec<Candle>>,
    ) -> Result<MultiTimeframeResult> {
        self.multi_timeframe.analyze(series)
    }

    pub async fn analyze_multi_timeframe_concurrent(
        &self,
        series: BTreeMap<Resolution, Vec<Candle>>,
    ) -> Result<MultiTimeframeResult> {
        self.multi_timeframe.analyze_concurrent(series).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn create_uptrend_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.4 + (i as f64 * 0.6).sin();
                Candle::new(
                    1_000_000 + i as i64 * 3_600_000,
                    base - 0.2,
                    base + 1.0,
                    base - 1.0,
                    base,
                    1000.0 + (i % 4) as f64 * 100.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.scoring.thresholds.buy = 70.0;
        assert!(matches!(
            SignalEngine::new(config),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_analyze_matches_individual_operations() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let candles = create_uptrend_candles(150);
        let report = engine.analyze(&candles).unwrap();

        assert_eq!(report.recommendation, engine.score(&candles).unwrap());
        assert_eq!(report.divergence, engine.detect_divergence(&candles).unwrap());
        assert_eq!(report.patterns, engine.detect_patterns(&candles).unwrap());
        assert_eq!(report.breakout, engine.detect_breakout(&candles).unwrap());
    }

    #[test]
    fn test_invalid_candles_rejected_before_computation() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let mut candles = create_uptrend_candles(80);
        candles[40].timestamp = candles[39].timestamp;
        assert!(matches!(
            engine.detect_breakout(&candles),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(matches!(engine.score(&candles), Err(EngineError::InvalidInput(_))));
    }
}
