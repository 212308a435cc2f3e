use crate::error::{EngineError, Result};
use crate::types::{BacktestRequest, RecommendationClass, TriggerCondition};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Relative weights of the scored sub-components. Must sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreWeights {
    /// Long-term trend (price vs long moving averages).
    pub trend: f64,
    pub macd: f64,
    /// EMA(12) / EMA(26) cross.
    pub ema_cross: f64,
    pub adx: f64,
    pub rsi: f64,
    pub bollinger: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            trend: 0.30,
            macd: 0.20,
            ema_cross: 0.20,
            adx: 0.15,
            rsi: 0.10,
            bollinger: 0.05,
        }
    }
}

impl ScoreWeights {
    fn as_array(&self) -> [(&'static str, f64); 6] {
        [
            ("trend", self.trend),
            ("macd", self.macd),
            ("ema_cross", self.ema_cross),
            ("adx", self.adx),
            ("rsi", self.rsi),
            ("bollinger", self.bollinger),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        let mut total = 0.0;
        for (name, weight) in self.as_array() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(EngineError::Configuration(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, weight
                )));
            }
            total += weight;
        }
        if (total - 1.0).abs() > 1e-6 {
            return Err(EngineError::Configuration(format!(
                "score weights must sum to 1.0, got {:.4}",
                total
            )));
        }
        Ok(())
    }
}

/// Lower bounds of each recommendation class. Anything below `sell` is strong sell.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassThresholds {
    pub strong_buy: f64,
    pub buy: f64,
    pub hold: f64,
    pub sell: f64,
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            strong_buy: 60.0,
            buy: 50.0,
            hold: 40.0,
            sell: 30.0,
        }
    }
}

impl ClassThresholds {
    /// Map a score to its class. Non-decreasing in `score`.
    pub fn classify(&self, score: f64) -> RecommendationClass {
        if score >= self.strong_buy {
            RecommendationClass::StrongBuy
        } else if score >= self.buy {
            RecommendationClass::Buy
        } else if score >= self.hold {
            RecommendationClass::Hold
        } else if score >= self.sell {
            RecommendationClass::Sell
        } else {
            RecommendationClass::StrongSell
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ordered = [self.strong_buy, self.buy, self.hold, self.sell];
        if ordered.iter().any(|t| !t.is_finite() || *t < 0.0 || *t > 100.0) {
            return Err(EngineError::Configuration(
                "class thresholds must lie within [0, 100]".to_string(),
            ));
        }
        if ordered.windows(2).any(|w| w[0] <= w[1]) {
            return Err(EngineError::Configuration(format!(
                "class thresholds must be strictly descending, got {:?}",
                ordered
            )));
        }
        Ok(())
    }
}

/// Composite scoring configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    pub thresholds: ClassThresholds,
    /// Entry quality at or above this is the high bucket.
    pub entry_quality_high: f64,
    /// Entry quality at or above this is the medium bucket.
    pub entry_quality_medium: f64,
    /// Stop distance in ATRs.
    pub stop_loss_atr_multiplier: f64,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    /// RSI above this raises a high severity warning.
    pub rsi_extreme_warning: f64,
    /// Single candle range, in ATRs, that raises a high severity warning.
    pub large_move_atr_multiple: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            thresholds: ClassThresholds::default(),
            entry_quality_high: 65.0,
            entry_quality_medium: 45.0,
            stop_loss_atr_multiplier: 2.0,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            rsi_extreme_warning: 75.0,
            large_move_atr_multiple: 3.0,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        if !(0.0..=100.0).contains(&self.entry_quality_medium)
            || !(0.0..=100.0).contains(&self.entry_quality_high)
            || self.entry_quality_medium >= self.entry_quality_high
        {
            return Err(EngineError::Configuration(format!(
                "entry quality buckets must satisfy 0 <= medium ({}) < high ({}) <= 100",
                self.entry_quality_medium, self.entry_quality_high
            )));
        }
        positive("stop_loss_atr_multiplier", self.stop_loss_atr_multiplier)?;
        positive("bollinger_std_dev", self.bollinger_std_dev)?;
        positive("large_move_atr_multiple", self.large_move_atr_multiple)?;
        at_least("bollinger_period", self.bollinger_period, 2)?;
        if !(50.0..=100.0).contains(&self.rsi_extreme_warning) {
            return Err(EngineError::Configuration(format!(
                "rsi_extreme_warning must lie within [50, 100], got {}",
                self.rsi_extreme_warning
            )));
        }
        Ok(())
    }
}

/// Divergence detection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DivergenceConfig {
    /// Candles searched for pivots.
    pub lookback: usize,
    /// Pivot half-window.
    pub pivot_window: usize,
    /// Max index distance between a price pivot and its oscillator pivot.
    pub match_tolerance: usize,
    /// Findings at most this many candles old are active.
    pub recency_window: usize,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            lookback: 50,
            pivot_window: 3,
            match_tolerance: 3,
            recency_window: 10,
        }
    }
}

impl DivergenceConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("divergence.pivot_window", self.pivot_window, 1)?;
        at_least("divergence.lookback", self.lookback, 2 * self.pivot_window + 3)?;
        Ok(())
    }
}

/// Support/resistance and double formation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternConfig {
    pub lookback: usize,
    pub pivot_window: usize,
    /// Pivots within this percentage of a cluster's mean join it.
    pub level_tolerance_pct: f64,
    pub max_levels: usize,
    /// Max percentage difference between the two extremes of a formation.
    pub double_tolerance_pct: f64,
    /// Min candles between the two extremes of a formation.
    pub double_min_separation: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            lookback: 100,
            pivot_window: 3,
            level_tolerance_pct: 1.5,
            max_levels: 5,
            double_tolerance_pct: 3.0,
            double_min_separation: 5,
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("patterns.pivot_window", self.pivot_window, 1)?;
        at_least("patterns.lookback", self.lookback, 2 * self.pivot_window + 3)?;
        at_least("patterns.max_levels", self.max_levels, 1)?;
        at_least("patterns.double_min_separation", self.double_min_separation, 1)?;
        positive("patterns.level_tolerance_pct", self.level_tolerance_pct)?;
        positive("patterns.double_tolerance_pct", self.double_tolerance_pct)?;
        Ok(())
    }
}

/// Breakout detection configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakoutConfig {
    /// Squeeze when bandwidth is below this fraction of its trailing average.
    pub squeeze_ratio: f64,
    pub bandwidth_average_period: usize,
    pub volume_average_period: usize,
    pub volume_spike_ratio: f64,
    pub accumulation_window: usize,
    pub accumulation_volume_ratio: f64,
    /// Max high/low band, in percent, for accumulation.
    pub accumulation_band_pct: f64,
    pub consolidation_period: usize,
    pub consolidation_max_range_pct: f64,
    /// Max range, in percent, of the base a breakout leaves.
    pub breakout_base_max_range_pct: f64,
    /// Breakout volume / average volume needed to confirm.
    pub breakout_volume_ratio: f64,
    pub squeeze_weight: f64,
    pub volume_weight: f64,
    pub consolidation_weight: f64,
    pub active_weight: f64,
    /// Added per finding beyond the first.
    pub multi_signal_bonus: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            squeeze_ratio: 0.75,
            bandwidth_average_period: 50,
            volume_average_period: 20,
            volume_spike_ratio: 2.0,
            accumulation_window: 5,
            accumulation_volume_ratio: 1.3,
            accumulation_band_pct: 3.0,
            consolidation_period: 20,
            consolidation_max_range_pct: 5.0,
            breakout_base_max_range_pct: 8.0,
            breakout_volume_ratio: 1.5,
            squeeze_weight: 0.30,
            volume_weight: 0.25,
            consolidation_weight: 0.25,
            active_weight: 0.20,
            multi_signal_bonus: 10.0,
        }
    }
}

impl BreakoutConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.squeeze_ratio > 0.0 && self.squeeze_ratio < 1.0) {
            return Err(EngineError::Configuration(format!(
                "breakout.squeeze_ratio must lie within (0, 1), got {}",
                self.squeeze_ratio
            )));
        }
        at_least("breakout.bandwidth_average_period", self.bandwidth_average_period, 2)?;
        at_least("breakout.volume_average_period", self.volume_average_period, 2)?;
        at_least("breakout.accumulation_window", self.accumulation_window, 2)?;
        at_least("breakout.consolidation_period", self.consolidation_period, 3)?;
        positive("breakout.volume_spike_ratio", self.volume_spike_ratio)?;
        positive("breakout.accumulation_volume_ratio", self.accumulation_volume_ratio)?;
        positive("breakout.accumulation_band_pct", self.accumulation_band_pct)?;
        positive("breakout.consolidation_max_range_pct", self.consolidation_max_range_pct)?;
        positive("breakout.breakout_base_max_range_pct", self.breakout_base_max_range_pct)?;
        positive("breakout.breakout_volume_ratio", self.breakout_volume_ratio)?;
        let weights = [
            self.squeeze_weight,
            self.volume_weight,
            self.consolidation_weight,
            self.active_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(EngineError::Configuration(
                "breakout detector weights must be non-negative".to_string(),
            ));
        }
        if (weights.iter().sum::<f64>() - 1.0).abs() > 1e-6 {
            return Err(EngineError::Configuration(
                "breakout detector weights must sum to 1.0".to_string(),
            ));
        }
        if !self.multi_signal_bonus.is_finite() || self.multi_signal_bonus < 0.0 {
            return Err(EngineError::Configuration(
                "breakout.multi_signal_bonus must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Backtest defaults and stratification edges.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub hold_period: usize,
    /// Defaults to the hold period when unset.
    pub cooldown: Option<usize>,
    /// Ascending RSI bucket edges; produces `edges.len() + 1` buckets.
    pub rsi_bucket_edges: Vec<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            hold_period: 10,
            cooldown: None,
            rsi_bucket_edges: vec![30.0, 50.0, 70.0],
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<()> {
        at_least("backtest.hold_period", self.hold_period, 1)?;
        if let Some(cooldown) = self.cooldown {
            at_least("backtest.cooldown", cooldown, 1)?;
        }
        if self.rsi_bucket_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(EngineError::Configuration(
                "backtest.rsi_bucket_edges must be strictly ascending".to_string(),
            ));
        }
        Ok(())
    }

    /// Request using these defaults.
    pub fn request(&self, trigger: TriggerCondition) -> BacktestRequest {
        BacktestRequest {
            trigger,
            hold_period: self.hold_period,
            cooldown: self.cooldown,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub divergence: DivergenceConfig,
    pub patterns: PatternConfig,
    pub breakout: BreakoutConfig,
    pub backtest: BacktestConfig,
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            scoring: ScoringConfig {
                thresholds: ClassThresholds {
                    strong_buy: env_or("SCORE_STRONG_BUY", d.scoring.thresholds.strong_buy),
                    buy: env_or("SCORE_BUY", d.scoring.thresholds.buy),
                    hold: env_or("SCORE_HOLD", d.scoring.thresholds.hold),
                    sell: env_or("SCORE_SELL", d.scoring.thresholds.sell),
                },
                stop_loss_atr_multiplier: env_or(
                    "STOP_LOSS_ATR_MULTIPLIER",
                    d.scoring.stop_loss_atr_multiplier,
                ),
                bollinger_period: env_or("BOLLINGER_PERIOD", d.scoring.bollinger_period),
                bollinger_std_dev: env_or("BOLLINGER_STD_DEV", d.scoring.bollinger_std_dev),
                ..d.scoring
            },
            divergence: DivergenceConfig {
                lookback: env_or("DIVERGENCE_LOOKBACK", d.divergence.lookback),
                pivot_window: env_or("DIVERGENCE_PIVOT_WINDOW", d.divergence.pivot_window),
                match_tolerance: env_or("DIVERGENCE_MATCH_TOLERANCE", d.divergence.match_tolerance),
                recency_window: env_or("DIVERGENCE_RECENCY_WINDOW", d.divergence.recency_window),
            },
            patterns: PatternConfig {
                lookback: env_or("PATTERN_LOOKBACK", d.patterns.lookback),
                pivot_window: env_or("PATTERN_PIVOT_WINDOW", d.patterns.pivot_window),
                level_tolerance_pct: env_or("LEVEL_TOLERANCE_PCT", d.patterns.level_tolerance_pct),
                double_tolerance_pct: env_or(
                    "DOUBLE_FORMATION_TOLERANCE_PCT",
                    d.patterns.double_tolerance_pct,
                ),
                double_min_separation: env_or(
                    "DOUBLE_FORMATION_MIN_SEPARATION",
                    d.patterns.double_min_separation,
                ),
                ..d.patterns
            },
            breakout: BreakoutConfig {
                squeeze_ratio: env_or("SQUEEZE_RATIO", d.breakout.squeeze_ratio),
                consolidation_period: env_or(
                    "CONSOLIDATION_PERIOD",
                    d.breakout.consolidation_period,
                ),
                breakout_volume_ratio: env_or(
                    "BREAKOUT_VOLUME_RATIO",
                    d.breakout.breakout_volume_ratio,
                ),
                ..d.breakout
            },
            backtest: BacktestConfig {
                hold_period: env_or("BACKTEST_HOLD", d.backtest.hold_period),
                cooldown: env::var("BACKTEST_COOLDOWN").ok().and_then(|v| v.parse().ok()),
                ..d.backtest
            },
        }
    }

    /// Reject out-of-range weights, thresholds and window sizes.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.divergence.validate()?;
        self.patterns.validate()?;
        self.breakout.validate()?;
        self.backtest.validate()?;
        Ok(())
    }
}

/// Command line application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub engine: EngineConfig,
    /// Directory holding `{symbol}_{resolution}.json` candle files.
    pub data_dir: PathBuf,
    /// Use a synthetic random walk instead of files.
    pub demo: bool,
    pub demo_seed: u64,
    /// Candles requested per resolution.
    pub candle_count: usize,
    pub backtest_trigger: TriggerCondition,
    /// Resolutions analysed by the multi-timeframe command.
    pub resolutions: Vec<crate::types::Resolution>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let resolutions = env::var("MTF_RESOLUTIONS")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|r| crate::types::Resolution::from_str(r.trim()))
                    .collect::<Vec<_>>()
            })
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| {
                use crate::types::Resolution;
                vec![Resolution::OneHour, Resolution::FourHours, Resolution::OneDay]
            });

        Self {
            engine: EngineConfig::from_env(),
            data_dir: env::var("WRAITH_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            demo: env::var("WRAITH_DEMO")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            demo_seed: env_or("WRAITH_DEMO_SEED", 42),
            candle_count: env_or("CANDLE_COUNT", 500),
            backtest_trigger: env::var("BACKTEST_TRIGGER")
                .ok()
                .and_then(|v| TriggerCondition::from_str(&v))
                .unwrap_or(TriggerCondition::Class(RecommendationClass::StrongBuy)),
            resolutions,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::Configuration(format!(
            "{} must be positive, got {}",
            name, value
        )))
    }
}

fn at_least(name: &str, value: usize, min: usize) -> Result<()> {
    if value >= min {
        Ok(())
    } else {
        Err(EngineError::Configuration(format!(
            "{} must be at least {}, got {}",
            name, min, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoreWeights::default();
        let total = w.trend + w.macd + w.ema_cross + w.adx + w.rsi + w.bollinger;
        assert!((total - 1.0).abs() < 1e-9);
    }

    // =========================================================================
    // Threshold table
    // =========================================================================

    #[test]
    fn test_classify_boundaries() {
        let t = ClassThresholds::default();
        assert_eq!(t.classify(100.0), RecommendationClass::StrongBuy);
        assert_eq!(t.classify(60.0), RecommendationClass::StrongBuy);
        assert_eq!(t.classify(59.99), RecommendationClass::Buy);
        assert_eq!(t.classify(50.0), RecommendationClass::Buy);
        assert_eq!(t.classify(45.0), RecommendationClass::Hold);
        assert_eq!(t.classify(30.0), RecommendationClass::Sell);
        assert_eq!(t.classify(0.0), RecommendationClass::StrongSell);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let t = ClassThresholds::default();
        let mut previous = t.classify(0.0);
        for i in 0..=1000 {
            let class = t.classify(i as f64 / 10.0);
            assert!(class >= previous);
            previous = class;
        }
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let mut config = EngineConfig::default();
        config.scoring.weights.trend = 0.5;
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = EngineConfig::default();
        config.scoring.weights.trend = -0.1;
        config.scoring.weights.macd = 0.6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = EngineConfig::default();
        config.scoring.thresholds.buy = 70.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_windows() {
        let mut config = EngineConfig::default();
        config.divergence.pivot_window = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.backtest.hold_period = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_squeeze_ratio() {
        let mut config = EngineConfig::default();
        config.breakout.squeeze_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backtest_request_uses_defaults() {
        let config = BacktestConfig::default();
        let request = config.request(TriggerCondition::MinScore(55.0));
        assert_eq!(request.hold_period, 10);
        assert_eq!(request.effective_cooldown(), 10);
    }
}
