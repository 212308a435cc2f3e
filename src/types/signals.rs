use serde::{Deserialize, Serialize};

/// Category of a technical indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalCategory {
    Trend,
    Momentum,
    Volatility,
    Volume,
}

impl SignalCategory {
    /// Get display name for this category.
    pub fn name(&self) -> &'static str {
        match self {
            SignalCategory::Trend => "Trend",
            SignalCategory::Momentum => "Momentum",
            SignalCategory::Volatility => "Volatility",
            SignalCategory::Volume => "Volume",
        }
    }
}

/// Directional sign shared by classes, statuses and findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

/// Coarse recommendation derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationClass {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl RecommendationClass {
    pub fn direction(&self) -> Direction {
        match self {
            RecommendationClass::StrongBuy | RecommendationClass::Buy => Direction::Bullish,
            RecommendationClass::Hold => Direction::Neutral,
            RecommendationClass::Sell | RecommendationClass::StrongSell => Direction::Bearish,
        }
    }

    /// Get display label for this class.
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationClass::StrongBuy => "Strong Buy",
            RecommendationClass::Buy => "Buy",
            RecommendationClass::Hold => "Hold",
            RecommendationClass::Sell => "Sell",
            RecommendationClass::StrongSell => "Strong Sell",
        }
    }
}

/// Refined entry-timing verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    StrongBuyNow,
    BuyPartial,
    WatchForPullback,
    Hold,
    Sell,
    StrongSell,
}

impl SignalStatus {
    pub fn direction(&self) -> Direction {
        match self {
            SignalStatus::StrongBuyNow | SignalStatus::BuyPartial | SignalStatus::WatchForPullback => {
                Direction::Bullish
            }
            SignalStatus::Hold => Direction::Neutral,
            SignalStatus::Sell | SignalStatus::StrongSell => Direction::Bearish,
        }
    }

    /// Whether this status asks the consumer to enter immediately.
    pub fn is_immediate_buy(&self) -> bool {
        matches!(self, SignalStatus::StrongBuyNow | SignalStatus::BuyPartial)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignalStatus::StrongBuyNow => "Strong Buy Now",
            SignalStatus::BuyPartial => "Buy Partial",
            SignalStatus::WatchForPullback => "Watch For Pullback",
            SignalStatus::Hold => "Hold",
            SignalStatus::Sell => "Sell",
            SignalStatus::StrongSell => "Strong Sell",
        }
    }
}

/// Entry quality bucket used by the status table and backtest stratification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryQualityBucket {
    Low,
    Medium,
    High,
}

impl EntryQualityBucket {
    pub fn label(&self) -> &'static str {
        match self {
            EntryQualityBucket::Low => "Low",
            EntryQualityBucket::Medium => "Medium",
            EntryQualityBucket::High => "High",
        }
    }
}

/// Warning severity. Ordered so that `High` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Independent risk check attached to a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub severity: Severity,
    pub message: String,
}

impl Warning {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// ATR-based protective stop levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopLoss {
    /// Stop for a long position (entry - k * ATR).
    pub long: f64,
    /// Stop for a short position (entry + k * ATR).
    pub short: f64,
    /// Absolute distance from entry (k * ATR).
    pub distance: f64,
    /// Distance as a percentage of entry price.
    pub distance_percent: f64,
    /// ATR multiple used.
    pub atr_multiplier: f64,
}

/// Named sub-scores, each in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub trend: f64,
    pub macd: f64,
    pub ema_cross: f64,
    pub adx: f64,
    pub rsi: f64,
    pub bollinger: f64,
    /// Informational only, never weighted into the total.
    pub volume: f64,
}

/// Recent volume behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolumeTrend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAnalysis {
    pub current_volume: f64,
    pub average_volume: f64,
    /// Current volume divided by its trailing average.
    pub ratio: f64,
    pub trend: VolumeTrend,
    /// Volume expanding in the direction of the latest candle.
    pub confirms_price: bool,
}

/// Composite signal for one candle sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Close of the evaluated candle.
    pub price: f64,
    /// Timestamp of the evaluated candle.
    pub timestamp: i64,
    pub score: f64,
    pub recommendation_class: RecommendationClass,
    pub signal_status: SignalStatus,
    pub entry_quality: f64,
    pub entry_quality_bucket: EntryQualityBucket,
    /// Ordered by severity, highest first.
    pub warnings: Vec<Warning>,
    pub stop_loss: StopLoss,
    pub breakdown: ScoreBreakdown,
    pub volume_analysis: VolumeAnalysis,
    pub rsi: f64,
    pub atr: f64,
}

impl Recommendation {
    pub fn has_high_severity_warning(&self) -> bool {
        self.warnings.iter().any(|w| w.severity == Severity::High)
    }
}
