use super::signals::{Recommendation, RecommendationClass, SignalStatus};
use serde::{Deserialize, Serialize};

/// Condition a recommendation must meet to open a simulated trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerCondition {
    /// Exact recommendation class.
    Class(RecommendationClass),
    /// Exact signal status.
    Status(SignalStatus),
    /// Score at or above the given value.
    MinScore(f64),
}

impl TriggerCondition {
    pub fn matches(&self, recommendation: &Recommendation) -> bool {
        match self {
            TriggerCondition::Class(class) => recommendation.recommendation_class == *class,
            TriggerCondition::Status(status) => recommendation.signal_status == *status,
            TriggerCondition::MinScore(min) => recommendation.score >= *min,
        }
    }

    /// Parse `class:STRONG_BUY`, `status:BUY_PARTIAL` or `score:55`.
    pub fn from_str(s: &str) -> Option<Self> {
        let (kind, value) = s.split_once(':')?;
        let quoted = format!("\"{}\"", value.trim().to_uppercase());
        match kind.trim().to_lowercase().as_str() {
            "class" => serde_json::from_str(&quoted).ok().map(TriggerCondition::Class),
            "status" => serde_json::from_str(&quoted).ok().map(TriggerCondition::Status),
            "score" | "min_score" => value.trim().parse().ok().map(TriggerCondition::MinScore),
            _ => None,
        }
    }
}

/// Parameters for one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub trigger: TriggerCondition,
    /// Candles held before exit.
    pub hold_period: usize,
    /// Candles skipped after an entry. Defaults to the hold period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<usize>,
}

impl BacktestRequest {
    pub fn new(trigger: TriggerCondition, hold_period: usize) -> Self {
        Self {
            trigger,
            hold_period,
            cooldown: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: usize) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn effective_cooldown(&self) -> usize {
        self.cooldown.unwrap_or(self.hold_period)
    }
}

/// One simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestSignal {
    pub entry_index: usize,
    pub entry_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub score_at_entry: f64,
    pub entry_quality_at_entry: f64,
    pub rsi_at_entry: f64,
    pub return_percent: f64,
    /// Largest decline from the running peak while held, in percent.
    pub max_drawdown_percent: f64,
    pub is_win: bool,
}

/// Outcome statistics for a subset of trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStats {
    pub label: String,
    pub trades: usize,
    pub win_rate: f64,
    pub average_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestStats {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage, 0-100.
    pub win_rate: f64,
    pub average_return: f64,
    pub average_win: f64,
    /// Reported as a positive magnitude.
    pub average_loss: f64,
    pub best_return: f64,
    pub worst_return: f64,
    /// Gross wins / gross losses. Infinite when there are no losses,
    /// written as `"Infinity"` in JSON.
    #[serde(with = "profit_factor")]
    pub profit_factor: f64,
    /// Probability-weighted average return per trade, in percent.
    pub expectancy: f64,
    pub average_max_drawdown_percent: f64,
    pub by_entry_quality: Vec<BucketStats>,
    pub by_rsi: Vec<BucketStats>,
    /// Windows where scoring was unavailable.
    pub skipped_windows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub request: BacktestRequest,
    pub signals: Vec<BacktestSignal>,
    pub stats: BacktestStats,
}

/// JSON has no infinity, so an unbounded profit factor travels as a string.
mod profit_factor {
    use serde::{de, Deserialize, Deserializer, Serializer};

    const INFINITY: &str = "Infinity";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *value == f64::INFINITY {
            serializer.serialize_str(INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) if text == INFINITY => Ok(f64::INFINITY),
            Repr::Text(text) => Err(de::Error::custom(format!(
                "invalid profit factor: {}",
                text
            ))),
        }
    }
}
