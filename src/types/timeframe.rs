use super::signals::{Recommendation, Severity};
use serde::{Deserialize, Serialize};

/// Candle resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
}

impl Resolution {
    /// Get the resolution from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Resolution::OneMinute),
            "5m" => Some(Resolution::FiveMinutes),
            "15m" => Some(Resolution::FifteenMinutes),
            "1h" => Some(Resolution::OneHour),
            "4h" => Some(Resolution::FourHours),
            "1d" => Some(Resolution::OneDay),
            "1w" => Some(Resolution::OneWeek),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Resolution::OneMinute => "1m",
            Resolution::FiveMinutes => "5m",
            Resolution::FifteenMinutes => "15m",
            Resolution::OneHour => "1h",
            Resolution::FourHours => "4h",
            Resolution::OneDay => "1d",
            Resolution::OneWeek => "1w",
        }
    }

    /// Get the bucket size in seconds.
    pub fn seconds(&self) -> i64 {
        match self {
            Resolution::OneMinute => 60,
            Resolution::FiveMinutes => 300,
            Resolution::FifteenMinutes => 900,
            Resolution::OneHour => 3600,
            Resolution::FourHours => 14400,
            Resolution::OneDay => 86400,
            Resolution::OneWeek => 604800,
        }
    }

    pub fn all() -> [Resolution; 7] {
        [
            Resolution::OneMinute,
            Resolution::FiveMinutes,
            Resolution::FifteenMinutes,
            Resolution::OneHour,
            Resolution::FourHours,
            Resolution::OneDay,
            Resolution::OneWeek,
        ]
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlignmentType {
    AllStrongBuy,
    AllBullish,
    MostlyBullish,
    Conflicting,
    MostlyBearish,
    AllBearish,
    AllStrongSell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeframeAction {
    BuyNow,
    BuyPartial,
    WatchForPullback,
    Wait,
    ReduceExposure,
    Sell,
}

impl TimeframeAction {
    pub fn is_immediate_buy(&self) -> bool {
        matches!(self, TimeframeAction::BuyNow | TimeframeAction::BuyPartial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeframeRecommendation {
    pub resolution: Resolution,
    pub recommendation: Recommendation,
}

/// Resolution whose scoring was unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableResolution {
    pub resolution: Resolution,
    pub reason: String,
}

/// Warning raised by one or more resolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedWarning {
    pub severity: Severity,
    pub message: String,
    pub resolutions: Vec<Resolution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTimeframeResult {
    pub timeframes: Vec<TimeframeRecommendation>,
    pub unavailable: Vec<UnavailableResolution>,
    pub alignment_type: AlignmentType,
    pub confidence: Confidence,
    pub average_score: f64,
    pub average_entry_quality: f64,
    pub recommended_action: TimeframeAction,
    pub action_reason: String,
    pub consolidated_warnings: Vec<ConsolidatedWarning>,
}

impl MultiTimeframeResult {
    pub fn get(&self, resolution: Resolution) -> Option<&Recommendation> {
        self.timeframes
            .iter()
            .find(|t| t.resolution == resolution)
            .map(|t| &t.recommendation)
    }
}
