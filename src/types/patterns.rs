use super::signals::Direction;
use serde::{Deserialize, Serialize};

/// Kind of local extremum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PivotKind {
    High,
    Low,
}

/// A local extremum in some numeric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pivot {
    pub index: usize,
    pub value: f64,
    pub kind: PivotKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceType {
    Bullish,
    Bearish,
    HiddenBullish,
    HiddenBearish,
}

impl DivergenceType {
    pub fn direction(&self) -> Direction {
        match self {
            DivergenceType::Bullish | DivergenceType::HiddenBullish => Direction::Bullish,
            DivergenceType::Bearish | DivergenceType::HiddenBearish => Direction::Bearish,
        }
    }
}

/// Oscillator compared against price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DivergenceIndicator {
    Rsi,
    Macd,
}

/// Matched price/oscillator pivot pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPoint {
    /// Candle index of the price pivot.
    pub price_index: usize,
    pub price: f64,
    /// Candle index of the matched oscillator pivot.
    pub indicator_index: usize,
    pub indicator_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Divergence {
    #[serde(rename = "type")]
    pub divergence_type: DivergenceType,
    pub indicator: DivergenceIndicator,
    /// 0-100.
    pub strength: f64,
    /// Distance from the latest price pivot to the end of the series.
    pub candles_ago: usize,
    /// Older anchor first.
    pub anchor_points: Vec<AnchorPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergenceAnalysis {
    /// Every finding, including stale ones kept for explanation.
    pub divergences: Vec<Divergence>,
    /// Findings inside the recency window.
    pub active: Vec<Divergence>,
    /// RSI and MACD active findings agree on direction.
    pub confirmed: bool,
    /// 0-100, computed from active findings only.
    pub combined_score: f64,
    pub bias: Direction,
}

/// Clustered support or resistance level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Level {
    pub price: f64,
    pub touches: usize,
    /// 0-100, from touch count and recency.
    pub strength: f64,
    /// Signed distance from the current price, in percent.
    pub distance_percent: f64,
    pub last_touch_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormationKind {
    DoubleBottom,
    DoubleTop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormationPoint {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
}

/// Double bottom (two lows) or double top (two highs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoubleFormation {
    pub kind: FormationKind,
    /// low1 / high1.
    pub first: FormationPoint,
    /// low2 / high2.
    pub second: FormationPoint,
    /// Intervening pivot of the opposite type.
    pub neckline: f64,
    pub neckline_index: usize,
    pub target_price: f64,
    /// Target relative to the current close, in percent.
    pub target_percent: f64,
    /// 0-100.
    pub strength: f64,
    /// Price has closed beyond the neckline after the second extreme.
    pub confirmed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    /// Below current price, nearest first.
    pub support: Vec<Level>,
    /// Above current price, nearest first.
    pub resistance: Vec<Level>,
    pub double_bottom: Option<DoubleFormation>,
    pub double_top: Option<DoubleFormation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakoutKind {
    Squeeze,
    Volume,
    Consolidation,
    ActiveBreakout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutFinding {
    pub kind: BreakoutKind,
    /// 0-100.
    pub score: f64,
    pub direction: Direction,
    pub rationale: String,
    /// Volume confirmation, only reported for active breakouts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakoutAnalysis {
    pub findings: Vec<BreakoutFinding>,
    /// 0-100.
    pub breakout_score: f64,
    pub direction: Direction,
}

impl BreakoutAnalysis {
    pub fn finding(&self, kind: BreakoutKind) -> Option<&BreakoutFinding> {
        self.findings.iter().find(|f| f.kind == kind)
    }
}
