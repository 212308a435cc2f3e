//! Trading signals service module.
//!
//! Provides technical indicator series, the pivot primitive and the
//! composite scoring engine.

pub mod indicators;
pub mod pivots;
pub mod scoring;

pub use indicators::IndicatorSet;
pub use pivots::{find_pivots, find_pivots_sparse, Pivots};
pub use scoring::ScoringEngine;

use crate::types::{Candle, SignalCategory};

/// Trait for implementing technical indicators.
///
/// Output series are positionally aligned to the input candles and never
/// look ahead of the index they describe.
pub trait Indicator: Send + Sync {
    /// Series (or bundle of series) produced by this indicator.
    type Output;

    /// Unique identifier for this indicator.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Category this indicator belongs to.
    fn category(&self) -> SignalCategory;

    /// Minimum number of candles required for the first value.
    fn min_periods(&self) -> usize;

    /// Calculate the indicator over the whole candle sequence.
    /// Returns None if the sequence is shorter than `min_periods`.
    fn calculate(&self, candles: &[Candle]) -> Option<Self::Output>;
}

/// Clamp a sub-score to the [0, 100] range.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Percentage difference of `value` from `reference`.
pub fn pct_diff(value: f64, reference: f64) -> f64 {
    if reference == 0.0 {
        0.0
    } else {
        (value - reference) / reference * 100.0
    }
}
