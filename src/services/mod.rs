pub mod backtester;
pub mod engine;
pub mod multi_timeframe;
pub mod patterns;
pub mod signals;

pub use backtester::Backtester;
pub use engine::{SignalEngine, SignalReport};
pub use multi_timeframe::MultiTimeframeAggregator;
pub use patterns::{BreakoutDetector, DivergenceDetector, PatternDetector};
pub use signals::{IndicatorSet, ScoringEngine};
