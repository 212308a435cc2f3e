//! Pattern detectors built on the indicator library and pivot primitive.
//!
//! Each detector is independent of the scoring engine and of the others.

pub mod breakout;
pub mod divergence;
pub mod levels;

pub use breakout::BreakoutDetector;
pub use divergence::DivergenceDetector;
pub use levels::PatternDetector;
