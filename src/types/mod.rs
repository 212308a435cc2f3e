pub mod backtest;
pub mod candle;
pub mod market;
pub mod patterns;
pub mod signals;
pub mod timeframe;

pub use backtest::*;
pub use candle::*;
pub use market::*;
pub use patterns::*;
pub use signals::*;
pub use timeframe::*;
