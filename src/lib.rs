//! Wraith - Deterministic trading signal generation and validation engine

pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

// Re-export commonly used types
pub use config::{Config, EngineConfig};
pub use error::{EngineError, Result};
pub use services::{SignalEngine, SignalReport};
pub use sources::{JsonFileProvider, MarketDataProvider, SyntheticProvider};
pub use types::*;
