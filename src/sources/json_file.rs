use super::{ticker_from_candles, MarketDataProvider};
use crate::error::{EngineError, Result};
use crate::types::{Candle, CandleSeries, Resolution, Ticker};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads candles from `{dir}/{symbol}_{resolution}.json`.
///
/// Each file holds a JSON array of candles, oldest first. Symbols are
/// lowercased when building the file name.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    dir: PathBuf,
}

impl JsonFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, symbol: &str, resolution: Resolution) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", symbol.to_lowercase(), resolution.label()))
    }

    fn read(&self, symbol: &str, resolution: Resolution) -> Result<Vec<Candle>> {
        let path = self.path(symbol, resolution);
        let contents = fs::read_to_string(&path).map_err(|e| {
            EngineError::DataSource(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let candles: Vec<Candle> = serde_json::from_str(&contents)?;
        CandleSeries::validate(&candles)?;
        debug!("Loaded {} candles from {}", candles.len(), path.display());
        Ok(candles)
    }
}

impl MarketDataProvider for JsonFileProvider {
    fn name(&self) -> &str {
        "json-file"
    }

    fn get_candles(&self, symbol: &str, resolution: Resolution, count: usize) -> Result<Vec<Candle>> {
        let mut candles = self.read(symbol, resolution)?;
        if candles.len() > count {
            candles.drain(..candles.len() - count);
        }
        Ok(candles)
    }

    /// Derived from the finest resolution on disk.
    fn get_ticker(&self, symbol: &str) -> Result<Ticker> {
        let resolution = Resolution::all()
            .into_iter()
            .find(|r| self.path(symbol, *r).exists())
            .ok_or_else(|| EngineError::DataSource(format!("No candle files for {}", symbol)))?;

        let candles = self.read(symbol, resolution)?;
        ticker_from_candles(symbol, &candles)
            .ok_or_else(|| EngineError::insufficient(format!("{} ticker", symbol), 1, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wraith-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_candles(dir: &Path, file: &str, count: usize) {
        let candles: Vec<Candle> = (0..count)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(i as i64 * 3_600_000, p, p + 1.0, p - 1.0, p, 5.0)
            })
            .collect();
        fs::write(dir.join(file), serde_json::to_string(&candles).unwrap()).unwrap();
    }

    #[test]
    fn test_reads_most_recent_candles() {
        let dir = temp_dir("read");
        write_candles(&dir, "btc_1h.json", 30);

        let provider = JsonFileProvider::new(&dir);
        let candles = provider.get_candles("BTC", Resolution::OneHour, 10).unwrap();
        assert_eq!(candles.len(), 10);
        assert_eq!(candles[0].close, 120.0);
        assert_eq!(candles[9].close, 129.0);

        let ticker = provider.get_ticker("btc").unwrap();
        assert_eq!(ticker.price, 129.0);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let provider = JsonFileProvider::new(temp_dir("missing"));
        let err = provider
            .get_candles("eth", Resolution::OneDay, 10)
            .unwrap_err();
        assert!(matches!(err, EngineError::DataSource(_)));
    }

    #[test]
    fn test_unordered_file_is_rejected() {
        let dir = temp_dir("unordered");
        let candles = vec![
            Candle::new(2, 1.0, 1.0, 1.0, 1.0, 1.0),
            Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
        ];
        fs::write(dir.join("sol_1d.json"), serde_json::to_string(&candles).unwrap()).unwrap();

        let err = JsonFileProvider::new(&dir)
            .get_candles("sol", Resolution::OneDay, 10)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        fs::remove_dir_all(&dir).ok();
    }
}
