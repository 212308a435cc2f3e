use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wraith::{
    Config, JsonFileProvider, MarketDataProvider, Resolution, SignalEngine, SyntheticProvider,
};

const USAGE: &str = "usage: wraith <command> <symbol> [resolution]

commands:
  score        composite recommendation for the latest candle
  analyze      score plus divergence, patterns and breakout
  divergence   RSI / MACD divergences
  patterns     support, resistance and double formations
  breakout     squeeze, volume, consolidation and active breakout
  backtest     replay the trigger in BACKTEST_TRIGGER over history
  mtf          multi-timeframe alignment over MTF_RESOLUTIONS
  ticker       24h ticker snapshot";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wraith=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (command, symbol) = match (args.first(), args.get(1)) {
        (Some(c), Some(s)) => (c.as_str(), s.as_str()),
        _ => bail!(USAGE),
    };
    let resolution = match args.get(2) {
        Some(r) => Resolution::from_str(r).ok_or_else(|| anyhow!("unknown resolution '{}'", r))?,
        None => Resolution::OneHour,
    };

    // Load configuration
    let config = Config::from_env();
    let engine = SignalEngine::new(config.engine.clone()).context("invalid engine configuration")?;

    let provider: Arc<dyn MarketDataProvider> = if config.demo || !config.data_dir.exists() {
        if !config.demo {
            warn!("{} not found, falling back to synthetic data", config.data_dir.display());
        }
        info!("Using synthetic data (seed {})", config.demo_seed);
        Arc::new(SyntheticProvider::new(config.demo_seed))
    } else {
        info!("Reading candles from {}", config.data_dir.display());
        Arc::new(JsonFileProvider::new(config.data_dir.clone()))
    };

    let candles = || provider.get_candles(symbol, resolution, config.candle_count);

    match command {
        "score" => print(&engine.score(&candles()?)?),
        "analyze" => print(&engine.analyze(&candles()?)?),
        "divergence" => print(&engine.detect_divergence(&candles()?)?),
        "patterns" => print(&engine.detect_patterns(&candles()?)?),
        "breakout" => print(&engine.detect_breakout(&candles()?)?),
        "backtest" => {
            let result = engine.backtest(
                &candles()?,
                config.backtest_trigger,
                config.engine.backtest.hold_period,
            )?;
            print(&result)
        }
        "mtf" => {
            let mut series = BTreeMap::new();
            for r in &config.resolutions {
                match provider.get_candles(symbol, *r, config.candle_count) {
                    Ok(c) => {
                        series.insert(*r, c);
                    }
                    Err(e) => warn!("Skipping {} {}: {}", symbol, r, e),
                }
            }
            print(&engine.analyze_multi_timeframe_concurrent(series).await?)
        }
        "ticker" => print(&provider.get_ticker(symbol)?),
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
