//! Integration tests for multi-timeframe aggregation

use std::collections::BTreeMap;
use wraith::types::*;
use wraith::{EngineConfig, SignalEngine};

/// Closes grow by `factor` every five candles, spaced at `resolution`.
fn create_trend_candles(resolution: Resolution, count: usize, factor: f64) -> Vec<Candle> {
    let step = resolution.seconds() * 1000;
    (0..count)
        .map(|i| {
            let close = 100.0 * factor.powf(i as f64 / 5.0);
            Candle::new(
                1_600_000_000_000 + i as i64 * step,
                close,
                close * 1.001,
                close * 0.999,
                close,
                1000.0,
            )
        })
        .collect()
}

fn series(entries: &[(Resolution, usize, f64)]) -> BTreeMap<Resolution, Vec<Candle>> {
    entries
        .iter()
        .map(|&(r, count, factor)| (r, create_trend_candles(r, count, factor)))
        .collect()
}

fn engine() -> SignalEngine {
    SignalEngine::new(EngineConfig::default()).unwrap()
}

#[test]
fn test_all_strong_buy_is_very_high_confidence() {
    let input = series(&[
        (Resolution::OneHour, 150, 1.10),
        (Resolution::FourHours, 150, 1.10),
        (Resolution::OneDay, 150, 1.10),
    ]);
    let result = engine().analyze_multi_timeframe(&input).unwrap();

    assert_eq!(result.timeframes.len(), 3);
    assert_eq!(result.alignment_type, AlignmentType::AllStrongBuy);
    assert_eq!(result.confidence, Confidence::VeryHigh);
    assert!(result.unavailable.is_empty());
}

#[test]
fn test_high_warning_blocks_immediate_buy() {
    // A relentless climb pins RSI at 100, which is a high severity warning
    let input = series(&[
        (Resolution::OneHour, 150, 1.10),
        (Resolution::OneDay, 150, 1.10),
    ]);
    let result = engine().analyze_multi_timeframe(&input).unwrap();

    assert!(result
        .timeframes
        .iter()
        .all(|t| t.recommendation.has_high_severity_warning()));
    assert!(!result.recommended_action.is_immediate_buy());
    assert!(result
        .consolidated_warnings
        .iter()
        .any(|w| w.severity == Severity::High && !w.resolutions.is_empty()));
}

#[test]
fn test_all_bearish_recommends_sell() {
    let input = series(&[
        (Resolution::FifteenMinutes, 150, 0.95),
        (Resolution::OneHour, 150, 0.95),
    ]);
    let result = engine().analyze_multi_timeframe(&input).unwrap();

    assert!(matches!(
        result.alignment_type,
        AlignmentType::AllBearish | AlignmentType::AllStrongSell
    ));
    assert_eq!(result.recommended_action, TimeframeAction::Sell);
}

#[test]
fn test_disagreement_is_not_full_alignment() {
    let input = series(&[
        (Resolution::OneHour, 150, 1.10),
        (Resolution::OneDay, 150, 0.95),
    ]);
    let result = engine().analyze_multi_timeframe(&input).unwrap();

    assert_eq!(result.alignment_type, AlignmentType::Conflicting);
    assert_eq!(result.recommended_action, TimeframeAction::Wait);
}

#[test]
fn test_short_resolution_is_reported_unavailable() {
    let input = series(&[
        (Resolution::OneHour, 150, 1.10),
        (Resolution::OneWeek, 20, 1.10),
    ]);
    let result = engine().analyze_multi_timeframe(&input).unwrap();

    assert_eq!(result.timeframes.len(), 1);
    assert!(result.get(Resolution::OneHour).is_some());
    assert!(result.get(Resolution::OneWeek).is_none());
    assert_eq!(result.unavailable.len(), 1);
    assert_eq!(result.unavailable[0].resolution, Resolution::OneWeek);
}

#[test]
fn test_every_resolution_short_is_an_error() {
    let input = series(&[(Resolution::OneDay, 30, 1.10)]);
    let err = engine().analyze_multi_timeframe(&input).unwrap_err();
    assert!(err.is_insufficient_data());
}

#[test]
fn test_empty_input_is_rejected() {
    assert!(engine().analyze_multi_timeframe(&BTreeMap::new()).is_err());
}

#[tokio::test]
async fn test_concurrent_matches_sequential() {
    let engine = engine();
    let input = series(&[
        (Resolution::FiveMinutes, 120, 1.10),
        (Resolution::OneHour, 150, 0.95),
        (Resolution::FourHours, 140, 1.10),
        (Resolution::OneWeek, 10, 1.10),
    ]);

    let sequential = engine.analyze_multi_timeframe(&input).unwrap();
    let concurrent = engine.analyze_multi_timeframe_concurrent(input).await.unwrap();
    assert_eq!(sequential, concurrent);
}
