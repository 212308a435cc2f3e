//! Unit tests for types module

use wraith::types::*;

// =============================================================================
// Candle Tests
// =============================================================================

#[test]
fn test_candle_serialization() {
    let candle = Candle::new(1_700_000_000_000, 100.0, 105.0, 95.0, 102.0, 1234.5);
    let json = serde_json::to_string(&candle).unwrap();
    let parsed: Candle = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, candle);
    assert!(json.contains("\"timestamp\":1700000000000"));
}

#[test]
fn test_candle_series_rejects_duplicate_timestamps() {
    let candles = vec![
        Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
        Candle::new(1, 1.0, 1.0, 1.0, 1.0, 1.0),
    ];
    assert!(CandleSeries::new(candles).is_err());
}

#[test]
fn test_candle_series_rejects_empty() {
    let err = CandleSeries::new(Vec::new()).unwrap_err();
    assert!(err.is_insufficient_data());
}

#[test]
fn test_candle_series_rejects_nan_price() {
    let candles = vec![Candle::new(1, 1.0, f64::NAN, 1.0, 1.0, 1.0)];
    assert!(CandleSeries::new(candles).is_err());
}

#[test]
fn test_candle_series_accessors() {
    let series = CandleSeries::new(vec![
        Candle::new(1, 10.0, 12.0, 9.0, 11.0, 100.0),
        Candle::new(2, 11.0, 13.0, 10.0, 12.0, 200.0),
    ])
    .unwrap();
    assert_eq!(series.len(), 2);
    assert_eq!(series.closes(), vec![11.0, 12.0]);
    assert_eq!(series.highs(), vec![12.0, 13.0]);
    assert_eq!(series.lows(), vec![9.0, 10.0]);
    assert_eq!(series.volumes(), vec![100.0, 200.0]);
}

// =============================================================================
// Signal Type Tests
// =============================================================================

#[test]
fn test_recommendation_class_serialization() {
    let json = serde_json::to_string(&RecommendationClass::StrongBuy).unwrap();
    assert_eq!(json, "\"STRONG_BUY\"");

    let parsed: RecommendationClass = serde_json::from_str("\"STRONG_SELL\"").unwrap();
    assert_eq!(parsed, RecommendationClass::StrongSell);
}

#[test]
fn test_signal_status_serialization() {
    let json = serde_json::to_string(&SignalStatus::WatchForPullback).unwrap();
    assert_eq!(json, "\"WATCH_FOR_PULLBACK\"");
    assert!(SignalStatus::BuyPartial.is_immediate_buy());
    assert!(!SignalStatus::WatchForPullback.is_immediate_buy());
}

#[test]
fn test_class_and_status_directions() {
    assert_eq!(RecommendationClass::Buy.direction(), Direction::Bullish);
    assert_eq!(RecommendationClass::Hold.direction(), Direction::Neutral);
    assert_eq!(SignalStatus::StrongSell.direction(), Direction::Bearish);
}

#[test]
fn test_severity_ordering() {
    assert!(Severity::High > Severity::Medium);
    assert!(Severity::Medium > Severity::Low);
}

#[test]
fn test_divergence_type_field_name() {
    let divergence = Divergence {
        divergence_type: DivergenceType::HiddenBearish,
        indicator: DivergenceIndicator::Macd,
        strength: 40.0,
        candles_ago: 3,
        anchor_points: Vec::new(),
    };
    let value = serde_json::to_value(&divergence).unwrap();
    assert_eq!(value["type"], "HIDDEN_BEARISH");
    assert_eq!(value["indicator"], "MACD");
    assert_eq!(value["candlesAgo"], 3);
}

// =============================================================================
// Backtest Type Tests
// =============================================================================

#[test]
fn test_trigger_condition_parsing() {
    assert_eq!(
        TriggerCondition::from_str("class:strong_buy"),
        Some(TriggerCondition::Class(RecommendationClass::StrongBuy))
    );
    assert_eq!(
        TriggerCondition::from_str("status:BUY_PARTIAL"),
        Some(TriggerCondition::Status(SignalStatus::BuyPartial))
    );
    assert_eq!(
        TriggerCondition::from_str("score:55"),
        Some(TriggerCondition::MinScore(55.0))
    );
    assert_eq!(TriggerCondition::from_str("class:maybe"), None);
    assert_eq!(TriggerCondition::from_str("55"), None);
}

#[test]
fn test_trigger_condition_serialization() {
    let json = serde_json::to_string(&TriggerCondition::MinScore(60.0)).unwrap();
    assert_eq!(json, r#"{"type":"MIN_SCORE","value":60.0}"#);
}

#[test]
fn test_backtest_request_cooldown_defaults_to_hold() {
    let request = BacktestRequest::new(TriggerCondition::MinScore(0.0), 7);
    assert_eq!(request.effective_cooldown(), 7);
    assert_eq!(request.with_cooldown(2).effective_cooldown(), 2);
}

// =============================================================================
// Timeframe Tests
// =============================================================================

#[test]
fn test_resolution_from_str() {
    assert_eq!(Resolution::from_str("15m"), Some(Resolution::FifteenMinutes));
    assert_eq!(Resolution::from_str("1w"), Some(Resolution::OneWeek));
    assert_eq!(Resolution::from_str("2h"), None);
}

#[test]
fn test_resolution_seconds() {
    assert_eq!(Resolution::OneMinute.seconds(), 60);
    assert_eq!(Resolution::FourHours.seconds(), 4 * 3600);
    assert_eq!(Resolution::OneDay.seconds(), 86400);
}

#[test]
fn test_resolution_ordering_is_finest_first() {
    let all = Resolution::all();
    assert!(all.windows(2).all(|w| w[0] < w[1]));
    assert!(all.windows(2).all(|w| w[0].seconds() < w[1].seconds()));
}

#[test]
fn test_resolution_serialization() {
    let json = serde_json::to_string(&Resolution::FourHours).unwrap();
    assert_eq!(json, "\"4h\"");
    assert_eq!(Resolution::OneHour.to_string(), "1h");
}

#[test]
fn test_ticker_serialization() {
    let ticker = Ticker {
        symbol: "BTC".to_string(),
        price: 50000.0,
        change_24h: 2.5,
        volume_24h: 1000.0,
        high_24h: 51000.0,
        low_24h: 49000.0,
    };
    let value = serde_json::to_value(&ticker).unwrap();
    assert_eq!(value["change24h"], 2.5);
    assert_eq!(value["high24h"], 51000.0);
}
