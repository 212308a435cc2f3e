//! Average Directional Index (ADX) indicator.

use super::atr::wilder_smooth;
use crate::services::signals::Indicator;
use crate::types::{Candle, SignalCategory, Series};

/// ADX (Average Directional Index) indicator.
///
/// Measures trend strength (not direction):
/// - Below 20: Weak trend / ranging market
/// - 20-40: Trending
/// - Above 40: Strong trend
///
/// Combined with +DI and -DI for direction.
pub struct Adx {
    period: usize,
}

impl Default for Adx {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

/// ADX line with its directional components.
#[derive(Debug, Clone, PartialEq)]
pub struct AdxSeries {
    pub adx: Series,
    pub plus_di: Series,
    pub minus_di: Series,
}

impl Indicator for Adx {
    type Output = AdxSeries;

    fn id(&self) -> &str {
        "adx"
    }

    fn name(&self) -> &str {
        "ADX (14)"
    }

    fn category(&self) -> SignalCategory {
        SignalCategory::Trend
    }

    fn min_periods(&self) -> usize {
        self.period * 2
    }

    fn calculate(&self, candles: &[Candle]) -> Option<AdxSeries> {
        if self.period == 0 || candles.len() < self.min_periods() {
            return None;
        }

        let len = candles.len();
        let mut plus_dm = Vec::with_capacity(len - 1);
        let mut minus_dm = Vec::with_capacity(len - 1);
        let mut tr = Vec::with_capacity(len - 1);

        // Calculate DM and TR
        for w in candles.windows(2) {
            let (previous, current) = (&w[0], &w[1]);

            let up_move = current.high - previous.high;
            let down_move = previous.low - current.low;

            plus_dm.push(if up_move > down_move && up_move > 0.0 {
                up_move
            } else {
                0.0
            });
            minus_dm.push(if down_move > up_move && down_move > 0.0 {
                down_move
            } else {
                0.0
            });
            tr.push(current.true_range(previous));
        }

        // Smooth the values
        let smoothed_plus_dm = wilder_smooth(&plus_dm, 1, self.period, len);
        let smoothed_minus_dm = wilder_smooth(&minus_dm, 1, self.period, len);
        let smoothed_tr = wilder_smooth(&tr, 1, self.period, len);

        let mut plus_di = Series::unavailable(len);
        let mut minus_di = Series::unavailable(len);
        let mut dx_values = Vec::new();
        let dx_offset = self.period;

        for i in dx_offset..len {
            let (Some(atr), Some(pdm), Some(mdm)) = (
                smoothed_tr.get(i),
                smoothed_plus_dm.get(i),
                smoothed_minus_dm.get(i),
            ) else {
                continue;
            };

            let (pdi, mdi) = if atr > 0.0 {
                (pdm / atr * 100.0, mdm / atr * 100.0)
            } else {
                (0.0, 0.0)
            };
            plus_di.set(i, pdi);
            minus_di.set(i, mdi);

            let di_sum = pdi + mdi;
            let dx = if di_sum > 0.0 {
                (pdi - mdi).abs() / di_sum * 100.0
            } else {
                0.0
            };
            dx_values.push(dx);
        }

        // ADX is the smoothed DX
        let adx = wilder_smooth(&dx_values, dx_offset, self.period, len);

        Some(AdxSeries {
            adx,
            plus_di,
            minus_di,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_uptrend_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + i as f64 * 1.5;
                Candle::new(
                    1000000 + i as i64 * 60000,
                    base,
                    base + 2.0,
                    base - 1.0,
                    base + 1.0,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_adx_id_and_name() {
        let adx = Adx::default();
        assert_eq!(adx.id(), "adx");
        assert_eq!(adx.name(), "ADX (14)");
        assert_eq!(adx.category(), SignalCategory::Trend);
    }

    #[test]
    fn test_adx_min_periods() {
        let adx = Adx::default();
        assert_eq!(adx.min_periods(), 28);
        assert!(adx.calculate(&create_uptrend_candles(20)).is_none());
    }

    #[test]
    fn test_adx_alignment() {
        let result = Adx::default().calculate(&create_uptrend_candles(50)).unwrap();
        assert_eq!(result.adx.len(), 50);
        assert_eq!(result.plus_di.first_available(), Some(14));
        assert_eq!(result.adx.first_available(), Some(27));
    }

    #[test]
    fn test_adx_uptrend_direction() {
        let result = Adx::default().calculate(&create_uptrend_candles(50)).unwrap();
        let adx = result.adx.last().unwrap();
        assert!(adx > 20.0, "steady uptrend should trend, got {}", adx);
        assert!(result.plus_di.last().unwrap() > result.minus_di.last().unwrap());
    }
}
