//! Local extrema over a symmetric neighbourhood.

use crate::types::{Pivot, PivotKind};

/// Pivot highs and lows of one series, each in ascending index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivots {
    pub highs: Vec<Pivot>,
    pub lows: Vec<Pivot>,
}

impl Pivots {
    /// Shift every index by `offset`, for pivots found in a sub-slice.
    pub fn shifted(mut self, offset: usize) -> Self {
        for p in self.highs.iter_mut().chain(self.lows.iter_mut()) {
            p.index += offset;
        }
        self
    }

    pub fn of_kind(&self, kind: PivotKind) -> &[Pivot] {
        match kind {
            PivotKind::High => &self.highs,
            PivotKind::Low => &self.lows,
        }
    }
}

/// Find pivots in a dense series. See [`find_pivots_sparse`].
pub fn find_pivots(values: &[f64], window: usize) -> Pivots {
    let sparse: Vec<Option<f64>> = values.iter().map(|v| Some(*v)).collect();
    find_pivots_sparse(&sparse, window)
}

/// Find pivots in a series that may contain unavailable values.
///
/// Index `i` is a pivot high when its value is strictly greater than every
/// other value in `[i - window, i + window]`, and a pivot low when strictly
/// less. Equal neighbours disqualify the point, as does any unavailable value
/// inside the neighbourhood. Points closer than `window` to either end are
/// never pivots.
pub fn find_pivots_sparse(values: &[Option<f64>], window: usize) -> Pivots {
    let mut pivots = Pivots::default();
    if window == 0 || values.len() < 2 * window + 1 {
        return pivots;
    }

    for i in window..values.len() - window {
        let Some(current) = values[i] else {
            continue;
        };

        let mut is_high = true;
        let mut is_low = true;
        for (j, neighbour) in values[i - window..=i + window].iter().enumerate() {
            if j == window {
                continue;
            }
            match neighbour {
                Some(v) => {
                    if *v >= current {
                        is_high = false;
                    }
                    if *v <= current {
                        is_low = false;
                    }
                }
                None => {
                    is_high = false;
                    is_low = false;
                }
            }
            if !is_high && !is_low {
                break;
            }
        }

        if is_high {
            pivots.highs.push(Pivot {
                index: i,
                value: current,
                kind: PivotKind::High,
            });
        }
        if is_low {
            pivots.lows.push(Pivot {
                index: i,
                value: current,
                kind: PivotKind::Low,
            });
        }
    }

    pivots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(p: &[Pivot]) -> Vec<usize> {
        p.iter().map(|p| p.index).collect()
    }

    #[test]
    fn test_simple_peak_and_trough() {
        let values = [1.0, 3.0, 2.0, 0.5, 2.0, 4.0, 1.0];
        let pivots = find_pivots(&values, 1);
        assert_eq!(indices(&pivots.highs), vec![1, 5]);
        assert_eq!(indices(&pivots.lows), vec![3]);
    }

    #[test]
    fn test_ties_disqualify() {
        let values = [1.0, 3.0, 3.0, 1.0, 0.0, 0.0, 1.0];
        let pivots = find_pivots(&values, 1);
        assert!(pivots.highs.is_empty());
        assert!(pivots.lows.is_empty());
    }

    #[test]
    fn test_window_excludes_edges() {
        let values = [5.0, 1.0, 2.0, 3.0, 0.0];
        let pivots = find_pivots(&values, 2);
        assert!(pivots.highs.is_empty());
        assert!(pivots.lows.is_empty());
    }

    #[test]
    fn test_wider_window_filters_minor_swings() {
        let values = [1.0, 2.0, 1.5, 1.8, 1.0, 5.0, 1.0, 0.5, 1.0];
        assert_eq!(indices(&find_pivots(&values, 1).highs), vec![1, 3, 5]);
        assert_eq!(indices(&find_pivots(&values, 2).highs), vec![5]);
    }

    #[test]
    fn test_unavailable_values_block_pivots() {
        let values = [None, Some(1.0), Some(3.0), Some(1.0), None, Some(0.0), Some(1.0)];
        let pivots = find_pivots_sparse(&values, 1);
        assert_eq!(indices(&pivots.highs), vec![2]);
        assert!(pivots.lows.is_empty());
    }

    #[test]
    fn test_shifted() {
        let pivots = find_pivots(&[1.0, 3.0, 1.0], 1).shifted(10);
        assert_eq!(pivots.highs[0].index, 11);
    }
}
