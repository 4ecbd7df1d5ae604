//! Swing pivot detection.
//!
//! A bar is a pivot high when its high is strictly greater than every high
//! within `order` bars on each side (pivot lows mirror with lows). An
//! alternation pass then collapses consecutive same-side pivots, keeping the
//! higher high or lower low, so the result is a strict high/low zigzag.

use chrono::NaiveDate;

use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    High,
    Low,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub kind: PivotKind,
}

/// Find alternating swing pivots over the whole series.
///
/// The last `order` bars can never confirm a pivot — a swing needs `order`
/// bars on both sides, so detection lags the raw extreme by `order` days.
pub fn swing_pivots(bars: &[Bar], order: usize) -> Vec<Pivot> {
    let n = bars.len();
    let mut candidates: Vec<Pivot> = Vec::new();
    if order == 0 || n < 2 * order + 1 {
        return candidates;
    }

    for i in order..(n - order) {
        let h = bars[i].high;
        let is_high = (i - order..=i + order).all(|j| j == i || bars[j].high < h);
        if is_high {
            candidates.push(Pivot {
                index: i,
                date: bars[i].date,
                price: h,
                kind: PivotKind::High,
            });
        }

        let l = bars[i].low;
        let is_low = (i - order..=i + order).all(|j| j == i || bars[j].low > l);
        if is_low {
            candidates.push(Pivot {
                index: i,
                date: bars[i].date,
                price: l,
                kind: PivotKind::Low,
            });
        }
    }

    // Alternation filter: consecutive highs keep the higher, consecutive
    // lows keep the lower.
    let mut stack: Vec<Pivot> = Vec::new();
    for pivot in candidates {
        match stack.last() {
            None => stack.push(pivot),
            Some(last) if last.kind == pivot.kind => {
                let replace = match pivot.kind {
                    PivotKind::High => pivot.price > last.price,
                    PivotKind::Low => pivot.price < last.price,
                };
                if replace {
                    stack.pop();
                    stack.push(pivot);
                }
            }
            Some(_) => stack.push(pivot),
        }
    }

    stack
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let base_date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                symbol: "TEST".into(),
                date: base_date + Duration::days(i as i64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn detects_single_peak_and_trough() {
        // Up to a peak at index 3, down to a trough at index 6, back up.
        let bars = bars_from_closes(&[10.0, 11.0, 12.0, 13.0, 12.0, 11.0, 10.0, 11.0, 12.0]);
        let pivots = swing_pivots(&bars, 2);

        assert_eq!(pivots.len(), 2);
        assert_eq!(pivots[0].kind, PivotKind::High);
        assert_eq!(pivots[0].index, 3);
        assert_eq!(pivots[1].kind, PivotKind::Low);
        assert_eq!(pivots[1].index, 6);
    }

    #[test]
    fn pivots_alternate() {
        let bars = bars_from_closes(&[
            10.0, 12.0, 14.0, 12.0, 10.0, 12.0, 13.0, 11.0, 9.0, 10.0, 11.0,
        ]);
        let pivots = swing_pivots(&bars, 2);
        for pair in pivots.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "pivots must alternate");
        }
    }

    #[test]
    fn consecutive_highs_keep_the_higher() {
        // Two swing highs (15 at index 3, 16 at index 8). The dip between
        // them has two equal lows, so no strict pivot low separates them;
        // the alternation filter keeps only the higher high.
        let bars = bars_from_closes(&[
            10.0, 12.0, 14.8, 15.0, 14.2, 14.0, 14.0, 15.0, 16.0, 14.0, 12.0, 10.0, 9.0, 9.5, 9.8,
        ]);
        let pivots = swing_pivots(&bars, 3);
        assert_eq!(pivots.len(), 1);
        assert_eq!(pivots[0].kind, PivotKind::High);
        assert_eq!(pivots[0].index, 8);
    }

    #[test]
    fn monotone_series_has_no_pivots() {
        let bars = bars_from_closes(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!(swing_pivots(&bars, 2).is_empty());
    }

    #[test]
    fn short_series_has_no_pivots() {
        let bars = bars_from_closes(&[1.0, 2.0, 1.0]);
        assert!(swing_pivots(&bars, 2).is_empty());
    }

    #[test]
    fn order_zero_yields_nothing() {
        let bars = bars_from_closes(&[1.0, 3.0, 1.0]);
        assert!(swing_pivots(&bars, 0).is_empty());
    }
}
