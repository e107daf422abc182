//! Pivot detection over a centred window.
//!
//! A bar is a simple pivot when its close is the highest or lowest close in
//! `[i - length, i + length]` (clipped to the series). It is an ATR pivot
//! when its high is the window's highest high and `close + ATR` still reaches
//! every neighbour's high, or symmetrically for lows. The recorded pivot price
//! is the bar's close.

use crate::domain::indicator::Column;
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_LENGTH: usize = 5;

pub fn find_pivots(bars: &[OhlcvBar], length: usize, atr: &[Option<f64>]) -> Column {
    (0..bars.len())
        .map(|i| {
            let start = i.saturating_sub(length);
            let end = (i + length).min(bars.len().saturating_sub(1));
            let window = &bars[start..=end];
            let bar = &bars[i];

            let simple = is_close_extreme(bar, window);
            let with_atr = atr
                .get(i)
                .copied()
                .flatten()
                .is_some_and(|a| is_atr_extreme(bar, window, a));

            (simple || with_atr).then_some(bar.close)
        })
        .collect()
}

fn is_close_extreme(bar: &OhlcvBar, window: &[OhlcvBar]) -> bool {
    let highest = window.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|b| b.close).fold(f64::INFINITY, f64::min);
    bar.close >= highest || bar.close <= lowest
}

fn is_atr_extreme(bar: &OhlcvBar, window: &[OhlcvBar], atr: f64) -> bool {
    let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    let high_pivot = bar.high >= highest && window.iter().all(|b| bar.close + atr >= b.high);
    let low_pivot = bar.low <= lowest && window.iter().all(|b| bar.close - atr <= b.low);
    high_pivot || low_pivot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn peak_and_trough_are_pivots() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 5.0, 3.0, 2.0, 1.0, 0.5, 1.0, 2.0, 3.0]);
        let atr = vec![None; bars.len()];
        let pivots = find_pivots(&bars, 2, &atr);

        assert_eq!(pivots[3], Some(5.0));
        assert_eq!(pivots[7], Some(0.5));
        assert_eq!(pivots[5], None);
    }

    #[test]
    fn flat_series_marks_every_bar() {
        let bars = make_bars(&[4.0; 6]);
        let atr = vec![None; bars.len()];
        assert!(find_pivots(&bars, 2, &atr).iter().all(|p| *p == Some(4.0)));
    }

    #[test]
    fn atr_rule_can_confirm_a_non_close_extreme() {
        // bar 2 has the highest high but not the highest close
        let mut bars = make_bars(&[1.0, 2.0, 2.5, 3.0, 2.0]);
        bars[2].high = 6.0;
        let none_atr = vec![None; bars.len()];
        assert_eq!(find_pivots(&bars, 1, &none_atr)[2], None);

        let wide_atr = vec![Some(4.0); bars.len()];
        assert_eq!(find_pivots(&bars, 1, &wide_atr)[2], Some(2.5));
    }
}
