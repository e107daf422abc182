//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), EMA[0] = C[0], then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Adjust-off: no warm-up, every bar is defined.

use crate::domain::indicator::Column;

/// EMA of arbitrary values with span `period`.
pub fn ema_of(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.is_empty() {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &v in &values[1..] {
        ema = v * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

/// EMA of closes as a column.
pub fn calculate_ema(closes: &[f64], period: usize) -> Column {
    ema_of(closes, period).into_iter().map(Some).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_first_value() {
        let series = ema_of(&[10.0, 20.0, 30.0], 3);
        assert!((series[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_period_1_tracks_input() {
        let series = ema_of(&[10.0, 20.0, 30.0], 1);
        assert_eq!(series, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = ema_of(&[10.0, 20.0, 30.0, 40.0], 3);
        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);
        assert!((series[1] - e1).abs() < 1e-12);
        assert!((series[2] - e2).abs() < 1e-12);
        assert!((series[3] - e3).abs() < 1e-12);
    }

    #[test]
    fn ema_equal_prices() {
        let series = ema_of(&[100.0; 5], 3);
        assert!(series.iter().all(|v| (v - 100.0).abs() < f64::EPSILON));
    }

    #[test]
    fn ema_column_is_fully_defined() {
        let column = calculate_ema(&[1.0, 2.0, 3.0], 20);
        assert!(column.iter().all(Option::is_some));
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(ema_of(&[], 3).is_empty());
        assert!(ema_of(&[10.0, 20.0], 0).is_empty());
    }
}
