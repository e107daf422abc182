//! Rolling mean and standard deviation.
//!
//! Population standard deviation over n values.
//! STDDEV(n)[i] = sqrt(sum((X[i-j] - SMA(n)[i])^2 for j in 0..n-1) / n)
//! Warmup: first (n-1) bars are undefined, as is any window touching an
//! undefined input.

use crate::domain::indicator::Column;

pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Column {
    rolling(values, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}

pub fn rolling_stddev(values: &[Option<f64>], period: usize) -> Column {
    rolling(values, period, |window| {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window
            .iter()
            .map(|v| {
                let diff = v - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        variance.sqrt()
    })
}

fn rolling(values: &[Option<f64>], period: usize, f: impl Fn(&[f64]) -> f64) -> Column {
    let mut out = Vec::with_capacity(values.len());
    let mut buf = Vec::with_capacity(period);

    for i in 0..values.len() {
        if period == 0 || i + 1 < period {
            out.push(None);
            continue;
        }
        buf.clear();
        let complete = values[i + 1 - period..=i].iter().all(|v| match v {
            Some(x) => {
                buf.push(*x);
                true
            }
            None => false,
        });
        out.push(if complete { Some(f(&buf)) } else { None });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::defined;

    #[test]
    fn mean_warmup() {
        let column = rolling_mean(&defined(&[10.0, 20.0, 30.0, 40.0]), 3);
        assert_eq!(column[0], None);
        assert_eq!(column[1], None);
        assert_eq!(column[2], Some(20.0));
        assert_eq!(column[3], Some(30.0));
    }

    #[test]
    fn mean_skips_windows_with_gaps() {
        let column = rolling_mean(&[None, Some(1.0), Some(2.0), Some(3.0)], 2);
        assert_eq!(column, vec![None, None, Some(1.5), Some(2.5)]);
    }

    #[test]
    fn stddev_is_population() {
        let column = rolling_stddev(&defined(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        assert!((column[7].unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn stddev_constant_is_zero() {
        let column = rolling_stddev(&defined(&[5.0; 4]), 3);
        assert_eq!(column[3], Some(0.0));
    }

    #[test]
    fn zero_period_is_undefined() {
        assert!(rolling_mean(&defined(&[1.0, 2.0]), 0)
            .iter()
            .all(Option::is_none));
    }
}
