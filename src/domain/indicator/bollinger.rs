//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::{defined, rolling_mean, rolling_stddev, Column};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: Column,
    pub stddev: Column,
    pub upper: Column,
    pub lower: Column,
}

pub fn calculate_bollinger(closes: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    let values = defined(closes);
    let middle = rolling_mean(&values, period);
    let stddev = rolling_stddev(&values, period);

    let upper = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| Some((*m)? + multiplier * (*s)?))
        .collect();
    let lower = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| Some((*m)? - multiplier * (*s)?))
        .collect();

    BollingerBands {
        middle,
        stddev,
        upper,
        lower,
    }
}
