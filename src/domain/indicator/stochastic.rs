//! Fast stochastic oscillator.
//!
//! %K = 100 * (C - LL(n)) / (HH(n) - LL(n))
//! %D = SMA(%K, m)
//!
//! A flat window (HH == LL) yields %K = 50.

use crate::domain::indicator::{rolling_mean, Column};
use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone)]
pub struct StochasticLines {
    pub k: Column,
    pub d: Column,
}

pub fn calculate_stochastic(bars: &[OhlcvBar], k_period: usize, d_period: usize) -> StochasticLines {
    let mut k = Vec::with_capacity(bars.len());
    for i in 0..bars.len() {
        if k_period == 0 || i + 1 < k_period {
            k.push(None);
            continue;
        }
        let window = &bars[i + 1 - k_period..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        let range = highest - lowest;
        let value = if range > 0.0 {
            100.0 * (bars[i].close - lowest) / range
        } else {
            50.0
        };
        k.push(Some(value));
    }
    let d = rolling_mean(&k, d_period);
    StochasticLines { k, d }
}
