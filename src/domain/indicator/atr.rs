//! Average True Range: simple mean of per-bar true range over a window.

use crate::domain::indicator::{defined, rolling_mean, Column};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

/// True range per bar; the first bar has no previous close and uses its
/// high-low span.
pub fn true_ranges(bars: &[OhlcvBar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| match i {
            0 => bar.high - bar.low,
            _ => bar.true_range(bars[i - 1].close),
        })
        .collect()
}

pub fn calc_atr(bars: &[OhlcvBar], period: usize) -> Column {
    rolling_mean(&defined(&true_ranges(bars)), period)
}
