//! Technical indicator primitives.
//!
//! Every indicator is computed over plain slices and returns one value per
//! input bar:
//! - `Column`: `Vec<Option<f64>>`, `None` on the warm-up prefix of rolling windows
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//!
//! Exponential averages are adjust-off and therefore defined from the first bar.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod pivot;
pub mod rsi;
pub mod stddev;
pub mod stochastic;

use std::fmt;

pub use ema::{calculate_ema, ema_of};
pub use stddev::{rolling_mean, rolling_stddev};

/// One value per bar; `None` where the window is not yet filled.
pub type Column = Vec<Option<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Ema(usize),
    /// Simple mean of `Ema(span)` over `window` bars.
    EmaSma { span: usize, window: usize },
    Sma(usize),
    Stddev(usize),
    BollingerUpper,
    BollingerLower,
    /// Simple mean of the lower band over `window` bars.
    BollingerLowerSma(usize),
    VolumeSma(usize),
    Atr(usize),
    Rsi(usize),
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Ema(span) => write!(f, "EMA({})", span),
            IndicatorType::EmaSma { span, window } => write!(f, "SMA(EMA({}),{})", span, window),
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::BollingerUpper => write!(f, "BB_UPPER"),
            IndicatorType::BollingerLower => write!(f, "BB_LOWER"),
            IndicatorType::BollingerLowerSma(window) => write!(f, "SMA(BB_LOWER,{})", window),
            IndicatorType::VolumeSma(period) => write!(f, "VOLUME_SMA({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

/// Wrap a fully defined series as a column.
pub fn defined(values: &[f64]) -> Column {
    values.iter().copied().map(Some).collect()
}

/// Value at the last bar, if defined.
pub fn last_value(column: &[Option<f64>]) -> Option<f64> {
    column.last().copied().flatten()
}

/// The `n` values ending at index `end` (exclusive), if all are defined.
pub fn window(column: &[Option<f64>], end: usize, n: usize) -> Option<Vec<f64>> {
    if n == 0 || end > column.len() || end < n {
        return None;
    }
    column[end - n..end].iter().copied().collect()
}

/// Median of a non-empty slice; `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display() {
        assert_eq!(IndicatorType::Ema(20).to_string(), "EMA(20)");
        assert_eq!(
            IndicatorType::EmaSma {
                span: 200,
                window: 10
            }
            .to_string(),
            "SMA(EMA(200),10)"
        );
        assert_eq!(IndicatorType::VolumeSma(5).to_string(), "VOLUME_SMA(5)");
    }

    #[test]
    fn indicator_type_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorType::Ema(20), "ema20");
        map.insert(IndicatorType::Sma(20), "sma20");

        assert_eq!(map.get(&IndicatorType::Ema(20)), Some(&"ema20"));
        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Ema(50)), None);
    }

    #[test]
    fn window_requires_defined_values() {
        let column = vec![None, Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(window(&column, 4, 3), Some(vec![1.0, 2.0, 3.0]));
        assert_eq!(window(&column, 4, 4), None);
        assert_eq!(window(&column, 3, 2), Some(vec![1.0, 2.0]));
        assert_eq!(window(&column, 5, 2), None);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn last_value_of_undefined_column() {
        assert_eq!(last_value(&[Some(1.0), None]), None);
        assert_eq!(last_value(&[]), None);
        assert_eq!(last_value(&[None, Some(2.0)]), Some(2.0));
    }
}
