//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9. All EMAs are adjust-off,
//! so every bar carries a value.

use crate::domain::indicator::ema_of;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdLines {
    if closes.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return MacdLines {
            line: Vec::new(),
            signal: Vec::new(),
            histogram: Vec::new(),
        };
    }

    let ema_fast = ema_of(closes, fast);
    let ema_slow = ema_of(closes, slow);
    let line: Vec<f64> = ema_fast.iter().zip(&ema_slow).map(|(f, s)| f - s).collect();
    let signal = ema_of(&line, signal_period);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();

    MacdLines {
        line,
        signal,
        histogram,
    }
}
