//! RSI (Relative Strength Index) indicator.
//!
//! Wilder's smoothing realised as an EMA of span 2n-1 over per-bar gains and
//! absolute losses (adjust-off, seeded with the first change).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (or 50 when avg_gain is also 0).
//!
//! Warmup: the first n bars are undefined.

use crate::domain::indicator::{ema_of, Column};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(closes: &[f64], period: usize) -> Column {
    if period == 0 || closes.len() < 2 {
        return vec![None; closes.len()];
    }

    let mut gains = Vec::with_capacity(closes.len() - 1);
    let mut losses = Vec::with_capacity(closes.len() - 1);
    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let span = 2 * period - 1;
    let avg_gain = ema_of(&gains, span);
    let avg_loss = ema_of(&losses, span);

    let mut values = Vec::with_capacity(closes.len());
    values.push(None);
    for i in 0..gains.len() {
        // bar index is i + 1; n changes are needed before the value is trusted
        if i + 1 < period {
            values.push(None);
        } else {
            values.push(Some(rsi_value(avg_gain[i], avg_loss[i])));
        }
    }
    values
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
