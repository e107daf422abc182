//! Single-entry trade simulation used by backtests.
//!
//! A trade is opened on or right after an observation date, protected by a
//! stop at the recent swing low, and closed by the first of: stop hit,
//! target hit, or the end of the holding window. Results are expressed in
//! units of initial risk `R = entry - stop`.

use crate::domain::engine::EPSILON;
use crate::domain::error::ScanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::Series;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_HOLDING: usize = 40;

/// Stop lookback for backtests bound to a watch-list.
pub const BACKTEST_STOP_LOOKBACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Fixed target at `entry + k * R`.
    Target(f64),
    /// No target; the stop trails price in whole-R steps.
    Sticky,
    /// Buy and hold for the window; result in percent.
    Investment,
}

impl FromStr for Strategy {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "sticky" => return Ok(Strategy::Sticky),
            "investment" => return Ok(Strategy::Investment),
            _ => {}
        }
        let k = s
            .strip_suffix('R')
            .or_else(|| s.strip_suffix('r'))
            .and_then(|k| k.parse::<f64>().ok())
            .filter(|k| *k > 0.0)
            .ok_or_else(|| {
                ScanError::option(
                    "backtest_date",
                    format!("unknown strategy '{s}', expected kR, sticky or investment"),
                )
            })?;
        Ok(Strategy::Target(k))
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Target(k) => write!(f, "{k}R"),
            Strategy::Sticky => write!(f, "sticky"),
            Strategy::Investment => write!(f, "investment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Enter at the observation bar's close.
    This,
    /// Enter on the next bar at the observation bar's high.
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeParams {
    pub holding: usize,
    pub entry: EntryMode,
    pub stop_lookback: usize,
    pub strategy: Strategy,
}

impl Default for TradeParams {
    fn default() -> Self {
        TradeParams {
            holding: DEFAULT_HOLDING,
            entry: EntryMode::This,
            stop_lookback: 3,
            strategy: Strategy::Target(2.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// The entry never fired or no risk unit could be formed.
    Missing,
    Closed {
        r: f64,
        exit_date: NaiveDate,
        exit_price: f64,
        /// Stop, entry, intermediate levels and exit, `/`-separated.
        key_prices: String,
    },
}

impl TradeOutcome {
    pub fn is_missing(&self) -> bool {
        matches!(self, TradeOutcome::Missing)
    }
}

/// Simulate one long trade observed at `observe_date`.
pub fn simulate(series: &Series, observe_date: NaiveDate, params: &TradeParams) -> TradeOutcome {
    let Some(observe) = series.index_of(observe_date) else {
        return TradeOutcome::Missing;
    };
    let bars = &series.bars;
    let window_end = observe.saturating_add(params.holding).min(bars.len() - 1);
    let window = &bars[observe + 1..=window_end];

    if params.strategy == Strategy::Investment {
        let entry = bars[observe].close;
        let (exit_date, exit_price) = last_close(window, &bars[observe]);
        let r = round_r((exit_price - entry) / entry.abs().max(EPSILON) * 100.0);
        return TradeOutcome::Closed {
            r,
            exit_date,
            exit_price,
            key_prices: join_prices(&[entry, exit_price]),
        };
    }

    let entry = match params.entry {
        EntryMode::This => bars[observe].close,
        EntryMode::Next => {
            let entry = bars[observe].high;
            match bars.get(observe + 1) {
                Some(next) if next.high >= entry && next.low <= entry => entry,
                _ => return TradeOutcome::Missing,
            }
        }
    };

    let lookback_start = (observe + 1).saturating_sub(params.stop_lookback.max(1));
    let mut stop = bars[lookback_start..=observe]
        .iter()
        .map(|b| b.low)
        .fold(f64::INFINITY, f64::min);
    let risk = entry - stop;
    if risk <= 0.0 {
        return TradeOutcome::Missing;
    }

    let mut levels = vec![stop, entry];
    let target = match params.strategy {
        Strategy::Target(k) => {
            let target = entry + k * risk;
            levels.push(target);
            Some(target)
        }
        _ => None,
    };

    let mut exit = None;
    for bar in window {
        if bar.low <= stop {
            let price = if bar.open < stop { bar.close } else { stop };
            exit = Some((bar.date, price));
            break;
        }
        if let Some(target) = target {
            if bar.high >= target {
                exit = Some((bar.date, target));
                break;
            }
        }
        if params.strategy == Strategy::Sticky {
            let steps = ((bar.close - stop) / risk).floor();
            if steps > 1.0 {
                stop += (steps - 1.0) * risk;
                levels.push(stop);
            }
        }
    }

    let (exit_date, exit_price) = exit.unwrap_or_else(|| last_close(window, &bars[observe]));
    levels.push(exit_price);

    TradeOutcome::Closed {
        r: round_r((exit_price - entry) / risk),
        exit_date,
        exit_price,
        key_prices: join_prices(&levels),
    }
}

fn last_close(window: &[OhlcvBar], observe: &OhlcvBar) -> (NaiveDate, f64) {
    let bar = window.last().unwrap_or(observe);
    (bar.date, bar.close)
}

/// Three decimals, snapped to zero below 0.001 in magnitude.
fn round_r(r: f64) -> f64 {
    let rounded = (r * 1000.0).round() / 1000.0;
    if rounded.abs() < 0.001 { 0.0 } else { rounded }
}

fn join_prices(prices: &[f64]) -> String {
    prices
        .iter()
        .map(|p| format!("{p:.2}"))
        .collect::<Vec<_>>()
        .join("/")
}
