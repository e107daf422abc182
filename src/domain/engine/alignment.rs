//! Moving-average alignment predicates.

use super::TimeSeriesEngine;
use crate::domain::indicator::{window, IndicatorType};
use std::borrow::Cow;

/// Operand of an alignment test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Line {
    Ema(usize),
    VolumeSma(usize),
    /// Constant horizontal level.
    Level(f64),
}

impl Line {
    fn values<'a>(&self, engine: &'a TimeSeriesEngine) -> Cow<'a, [Option<f64>]> {
        match *self {
            Line::Ema(span) => engine.ema(span),
            Line::VolumeSma(span) => engine.column(IndicatorType::VolumeSma(span)),
            Line::Level(level) => Cow::Owned(vec![Some(level); engine.len()]),
        }
    }
}

/// EMA pairs that must agree for `in_uptrend`.
const UPTREND_PAIRS: [(usize, usize); 3] = [(20, 50), (50, 100), (100, 200)];

/// Bars inspected by `in_uptrend_launch`.
const LAUNCH_BARS: usize = 4;

impl TimeSeriesEngine {
    /// +1 when EMA(fast) sits above EMA(slow) on at least `cutoff` of the
    /// trailing `window` bars, -1 when it sits below that often, else 0.
    pub fn parallel_ema(&self, fast: usize, slow: usize, window: usize, cutoff: f64) -> Option<i32> {
        self.parallel_lines(Line::Ema(fast), Line::Ema(slow), window, cutoff, self.len())
    }

    /// `parallel_ema` over volume means of the same nominal lengths.
    pub fn parallel_volume(
        &self,
        fast: usize,
        slow: usize,
        window: usize,
        cutoff: f64,
    ) -> Option<i32> {
        self.parallel_lines(
            Line::VolumeSma(fast),
            Line::VolumeSma(slow),
            window,
            cutoff,
            self.len(),
        )
    }

    /// Alignment of two lines over the `window` bars ending before `end`.
    pub fn parallel_lines(
        &self,
        a: Line,
        b: Line,
        window_len: usize,
        cutoff: f64,
        end: usize,
    ) -> Option<i32> {
        let a = window(&a.values(self), end, window_len)?;
        let b = window(&b.values(self), end, window_len)?;
        Some(alignment(&a, &b, cutoff))
    }

    /// Strict `slow < mid < fast` stack at the last bar (`window == 0`) or on
    /// at least `cutoff` of the trailing `window` bars.
    pub fn three_layer(
        &self,
        fast: usize,
        mid: usize,
        slow: usize,
        window_len: usize,
        cutoff: f64,
    ) -> Option<bool> {
        let n = window_len.max(1);
        let fast = window(&self.ema(fast), self.len(), n)?;
        let mid = window(&self.ema(mid), self.len(), n)?;
        let slow = window(&self.ema(slow), self.len(), n)?;

        let stacked = (0..n)
            .filter(|&i| slow[i] < mid[i] && mid[i] < fast[i])
            .count();

        if window_len == 0 {
            Some(stacked == 1)
        } else {
            Some(stacked as f64 / n as f64 >= cutoff)
        }
    }

    /// Long-term trend as of `blind` bars before the end.
    ///
    /// +1 requires EMA200 at or above its 10-bar mean and every pair of
    /// (20,50), (50,100), (100,200) aligned upward; -1 when every pair is
    /// aligned downward; 0 otherwise.
    pub fn in_uptrend(&self, window_len: usize, cutoff: f64, blind: usize) -> Option<i32> {
        let end = self.len().checked_sub(blind)?;
        if end == 0 {
            return None;
        }

        let ema200 = self.ema(200)[end - 1]?;
        let ema200_mean = self.column(IndicatorType::EmaSma {
            span: 200,
            window: super::SLOPE_WINDOW,
        })[end - 1]?;
        let rising = ema200 >= ema200_mean;

        let mut signals = Vec::with_capacity(UPTREND_PAIRS.len());
        for (fast, slow) in UPTREND_PAIRS {
            signals.push(self.parallel_lines(
                Line::Ema(fast),
                Line::Ema(slow),
                window_len,
                cutoff,
                end,
            )?);
        }

        if rising && signals.iter().all(|&s| s == 1) {
            Some(1)
        } else if signals.iter().all(|&s| s == -1) {
            Some(-1)
        } else {
            Some(0)
        }
    }

    /// +1 when EMA20 > EMA50 > EMA100 first holds on the last bar of the
    /// trailing four.
    pub fn in_uptrend_launch(&self) -> Option<i32> {
        let n = self.len();
        let e20 = window(&self.ema(20), n, LAUNCH_BARS)?;
        let e50 = window(&self.ema(50), n, LAUNCH_BARS)?;
        let e100 = window(&self.ema(100), n, LAUNCH_BARS)?;

        let stacked: Vec<bool> = (0..LAUNCH_BARS)
            .map(|i| e20[i] > e50[i] && e50[i] > e100[i])
            .collect();
        let (last, earlier) = stacked.split_last()?;
        Some(if *last && earlier.iter().all(|s| !s) { 1 } else { 0 })
    }
}

/// Symmetric alignment vote; `alignment(a, b) == -alignment(b, a)`.
fn alignment(a: &[f64], b: &[f64], cutoff: f64) -> i32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0;
    }
    let above = (0..n).filter(|&i| a[i] > b[i]).count() as f64 / n as f64;
    let below = (0..n).filter(|&i| a[i] < b[i]).count() as f64 / n as f64;

    if above >= cutoff && above > below {
        1
    } else if below >= cutoff && below > above {
        -1
    } else {
        0
    }
}
