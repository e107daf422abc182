//! Momentum and oscillator predicates.

use super::TimeSeriesEngine;
use crate::domain::indicator::{last_value, macd, stochastic, window, IndicatorType};

/// Bars inspected for a single MACD crossing.
const MACD_LOOKBACK: usize = 8;

/// Latest reading of the fast stochastic oscillator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stochastic {
    pub k: f64,
    pub d: f64,
    /// +1 when %K just crossed above %D, -1 when it just crossed below.
    pub delta_sign: i32,
    /// (high - close) / (high - low) of the last bar.
    pub headroom: f64,
}

impl TimeSeriesEngine {
    /// 1 when the MACD histogram crossed from <= 0 to > 0 exactly once in the
    /// last eight bars, no more than `persist - 1` bars ago, while the signal
    /// line is still negative.
    pub fn macd_cross_up(&self, sspan: usize, lspan: usize, persist: usize) -> Option<i32> {
        let n = self.len();
        if n < MACD_LOOKBACK {
            return None;
        }
        let lines = macd::calculate_macd(&self.series().closes(), sspan, lspan, macd::DEFAULT_SIGNAL);
        if lines.histogram.len() != n {
            return None;
        }

        let delta = &lines.histogram[n - MACD_LOOKBACK..];
        let crossings: Vec<usize> = (1..delta.len())
            .filter(|&i| delta[i - 1] <= 0.0 && delta[i] > 0.0)
            .collect();

        let signal_negative = lines.signal[n - 1] < 0.0;
        let fired = match crossings.as_slice() {
            [at] => {
                let age = delta.len() - 1 - at;
                age < persist && signal_negative
            }
            _ => false,
        };
        Some(i32::from(fired))
    }

    /// 1 when EMA(fast) moved above EMA(slow) exactly once within the
    /// trailing `lookback` bars and is still above at the last bar.
    pub fn ema_cross_up(&self, fast: usize, slow: usize, lookback: usize) -> Option<i32> {
        if lookback < 2 {
            return None;
        }
        let fast = window(&self.ema(fast), self.len(), lookback)?;
        let slow = window(&self.ema(slow), self.len(), lookback)?;

        let above: Vec<bool> = fast.iter().zip(&slow).map(|(f, s)| f > s).collect();
        let ups = above.windows(2).filter(|w| !w[0] && w[1]).count();
        let last_above = *above.last()?;
        Some(i32::from(ups == 1 && last_above))
    }

    pub fn stochastic_cross(&self, n: usize, m: usize) -> Option<Stochastic> {
        let bars = &self.series().bars;
        let lines = stochastic::calculate_stochastic(bars, n, m);
        let len = bars.len();
        if len < 2 {
            return None;
        }

        let k = lines.k[len - 1]?;
        let d = lines.d[len - 1]?;
        let k_prev = lines.k[len - 2]?;
        let d_prev = lines.d[len - 2]?;
        let delta_sign = i32::from(k > d) - i32::from(k_prev > d_prev);

        let last = &bars[len - 1];
        let range = last.high - last.low;
        let headroom = if range > 0.0 {
            (last.high - last.close) / range
        } else {
            0.0
        };

        Some(Stochastic {
            k,
            d,
            delta_sign,
            headroom,
        })
    }

    pub fn rsi(&self, period: usize) -> Option<f64> {
        last_value(&self.column(IndicatorType::Rsi(period)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn rsi_of_rise_and_plateau_is_100() {
        let mut closes: Vec<f64> = (10..=20).map(f64::from).collect();
        closes.extend(std::iter::repeat_n(20.0, 189));
        let engine = TimeSeriesEngine::new(series_from_closes(&closes));
        assert_eq!(engine.rsi(14), Some(100.0));
        assert_eq!(engine.macd_cross_up(12, 26, 1), Some(0));
    }

    #[test]
    fn macd_cross_on_reversal() {
        let mut closes = falling(60);
        closes.push(closes[59] + 15.0);
        let engine = TimeSeriesEngine::new(series_from_closes(&closes));
        let lines = macd::calculate_macd(&engine.series().closes(), 12, 26, 9);
        let n = closes.len();
        assert!(lines.histogram[n - 2] <= 0.0);
        assert!(lines.histogram[n - 1] > 0.0);
        assert!(lines.signal[n - 1] < 0.0);

        assert_eq!(engine.macd_cross_up(12, 26, 1), Some(1));
    }

    #[test]
    fn macd_needs_eight_bars() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(7)));
        assert_eq!(engine.macd_cross_up(12, 26, 1), None);
    }

    #[test]
    fn ema_cross_up_detects_single_cross() {
        let mut closes = falling(60);
        for _ in 0..3 {
            let next = closes.last().unwrap() + 10.0;
            closes.push(next);
        }
        let engine = TimeSeriesEngine::new(series_from_closes(&closes));
        assert_eq!(engine.ema_cross_up(2, 5, 5), Some(1));
        assert_eq!(engine.ema_cross_up(2, 5, 1), None);
    }

    #[test]
    fn ema_cross_up_absent_on_steady_rise() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(60)));
        assert_eq!(engine.ema_cross_up(2, 5, 5), Some(0));
    }

    #[test]
    fn stochastic_reports_headroom() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(30)));
        let stoch = engine.stochastic_cross(14, 3).unwrap();
        // close sits 0.5 below a one-point range
        assert!((stoch.headroom - 0.5).abs() < 1e-12);
        assert!(stoch.k > 90.0);
        assert_eq!(stoch.delta_sign, 0);
    }
}
