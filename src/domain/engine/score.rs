//! Continuous scores used to rank symbols.

use super::{TimeSeriesEngine, EPSILON};
use crate::domain::indicator::{mean, median, rolling_mean, window, Column};
use chrono::NaiveDate;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// |z| above which a close is dropped before the zig-zag test.
const ZIGZAG_Z_LIMIT: f64 = 2.0;

/// Second anchor of `referenced_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefSubject {
    /// Close on a later date.
    Date(NaiveDate),
    /// Mean close over the N bars after the reference date.
    Bars(usize),
}

impl TimeSeriesEngine {
    /// Mean absolute deviation of closes over median candle body for the
    /// last `period` bars. Smaller is tighter.
    pub fn consolidation(&self, period: usize) -> Option<f64> {
        let bars = &self.series().bars;
        if period == 0 || bars.len() < period {
            return None;
        }
        let recent = &bars[bars.len() - period..];
        let closes: Vec<f64> = recent.iter().map(|b| b.close).collect();
        let centre = mean(&closes)?;
        let deviation: Vec<f64> = closes.iter().map(|c| (c - centre).abs()).collect();
        let bodies: Vec<f64> = recent.iter().map(|b| (b.open - b.close).abs()).collect();
        Some(mean(&deviation)? / median(&bodies)?.max(EPSILON))
    }

    /// Fraction of the last `period` bars on which the normalised spread of
    /// EMA(ema_len), EMA100 and EMA200 is above its own `period`-bar mean.
    pub fn ema_attraction(&self, ema_len: usize, period: usize) -> Option<f64> {
        let short = self.ema(ema_len);
        let e100 = self.ema(100);
        let e150 = self.ema(150);
        let e200 = self.ema(200);

        let spread: Column = (0..self.len())
            .map(|i| {
                let (s, a, m, b) = (short[i]?, e100[i]?, e150[i]?, e200[i]?);
                let total = (s - a).abs() + (s - b).abs() + (a - b).abs();
                Some(total / m.abs().max(EPSILON))
            })
            .collect();
        let spread_mean = rolling_mean(&spread, period);

        let spread = window(&spread, self.len(), period)?;
        let spread_mean = window(&spread_mean, self.len(), period)?;
        let above = spread
            .iter()
            .zip(&spread_mean)
            .filter(|(s, m)| s > m)
            .count();
        Some(above as f64 / period as f64)
    }

    /// Sign changes of EMA(fast) - EMA(slow) across the last `period` bars.
    pub fn ema_entanglement(&self, fast: usize, slow: usize, period: usize) -> Option<usize> {
        let fast = window(&self.ema(fast), self.len(), period)?;
        let slow = window(&self.ema(slow), self.len(), period)?;
        let above: Vec<bool> = fast.iter().zip(&slow).map(|(f, s)| f > s).collect();
        Some(above.windows(2).filter(|w| w[0] != w[1]).count())
    }

    /// p-value of a chi-square independence test between half of the window
    /// and side of the mean. Small values mean a one-sided drift, values near
    /// one mean price keeps crossing its mean.
    pub fn zigzag_score(&self, days: usize) -> Option<f64> {
        let closes = window(&self.column_of_closes(), self.len(), days)?;
        let centre = mean(&closes)?;
        let spread = (closes.iter().map(|c| (c - centre).powi(2)).sum::<f64>()
            / closes.len() as f64)
            .sqrt();

        let kept: Vec<f64> = if spread > EPSILON {
            closes
                .into_iter()
                .filter(|c| ((c - centre) / spread).abs() <= ZIGZAG_Z_LIMIT)
                .collect()
        } else {
            closes
        };
        if kept.len() < 2 {
            return None;
        }

        let mid = mean(&kept)?;
        let (first, second) = kept.split_at(kept.len() / 2);
        let count = |half: &[f64]| {
            let above = half.iter().filter(|&&c| c > mid).count() as f64;
            (above, half.len() as f64 - above)
        };
        let (a, b) = count(first);
        let (c, d) = count(second);

        let margins = (a + b) * (c + d) * (a + c) * (b + d);
        if margins == 0.0 {
            return Some(1.0);
        }
        let total = a + b + c + d;
        let chi2 = total * (a * d - b * c).powi(2) / margins;
        let dist = ChiSquared::new(1.0).ok()?;
        Some(1.0 - dist.cdf(chi2))
    }

    /// Fractional change from the close on `reference` to the close on a
    /// later date, or to the mean close of the next N bars.
    pub fn referenced_change(&self, reference: NaiveDate, subject: RefSubject) -> Option<f64> {
        let series = self.series();
        let start = series.index_of(reference)?;
        let base = series.bars[start].close;

        let target = match subject {
            RefSubject::Date(date) => series.get_bar(date)?.close,
            RefSubject::Bars(n) => {
                let following = series.bars.get(start + 1..start + 1 + n)?;
                let closes: Vec<f64> = following.iter().map(|b| b.close).collect();
                mean(&closes)?
            }
        };
        Some((target - base) / base.abs().max(EPSILON))
    }

    /// Return over the last `period` bars less `benchmark`.
    pub fn performance(&self, period: usize, benchmark: f64) -> Option<f64> {
        let len = self.len();
        if len <= period {
            return None;
        }
        let then = self.series().bars[len - 1 - period].close;
        let now = self.last_close()?;
        Some((now - then) / then.abs().max(EPSILON) - benchmark)
    }

    /// Span from the lowest low to the highest high of the last `days` bars
    /// as a fraction of the low, negative when the high came first.
    pub fn trading_uprange(&self, days: usize) -> Option<f64> {
        let bars = &self.series().bars;
        if days == 0 || bars.len() < days {
            return None;
        }
        let recent = &bars[bars.len() - days..];

        let (high_at, high) = recent
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, b)| {
                if b.high > best.1 { (i, b.high) } else { best }
            });
        let (low_at, low) = recent
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |best, (i, b)| {
                if b.low < best.1 { (i, b.low) } else { best }
            });

        let range = (high - low) / low.abs().max(EPSILON);
        Some(if high_at < low_at { -range } else { range })
    }

    fn column_of_closes(&self) -> Column {
        self.series().bars.iter().map(|b| Some(b.close)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use approx::assert_relative_eq;

    fn alternating(n: usize, low: f64, high: f64) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { low } else { high }).collect()
    }

    #[test]
    fn consolidation_ratio() {
        let mut series = series_from_closes(&alternating(30, 100.0, 102.0));
        for bar in &mut series.bars {
            bar.open = bar.close - 1.0;
        }
        let engine = TimeSeriesEngine::new(series);
        assert_relative_eq!(engine.consolidation(20).unwrap(), 1.0, epsilon = 1e-12);
        assert!(engine.consolidation(31).is_none());
    }

    #[test]
    fn ema_attraction_on_widening_ramp() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(100)));
        assert_relative_eq!(engine.ema_attraction(10, 20).unwrap(), 1.0);
        let short = TimeSeriesEngine::new(series_from_closes(&rising(30)));
        assert!(short.ema_attraction(10, 20).is_none());
    }

    #[test]
    fn ema_entanglement_counts_crossings() {
        let steady = TimeSeriesEngine::new(series_from_closes(&rising(40)));
        assert_eq!(steady.ema_entanglement(2, 5, 10), Some(0));

        let choppy = TimeSeriesEngine::new(series_from_closes(&alternating(40, 100.0, 110.0)));
        assert_eq!(choppy.ema_entanglement(2, 5, 10), Some(9));
    }

    #[test]
    fn zigzag_separates_trend_from_chop() {
        let trend = TimeSeriesEngine::new(series_from_closes(&rising(60)));
        assert!(trend.zigzag_score(40).unwrap() < 0.01);

        let chop = TimeSeriesEngine::new(series_from_closes(&alternating(60, 100.0, 102.0)));
        assert_relative_eq!(chop.zigzag_score(40).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn referenced_change_by_date_and_bar_count() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(40)));
        let reference = start_date();
        let later = NaiveDate::from_ymd_opt(2020, 1, 11).unwrap();

        assert_relative_eq!(
            engine.referenced_change(reference, RefSubject::Date(later)).unwrap(),
            0.1
        );
        assert_relative_eq!(
            engine.referenced_change(reference, RefSubject::Bars(2)).unwrap(),
            0.015
        );
        let absent = NaiveDate::from_ymd_opt(2019, 12, 1).unwrap();
        assert!(engine.referenced_change(absent, RefSubject::Bars(2)).is_none());
        assert!(engine.referenced_change(reference, RefSubject::Bars(40)).is_none());
    }

    #[test]
    fn referenced_change_of_equal_closes_is_zero() {
        let engine = TimeSeriesEngine::new(series_from_closes(&[42.0; 20]));
        let later = NaiveDate::from_ymd_opt(2020, 1, 10).unwrap();
        assert_eq!(
            engine.referenced_change(start_date(), RefSubject::Date(later)),
            Some(0.0)
        );
    }

    #[test]
    fn performance_against_benchmark() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(40)));
        assert_relative_eq!(engine.performance(10, 0.0).unwrap(), 10.0 / 129.0);
        assert_relative_eq!(engine.performance(10, 0.05).unwrap(), 10.0 / 129.0 - 0.05);
        assert!(engine.performance(40, 0.0).is_none());
    }

    #[test]
    fn trading_uprange_sign_follows_order() {
        let up = TimeSeriesEngine::new(series_from_closes(&rising(20)));
        assert_relative_eq!(up.trading_uprange(10).unwrap(), 10.0 / 109.5);

        let down = TimeSeriesEngine::new(series_from_closes(&falling(20)));
        assert!(down.trading_uprange(10).unwrap() < 0.0);
    }
}
