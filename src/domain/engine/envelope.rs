//! Location of price relative to bands and averages.

use super::{TimeSeriesEngine, EPSILON, SLOPE_WINDOW};
use crate::domain::indicator::{last_value, IndicatorType};

/// EMAs tried by `hit_ema_support` when no span is given.
const SUPPORT_SPANS: [usize; 3] = [100, 150, 200];

/// Cutoff for the EMA3-above-support test.
const SUPPORT_CUTOFF: f64 = 0.95;

impl TimeSeriesEngine {
    /// Lowest low of the last `days` bars expressed as a position inside the
    /// Bollinger band at the last bar: 0 at the lower band, 1 at the upper.
    pub fn bb_distance(&self, days: usize) -> Option<f64> {
        let bars = &self.series().bars;
        if days == 0 || bars.len() < days {
            return None;
        }
        let upper = last_value(&self.column(IndicatorType::BollingerUpper))?;
        let lower = last_value(&self.column(IndicatorType::BollingerLower))?;
        let lowest = bars[bars.len() - days..]
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        Some((lowest - lower) / (upper - lower).max(EPSILON))
    }

    /// Lower band at or above its 10-bar mean.
    pub fn bb_uptrend(&self) -> Option<bool> {
        let lower = last_value(&self.column(IndicatorType::BollingerLower))?;
        let mean = last_value(&self.column(IndicatorType::BollingerLowerSma(SLOPE_WINDOW)))?;
        Some(lower >= mean)
    }

    /// (close - SMA(span)) / close at the last bar.
    pub fn sma_distance(&self, span: usize) -> Option<f64> {
        let close = self.last_close()?;
        let sma = last_value(&self.column(IndicatorType::Sma(span)))?;
        Some((close - sma) / close.abs().max(EPSILON))
    }

    /// The last bar's low-to-close range straddles EMA(span).
    pub fn ema_slice(&self, span: usize) -> Option<bool> {
        let bar = self.series().last()?;
        let ema = last_value(&self.ema(span))?;
        Some(bar.low <= ema && ema <= bar.close)
    }

    /// Price dipped onto EMA(span) after riding above it; span 0 tries the
    /// 100, 150 and 200 EMAs.
    pub fn hit_ema_support(&self, span: usize, window: usize) -> Option<bool> {
        if span == 0 {
            return Some(
                SUPPORT_SPANS
                    .iter()
                    .any(|&s| self.hit_single_ema(s, window) == Some(true)),
            );
        }
        self.hit_single_ema(span, window)
    }

    fn hit_single_ema(&self, span: usize, window: usize) -> Option<bool> {
        let slice = self.ema_slice(span)?;
        let riding = self.parallel_ema(3, span, window, SUPPORT_CUTOFF)?;
        Some(slice && riding == 1)
    }
}
