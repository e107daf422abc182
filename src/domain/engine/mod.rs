//! Time-series engine: one symbol's bars plus derived indicator columns.
//!
//! Construction eagerly derives the columns nearly every screen consults
//! (multi-span EMAs and their 10-bar means, Bollinger bands, volume means).
//! Anything else is computed on request and handed back as an owned column;
//! the cache is never written after construction, so predicates cannot
//! disturb it.
//!
//! Predicates return `None` when the series is too short for the requested
//! window. Callers treat that as "predicate not met".

mod alignment;
mod envelope;
mod oscillator;
mod resample;
mod score;
mod support;
mod volume;

pub use alignment::Line;
pub use oscillator::Stochastic;
pub use score::RefSubject;
pub use volume::{VolumeHold, VolumeIndex};

use crate::domain::indicator::{
    atr, bollinger, calculate_ema, defined, rolling_mean, rolling_stddev, rsi, Column,
    IndicatorType,
};
use crate::domain::series::Series;
use std::borrow::Cow;
use std::collections::HashMap;

/// EMA spans derived at construction.
pub const EMA_SPANS: [usize; 9] = [2, 3, 5, 10, 20, 50, 100, 150, 200];

/// Volume mean windows derived at construction.
pub const VOLUME_SPANS: [usize; 5] = [5, 10, 15, 20, 30];

/// Window of the simple mean taken over each EMA and over the lower band.
pub const SLOPE_WINDOW: usize = 10;

/// Guard for vanishing denominators.
pub(crate) const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct TimeSeriesEngine {
    series: Series,
    columns: HashMap<IndicatorType, Column>,
}

impl TimeSeriesEngine {
    pub fn new(series: Series) -> Self {
        let closes = series.closes();
        let volumes = defined(&series.volumes());
        let mut columns = HashMap::new();

        for span in EMA_SPANS {
            let ema = calculate_ema(&closes, span);
            columns.insert(
                IndicatorType::EmaSma {
                    span,
                    window: SLOPE_WINDOW,
                },
                rolling_mean(&ema, SLOPE_WINDOW),
            );
            columns.insert(IndicatorType::Ema(span), ema);
        }

        let bands = bollinger::calculate_bollinger(
            &closes,
            bollinger::DEFAULT_PERIOD,
            bollinger::DEFAULT_MULTIPLIER,
        );
        columns.insert(
            IndicatorType::BollingerLowerSma(SLOPE_WINDOW),
            rolling_mean(&bands.lower, SLOPE_WINDOW),
        );
        columns.insert(IndicatorType::Sma(bollinger::DEFAULT_PERIOD), bands.middle);
        columns.insert(IndicatorType::Stddev(bollinger::DEFAULT_PERIOD), bands.stddev);
        columns.insert(IndicatorType::BollingerUpper, bands.upper);
        columns.insert(IndicatorType::BollingerLower, bands.lower);

        for span in VOLUME_SPANS {
            columns.insert(IndicatorType::VolumeSma(span), rolling_mean(&volumes, span));
        }

        Self { series, columns }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn symbol(&self) -> &str {
        &self.series.symbol
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.series.last().map(|b| b.close)
    }

    /// Indicator column, borrowed from the cache when it was derived at
    /// construction and computed fresh otherwise.
    pub fn column(&self, kind: IndicatorType) -> Cow<'_, [Option<f64>]> {
        match self.columns.get(&kind) {
            Some(column) => Cow::Borrowed(column.as_slice()),
            None => Cow::Owned(self.compute(kind)),
        }
    }

    pub fn ema(&self, span: usize) -> Cow<'_, [Option<f64>]> {
        self.column(IndicatorType::Ema(span))
    }

    /// Whether `kind` was derived at construction.
    pub fn is_cached(&self, kind: IndicatorType) -> bool {
        self.columns.contains_key(&kind)
    }

    fn compute(&self, kind: IndicatorType) -> Column {
        let bars = &self.series.bars;
        let closes = self.series.closes();
        match kind {
            IndicatorType::Ema(span) => calculate_ema(&closes, span),
            IndicatorType::EmaSma { span, window } => {
                rolling_mean(&self.column(IndicatorType::Ema(span)), window)
            }
            IndicatorType::Sma(period) => rolling_mean(&defined(&closes), period),
            IndicatorType::Stddev(period) => rolling_stddev(&defined(&closes), period),
            IndicatorType::BollingerUpper | IndicatorType::BollingerLower => {
                let bands = bollinger::calculate_bollinger(
                    &closes,
                    bollinger::DEFAULT_PERIOD,
                    bollinger::DEFAULT_MULTIPLIER,
                );
                if kind == IndicatorType::BollingerUpper {
                    bands.upper
                } else {
                    bands.lower
                }
            }
            IndicatorType::BollingerLowerSma(window) => {
                rolling_mean(&self.column(IndicatorType::BollingerLower), window)
            }
            IndicatorType::VolumeSma(period) => {
                rolling_mean(&defined(&self.series.volumes()), period)
            }
            IndicatorType::Atr(period) => atr::calc_atr(bars, period),
            IndicatorType::Rsi(period) => rsi::calculate_rsi(&closes, period),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::series::Series;
    use chrono::{Days, NaiveDate};

    pub fn start_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    }

    /// Bars on consecutive calendar days with a one-point range around close.
    pub fn series_from_closes(closes: &[f64]) -> Series {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                date: start_date() + Days::new(i as u64),
                open: close,
                high: close + 0.5,
                low: close - 0.5,
                close,
                volume: 1_000_000.0,
            })
            .collect();
        Series::new("TEST", bars)
    }

    pub fn rising(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    pub fn falling(n: usize) -> Vec<f64> {
        (0..n).map(|i| 500.0 - i as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn construction_caches_expected_columns() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(30)));
        for span in EMA_SPANS {
            assert!(engine.is_cached(IndicatorType::Ema(span)));
            assert!(engine.is_cached(IndicatorType::EmaSma {
                span,
                window: SLOPE_WINDOW
            }));
        }
        assert!(engine.is_cached(IndicatorType::BollingerUpper));
        assert!(engine.is_cached(IndicatorType::BollingerLowerSma(SLOPE_WINDOW)));
        assert!(engine.is_cached(IndicatorType::VolumeSma(20)));
        assert!(!engine.is_cached(IndicatorType::Ema(7)));
    }

    #[test]
    fn on_demand_column_matches_cached_derivation() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(40)));
        let cached = engine.ema(20).into_owned();
        let fresh = engine.compute(IndicatorType::Ema(20));
        assert_eq!(cached, fresh);
        assert!(!engine.is_cached(IndicatorType::Atr(14)));
        assert_eq!(engine.column(IndicatorType::Atr(14)).len(), 40);
        assert!(!engine.is_cached(IndicatorType::Atr(14)));
    }

    #[test]
    fn sma_prefix_is_undefined() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(30)));
        let sma = engine.column(IndicatorType::Sma(20));
        assert!(sma[18].is_none());
        assert!(sma[19].is_some());
    }

    #[test]
    fn empty_series_is_harmless() {
        let engine = TimeSeriesEngine::new(series_from_closes(&[]));
        assert!(engine.is_empty());
        assert_eq!(engine.last_close(), None);
        assert_eq!(engine.parallel_ema(20, 50, 10, 0.8), None);
    }
}
