//! Per-symbol daily bar series with a date index.

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Minimum number of bars a series needs before it is screened.
pub const MIN_BARS: usize = 60;

/// Minimum volume of the latest bar before a series is screened.
pub const MIN_LAST_VOLUME: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
    date_index: HashMap<NaiveDate, usize>,
}

impl Series {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Self {
        let date_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Self {
            symbol: symbol.into(),
            bars,
            date_index,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn get_bar(&self, date: NaiveDate) -> Option<&OhlcvBar> {
        self.date_index.get(&date).map(|&i| &self.bars[i])
    }

    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.date_index.get(&date).copied()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Copy of the first `len` bars (clamped to the series length).
    pub fn prefix(&self, len: usize) -> Series {
        let end = len.min(self.bars.len());
        Series::new(self.symbol.clone(), self.bars[..end].to_vec())
    }

    /// Copy of the last `len` bars (clamped to the series length).
    pub fn tail(&self, len: usize) -> Series {
        let start = self.bars.len().saturating_sub(len);
        Series::new(self.symbol.clone(), self.bars[start..].to_vec())
    }

    /// Why the series cannot be screened, if anything.
    pub fn rejection(&self) -> Option<String> {
        if self.bars.len() < MIN_BARS {
            return Some(format!("{} bars, need {}", self.bars.len(), MIN_BARS));
        }
        match self.bars.last() {
            Some(bar) if bar.volume < MIN_LAST_VOLUME => Some(format!(
                "last volume {} below {}",
                bar.volume, MIN_LAST_VOLUME
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bar(date: &str, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume,
        }
    }

    fn long_series(n: usize, last_volume: f64) -> Series {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| {
                let date = start + chrono::Days::new(i as u64);
                let volume = if i + 1 == n { last_volume } else { 500_000.0 };
                make_bar(&date.format("%Y-%m-%d").to_string(), 100.0, volume)
            })
            .collect();
        Series::new("TEST", bars)
    }

    #[test]
    fn date_index_lookup() {
        let series = Series::new(
            "BHP",
            vec![
                make_bar("2024-01-01", 100.0, 1.0),
                make_bar("2024-01-02", 101.0, 1.0),
            ],
        );
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(series.index_of(date), Some(1));
        assert!((series.get_bar(date).unwrap().close - 101.0).abs() < f64::EPSILON);
        assert!(series
            .get_bar(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .is_none());
    }

    #[test]
    fn prefix_and_tail_are_clamped() {
        let series = long_series(10, 200_000.0);
        assert_eq!(series.prefix(4).len(), 4);
        assert_eq!(series.prefix(40).len(), 10);
        assert_eq!(series.tail(3).bars[0].date, series.bars[7].date);
        assert_eq!(series.tail(30).len(), 10);
    }

    #[test]
    fn prefix_rebuilds_index() {
        let series = long_series(10, 200_000.0);
        let prefix = series.prefix(3);
        assert_eq!(prefix.index_of(series.bars[5].date), None);
        assert_eq!(prefix.index_of(series.bars[2].date), Some(2));
    }

    #[test]
    fn rejection_rules() {
        assert!(long_series(59, 200_000.0).rejection().is_some());
        assert!(long_series(60, 99_999.0).rejection().is_some());
        assert!(long_series(60, 100_000.0).rejection().is_none());
    }
}
