#![allow(dead_code)]

use barscan::domain::chart_batch::ChartPage;
use barscan::domain::error::ScanError;
pub use barscan::domain::ohlcv::OhlcvBar;
use barscan::domain::series::Series;
use barscan::domain::table::Table;
use barscan::domain::watchlist::AttributeTable;
use barscan::ports::chart_port::ChartPort;
use barscan::ports::data_port::PriceArchive;
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockArchive {
    pub data: HashMap<String, Series>,
}

impl MockArchive {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: Series) -> Self {
        self.data.insert(series.symbol.clone(), series);
        self
    }
}

impl PriceArchive for MockArchive {
    fn load(&self, symbol: &str) -> Result<Series, ScanError> {
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| ScanError::NotFound {
                symbol: symbol.to_string(),
                path: format!("mock/{symbol}.txt"),
            })
    }
}

/// Records page file names instead of writing anything.
pub struct RecordingCharts {
    pub pages: Mutex<Vec<(String, usize)>>,
}

impl RecordingCharts {
    pub fn new() -> Self {
        Self {
            pages: Mutex::new(Vec::new()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

impl ChartPort for RecordingCharts {
    fn render(&self, page: &ChartPage, path: &str) -> Result<(), ScanError> {
        assert!(path.ends_with(&page.file_name));
        self.pages
            .lock()
            .unwrap()
            .push((page.file_name.clone(), page.panels.len()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day0() -> NaiveDate {
    date(2020, 1, 1)
}

/// Bar with a one-point range around `close`.
pub fn make_bar(date: NaiveDate, close: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open: close,
        high: close + 0.5,
        low: close - 0.5,
        close,
        volume: 1_000_000.0,
    }
}

/// Consecutive calendar days from `start`.
pub fn series_from(symbol: &str, start: NaiveDate, closes: &[f64]) -> Series {
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_bar(start + Days::new(i as u64), close))
        .collect();
    Series::new(symbol, bars)
}

pub fn series(symbol: &str, closes: &[f64]) -> Series {
    series_from(symbol, day0(), closes)
}

pub fn flat(n: usize, level: f64) -> Vec<f64> {
    vec![level; n]
}

pub fn falling(n: usize) -> Vec<f64> {
    (0..n).map(|i| 500.0 - i as f64).collect()
}

/// 10, 11, ..., 20 then flat at 20 up to 200 bars.
pub fn rise_then_flat() -> Vec<f64> {
    let mut closes: Vec<f64> = (10..=20).map(f64::from).collect();
    closes.extend(std::iter::repeat_n(20.0, 189));
    closes
}

/// Watch-list with the given headers and rows.
pub fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    let records: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect();
    Table::from_records(&headers, &records)
}

/// Symbol-only watch-list.
pub fn symbols_table(symbols: &[&str]) -> Table {
    let rows: Vec<Vec<&str>> = symbols.iter().map(|s| vec![*s]).collect();
    let rows: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();
    table(&["Symbol"], &rows)
}

pub fn symbols(at: &AttributeTable) -> Vec<String> {
    (0..at.len()).map(|r| at.symbol(r).unwrap()).collect()
}
