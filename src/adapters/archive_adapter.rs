//! Tab-delimited price archive: one `{symbol}.txt` file per symbol.

use crate::domain::dates::{is_absent, parse_lenient};
use crate::domain::error::ScanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::Series;
use crate::ports::data_port::PriceArchive;
use csv::StringRecord;
use std::path::PathBuf;
use tracing::debug;

const DATE_HEADERS: [&str; 2] = ["date", "Date"];

/// Accepted names for open, high, low, close and volume.
const BAR_SCHEMAS: [[&str; 5]; 2] = [
    ["1. open", "2. high", "3. low", "4. close", "5. volume"],
    ["Open", "High", "Low", "Close", "Volume"],
];

pub struct ArchiveAdapter {
    base_path: PathBuf,
}

impl ArchiveAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn archive_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.txt"))
    }
}

/// Column positions of date, open, high, low, close and volume.
fn locate_columns(headers: &StringRecord) -> Option<[usize; 6]> {
    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let date = DATE_HEADERS.iter().find_map(|name| position(*name))?;
    BAR_SCHEMAS.iter().find_map(|schema| {
        let mut columns = [date; 6];
        for (slot, name) in columns[1..].iter_mut().zip(schema) {
            *slot = position(*name)?;
        }
        Some(columns)
    })
}

fn parse_bar(record: &StringRecord, columns: &[usize; 6]) -> Option<OhlcvBar> {
    let field = |i: usize| record.get(columns[i]).filter(|raw| !is_absent(raw));
    let number = |i: usize| field(i)?.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    Some(OhlcvBar {
        date: parse_lenient(field(0)?)?,
        open: number(1)?,
        high: number(2)?,
        low: number(3)?,
        close: number(4)?,
        volume: number(5)?,
    })
}

impl PriceArchive for ArchiveAdapter {
    fn load(&self, symbol: &str) -> Result<Series, ScanError> {
        let path = self.archive_path(symbol);
        if !path.is_file() {
            return Err(ScanError::NotFound {
                symbol: symbol.to_string(),
                path: path.display().to_string(),
            });
        }
        let malformed = |reason: String| ScanError::Malformed {
            path: path.display().to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(&path)?;
        let headers = rdr.headers()?.clone();
        let columns = locate_columns(&headers).ok_or_else(|| {
            malformed(format!(
                "headers match no known price schema: {}",
                headers.iter().collect::<Vec<_>>().join(", ")
            ))
        })?;

        let mut bars = Vec::new();
        let mut dropped = 0usize;
        for result in rdr.records() {
            let record = result?;
            match parse_bar(&record, &columns) {
                Some(bar) if bar.is_consistent() => bars.push(bar),
                _ => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(symbol, dropped, "skipped unusable price rows");
        }

        bars.sort_by_key(|b| b.date);
        let mut unique: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }
        Ok(Series::new(symbol, unique))
    }
}
