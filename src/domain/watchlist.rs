//! Watch-list attribute table: row clean-up, header synthesis, parallel
//! ingestion of price series, and backtest binding.

use crate::domain::chart_batch::ChartSource;
use crate::domain::engine::TimeSeriesEngine;
use crate::domain::error::ScanError;
use crate::domain::series::Series;
use crate::domain::table::{Cell, Table};
use crate::domain::trade::{self, EntryMode, Strategy, TradeOutcome, TradeParams};
use crate::ports::data_port::PriceArchive;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Watch-list column names the pipeline knows about.
pub mod columns {
    pub const SYMBOL: &str = "Symbol";
    pub const TICKER: &str = "Ticker";
    pub const INDUSTRY: &str = "Industry";
    pub const SECTOR: &str = "Sector";
    pub const DATE_ADDED: &str = "Date Added";
    pub const DATE_SOLD: &str = "Date Sold";
    pub const NEXT_EPS: &str = "Next EPS Report Date";
    pub const ZACKS_RANK: &str = "Zacks Rank";
    pub const VALUE_SCORE: &str = "Value Score";
    pub const GROWTH_SCORE: &str = "Growth Score";
    pub const BROKERS: &str = "# of Brokers in Rating";
    pub const BUY_RATINGS: &str = "# Rating Strong Buy or Buy";
    pub const LTG: &str = "Long-Term Growth Consensus Est.";
    pub const PE: &str = "P/E";
    pub const PEG: &str = "PEG Ratio";
    pub const EXIT_PRICE: &str = "exit Price";
    pub const HEADER: &str = "header";
    pub const ANNOTATION: &str = "annotation";
    pub const SORT: &str = "Sort";
    pub const PL: &str = "PL";
}

use columns::*;

const EXCLUDED_INDUSTRY: &str = "Oil and Gas";

/// Consecutive symbols lacking the backtest date before the date is
/// treated as a non-trading day.
pub const MAX_CONSECUTIVE_MISSES: usize = 10;

pub const DEFAULT_EXTENSION: usize = 40;

/// `--backtest_date YYYY-MM-DD[,extension,strategy]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestSpec {
    pub date: NaiveDate,
    /// Bars after the date kept for plotting; also the holding window.
    pub extension: usize,
    pub strategy: Strategy,
}

impl FromStr for BacktestSpec {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let date = NaiveDate::parse_from_str(parts[0], "%Y-%m-%d").map_err(|_| {
            ScanError::option(
                "backtest_date",
                format!("'{}' is not a YYYY-MM-DD date", parts[0]),
            )
        })?;
        let extension = match parts.get(1) {
            Some(raw) if !raw.is_empty() => raw.parse().map_err(|_| {
                ScanError::option("backtest_date", format!("extension '{raw}' is not a count"))
            })?,
            _ => DEFAULT_EXTENSION,
        };
        let strategy = match parts.get(2) {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => Strategy::Target(2.0),
        };
        if parts.len() > 3 {
            return Err(ScanError::option(
                "backtest_date",
                "expected at most date,extension,strategy",
            ));
        }
        Ok(BacktestSpec {
            date,
            extension,
            strategy,
        })
    }
}

/// Ingestion settings resolved from config and command line.
#[derive(Debug, Clone, Default)]
pub struct IngestSettings {
    pub workers: usize,
    pub exclude_sectors: Vec<String>,
    pub backtest: Option<BacktestSpec>,
}

/// Engine over the screening scope plus the bars shown on charts.
#[derive(Debug, Clone)]
pub struct ChartEntry {
    pub engine: TimeSeriesEngine,
    pub plot: Series,
}

/// What one worker learned about one row.
enum Loaded {
    Dropped,
    /// The backtest date is absent from the series.
    MissingDate,
    Kept {
        entry: ChartEntry,
        trade: Option<TradeOutcome>,
    },
}

#[derive(Debug, Clone)]
pub struct AttributeTable {
    table: Table,
    charts: HashMap<String, ChartEntry>,
}

impl AttributeTable {
    /// Cleans a raw watch-list and synthesises chart captions. `source`
    /// names the watch-list in errors.
    pub fn new(mut table: Table, source: &str, sort_date_added: bool) -> Result<Self, ScanError> {
        if !table.has_column(SYMBOL) {
            if table.has_column(TICKER) {
                table.rename_column(TICKER, SYMBOL);
            } else {
                return Err(ScanError::MissingSymbolColumn {
                    file: source.to_string(),
                });
            }
        }
        table.move_to_front(SYMBOL);

        let keep: Vec<bool> = (0..table.len())
            .map(|r| {
                let symbol = table.text(r, SYMBOL);
                let excluded = table
                    .text(r, INDUSTRY)
                    .is_some_and(|i| i.contains(EXCLUDED_INDUSTRY));
                if excluded {
                    debug!(?symbol, "industry excluded");
                } else if symbol.is_none() {
                    debug!(row = r, "row without symbol");
                }
                symbol.is_some() && !excluded
            })
            .collect();
        table.retain(|r| keep[r]);

        for name in [DATE_ADDED, DATE_SOLD, NEXT_EPS] {
            if let Some(cells) = table.column(name) {
                let parsed = cells
                    .iter()
                    .map(|c| c.as_date().map_or(Cell::Missing, Cell::Date))
                    .collect();
                table.set_column(name, parsed);
            }
        }

        if sort_date_added && table.has_column(DATE_ADDED) {
            let keys: Vec<Option<NaiveDate>> =
                (0..table.len()).map(|r| table.date(r, DATE_ADDED)).collect();
            table.sort_rows_by(|a, b| missing_last(keys[a], keys[b], Ord::cmp));
        } else {
            let keys: Vec<String> = (0..table.len())
                .map(|r| table.text(r, SYMBOL).unwrap_or_default())
                .collect();
            table.sort_rows_by(|a, b| keys[a].cmp(&keys[b]));
        }

        let headers = (0..table.len()).map(|r| text_cell(header(&table, r))).collect();
        let annotations = (0..table.len())
            .map(|r| text_cell(annotation(&table, r)))
            .collect();
        table.set_column(HEADER, headers);
        table.set_column(ANNOTATION, annotations);

        Ok(AttributeTable {
            table,
            charts: HashMap::new(),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn symbol(&self, row: usize) -> Option<String> {
        self.table.text(row, SYMBOL)
    }

    pub fn chart(&self, symbol: &str) -> Option<&ChartEntry> {
        self.charts.get(symbol)
    }

    /// Test-scope engine for `row`, once ingested.
    pub fn engine(&self, row: usize) -> Option<&TimeSeriesEngine> {
        self.symbol(row)
            .and_then(|s| self.charts.get(&s))
            .map(|c| &c.engine)
    }

    /// Loads every row's series on a private pool of `settings.workers`
    /// threads, each owning one contiguous block of rows, then merges the
    /// blocks in order. Rows whose series cannot be screened are dropped.
    pub fn ingest(
        &mut self,
        archive: &dyn PriceArchive,
        settings: &IngestSettings,
    ) -> Result<(), ScanError> {
        let jobs: Vec<(String, Option<String>)> = (0..self.table.len())
            .map(|r| {
                (
                    self.symbol(r).unwrap_or_default(),
                    self.table.text(r, SECTOR),
                )
            })
            .collect();
        let workers = settings.workers.max(1);
        let block = jobs.len().div_ceil(workers).max(1);
        info!(rows = jobs.len(), workers, "loading price series");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ScanError::ConfigInvalid {
                section: "scan".into(),
                key: "workers".into(),
                reason: e.to_string(),
            })?;
        let blocks: Vec<Vec<Loaded>> = pool.install(|| {
            jobs.par_chunks(block)
                .map(|chunk| {
                    chunk
                        .iter()
                        .map(|(symbol, sector)| load_row(archive, settings, symbol, sector.as_deref()))
                        .collect()
                })
                .collect()
        });

        self.merge(blocks.into_iter().flatten().collect(), settings)
    }

    fn merge(&mut self, loaded: Vec<Loaded>, settings: &IngestSettings) -> Result<(), ScanError> {
        let mut keep = vec![false; loaded.len()];
        let mut misses = 0;

        for (row, outcome) in loaded.into_iter().enumerate() {
            let (entry, trade) = match outcome {
                Loaded::Dropped => continue,
                Loaded::MissingDate => {
                    misses += 1;
                    let date = settings.backtest.map(|b| b.date).unwrap_or_default();
                    if misses >= MAX_CONSECUTIVE_MISSES {
                        return Err(ScanError::NotTradingDay {
                            date: date.to_string(),
                            misses,
                        });
                    }
                    warn!(symbol = ?self.symbol(row), %date, "backtest date missing, row dropped");
                    continue;
                }
                Loaded::Kept { entry, trade } => (entry, trade),
            };
            misses = 0;

            if let (Some(spec), Some(trade)) = (settings.backtest, trade) {
                match trade {
                    TradeOutcome::Missing => {
                        debug!(symbol = ?self.symbol(row), "entry did not fire, row dropped");
                        continue;
                    }
                    TradeOutcome::Closed {
                        r,
                        exit_date,
                        key_prices,
                        ..
                    } => {
                        self.table.set(row, PL, Cell::Number(r));
                        self.table.set(row, EXIT_PRICE, Cell::Text(key_prices));
                        self.table.set(row, DATE_SOLD, Cell::Date(exit_date));
                        self.table.set(row, DATE_ADDED, Cell::Date(spec.date));
                    }
                }
            }

            if let Some(symbol) = self.symbol(row) {
                self.charts.insert(symbol, entry);
                keep[row] = true;
            }
        }

        self.table.retain(|r| keep[r]);
        info!(rows = self.table.len(), "series ready");
        Ok(())
    }

    /// Chart inputs for the surviving rows, in table order.
    pub fn chart_sources(&self) -> Vec<ChartSource<'_>> {
        let column = |name| self.table.column(name).unwrap_or(&[]);
        let symbols = column(SYMBOL);
        let headers = column(HEADER);
        let annotations = column(ANNOTATION);

        symbols
            .iter()
            .enumerate()
            .filter_map(|(r, cell)| {
                let Cell::Text(symbol) = cell else {
                    return None;
                };
                let entry = self.charts.get(symbol)?;
                Some(ChartSource {
                    symbol,
                    header: text_of(headers.get(r)),
                    annotation: text_of(annotations.get(r)),
                    series: &entry.plot,
                })
            })
            .collect()
    }
}

fn text_cell(text: String) -> Cell {
    if text.is_empty() {
        Cell::Missing
    } else {
        Cell::Text(text)
    }
}

fn text_of(cell: Option<&Cell>) -> &str {
    match cell {
        Some(Cell::Text(s)) => s,
        _ => "",
    }
}

/// Orders present values by `cmp`, absent ones last.
pub(crate) fn missing_last<T, F>(a: Option<T>, b: Option<T>, cmp: F) -> Ordering
where
    F: FnOnce(&T, &T) -> Ordering,
{
    match (a, b) {
        (Some(a), Some(b)) => cmp(&a, &b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn integer(table: &Table, row: usize, name: &str) -> Option<i64> {
    table.number(row, name).map(|v| v.round() as i64)
}

/// `zr{rank} {value}/{growth} br{buy}/{brokers} ltg{ltg}`, skipping
/// fragments whose inputs are missing.
fn header(table: &Table, row: usize) -> String {
    let mut fragments = Vec::new();
    if let Some(rank) = integer(table, row, ZACKS_RANK) {
        fragments.push(format!("zr{rank}"));
    }
    if let (Some(value), Some(growth)) = (
        table.text(row, VALUE_SCORE),
        table.text(row, GROWTH_SCORE),
    ) {
        fragments.push(format!("{value}/{growth}"));
    }
    if let (Some(buy), Some(brokers)) = (
        integer(table, row, BUY_RATINGS),
        integer(table, row, BROKERS),
    ) {
        fragments.push(format!("br{buy}/{brokers}"));
    }
    if let Some(ltg) = table.text(row, LTG) {
        fragments.push(format!("ltg{ltg}"));
    }
    fragments.join(" ")
}

/// `pe{pe}peg{peg}eday{next eps}`, skipping missing pieces.
fn annotation(table: &Table, row: usize) -> String {
    let mut out = String::new();
    if let Some(pe) = table.text(row, PE) {
        out.push_str(&format!("pe{pe}"));
    }
    if let Some(peg) = table.text(row, PEG) {
        out.push_str(&format!("peg{peg}"));
    }
    if let Some(eday) = table.date(row, NEXT_EPS) {
        out.push_str(&format!("eday{}", eday.format("%m/%d")));
    }
    out
}

fn load_row(
    archive: &dyn PriceArchive,
    settings: &IngestSettings,
    symbol: &str,
    sector: Option<&str>,
) -> Loaded {
    if let Some(sector) = sector {
        let lowered = sector.to_ascii_lowercase();
        if settings
            .exclude_sectors
            .iter()
            .any(|s| lowered.contains(&s.to_ascii_lowercase()))
        {
            debug!(symbol, sector, "sector excluded");
            return Loaded::Dropped;
        }
    }

    let series = match archive.load(symbol) {
        Ok(series) => series,
        Err(e) => {
            debug!(symbol, error = %e, "series unavailable");
            return Loaded::Dropped;
        }
    };

    let (test, plot, trade) = match settings.backtest {
        None => (series.clone(), series, None),
        Some(spec) => {
            let Some(at) = series.index_of(spec.date) else {
                return Loaded::MissingDate;
            };
            let params = TradeParams {
                holding: spec.extension,
                entry: EntryMode::Next,
                stop_lookback: trade::BACKTEST_STOP_LOOKBACK,
                strategy: spec.strategy,
            };
            let outcome = trade::simulate(&series, spec.date, &params);
            (
                series.prefix(at + 1),
                series.prefix(at.saturating_add(spec.extension).saturating_add(2)),
                Some(outcome),
            )
        }
    };

    if let Some(reason) = test.rejection() {
        debug!(symbol, %reason, "series rejected");
        return Loaded::Dropped;
    }

    Loaded::Kept {
        entry: ChartEntry {
            engine: TimeSeriesEngine::new(test),
            plot,
        },
        trade,
    }
}
