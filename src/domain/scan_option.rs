//! Screening options and the chain that applies them.
//!
//! Options are parsed from `--key value` pairs into typed values and always
//! run in vocabulary order, whatever order they were given in. An option
//! that ranks rows writes the managed `Sort` column, drops rows that fail
//! its cutoff, then stable-sorts; rows whose score is undefined sort last.

use crate::domain::dates::parse_lenient;
use crate::domain::engine::{RefSubject, TimeSeriesEngine, VolumeHold};
use crate::domain::error::ScanError;
use crate::domain::table::Cell;
use crate::domain::watchlist::columns::*;
use crate::domain::watchlist::{missing_last, AttributeTable};
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Option keys in application order.
pub const VOCABULARY: [&str; 28] = [
    "filter_price",
    "filter_zacks",
    "sort_brokers",
    "sort_earnings_date",
    "sort_industry",
    "sort_trange",
    "filter_macd_sgl",
    "filter_ema_sgl",
    "filter_rsi",
    "filter_surging_volume",
    "filter_exploding_volume",
    "filter_consolidation_p",
    "filter_stochastic_sgl",
    "filter_parallel_ema",
    "filter_ema_3layers",
    "filter_hit_ema_support",
    "filter_bbdistance",
    "sort_rsi_std",
    "sort_ema_attraction",
    "sort_ema_entanglement",
    "filter_upward",
    "filter_horizon_slice",
    "filter_ema_slice",
    "filter_hit_horizontal_support",
    "filter_hit_horizontal_resistance",
    "sort_ema_distance",
    "sort_change_to_ref",
    "sort_performance",
];

const RSI_PERIOD: usize = 14;
const LONG_VOLUME_WINDOW: usize = 30;
const DEFAULT_LAYER_CUTOFF: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Upward {
    Trend {
        window: usize,
        cutoff: f64,
        blind: usize,
    },
    /// First bar of a fresh EMA20 > EMA50 > EMA100 stack.
    Launch,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOption {
    Price { min: f64, max: f64 },
    Zacks {
        rank: i64,
        value: Option<String>,
        growth: Option<String>,
    },
    Brokers { min_buy: f64 },
    EarningsDate,
    Industry,
    TradingRange { days: usize, cutoff: f64 },
    MacdSignal {
        sspan: usize,
        lspan: usize,
        persist: usize,
    },
    EmaSignal {
        fast: usize,
        slow: usize,
        lookback: usize,
    },
    Rsi { low: f64, high: f64 },
    SurgingVolume {
        n: usize,
        ratio: f64,
        hold: VolumeHold,
    },
    ExplodingVolume { n: usize, cutoff: f64 },
    ZigzagP { period: usize, cutoff: f64 },
    StochasticSignal { n: usize, m: usize, cutoff: f64 },
    ParallelEma {
        fast: usize,
        slow: usize,
        window: usize,
        cutoff: f64,
    },
    EmaLayers {
        fast: usize,
        mid: usize,
        slow: usize,
        window: usize,
        cutoff: f64,
    },
    HitEmaSupport { span: usize, days: usize },
    BbDistance {
        days: usize,
        cutoff: f64,
        uptrend: bool,
    },
    RsiStd { period: usize, cutoff: f64 },
    EmaAttraction { len: usize, period: usize },
    EmaEntanglement {
        fast: usize,
        slow: usize,
        span: usize,
        cutoff: f64,
    },
    Upward(Upward),
    HorizonSlice { days: usize, num: usize },
    EmaSlice { span: usize },
    HorizontalSupport {
        days: usize,
        length: usize,
        num: usize,
    },
    HorizontalResistance {
        days: usize,
        length: usize,
        num: usize,
    },
    EmaDistance { span: usize },
    ChangeToRef {
        reference: NaiveDate,
        subject: RefSubject,
    },
    Performance {
        days: usize,
        benchmark: f64,
        cutoff: Option<f64>,
        top: Option<usize>,
    },
}

/// Comma-separated option value.
struct Args<'a> {
    option: &'a str,
    parts: Vec<&'a str>,
}

impl<'a> Args<'a> {
    fn new(option: &'a str, value: &'a str, min: usize, max: usize) -> Result<Self, ScanError> {
        let parts: Vec<&str> = if value.trim().is_empty() {
            Vec::new()
        } else {
            value.split(',').map(str::trim).collect()
        };
        if parts.len() < min || parts.len() > max {
            let expected = if min == max {
                format!("{min}")
            } else {
                format!("{min} to {max}")
            };
            return Err(ScanError::option(
                option,
                format!("expected {expected} comma-separated values, got '{value}'"),
            ));
        }
        Ok(Args { option, parts })
    }

    fn get<T: FromStr>(&self, i: usize) -> Result<T, ScanError> {
        let raw = self.parts.get(i).copied().unwrap_or_default();
        raw.parse()
            .map_err(|_| ScanError::option(self.option, format!("'{raw}' is not a valid number")))
    }

    fn opt<T: FromStr>(&self, i: usize) -> Result<Option<T>, ScanError> {
        match self.parts.get(i) {
            Some(raw) if !raw.is_empty() => self.get(i).map(Some),
            _ => Ok(None),
        }
    }

    fn raw(&self, i: usize) -> Option<&'a str> {
        self.parts.get(i).copied().filter(|s| !s.is_empty())
    }
}

fn parse_flag(option: &str, raw: &str) -> Result<bool, ScanError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "uptrend" | "u" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(ScanError::option(option, format!("'{other}' is not a flag"))),
    }
}

fn parse_date(option: &str, raw: &str) -> Result<NaiveDate, ScanError> {
    parse_lenient(raw).ok_or_else(|| ScanError::option(option, format!("'{raw}' is not a date")))
}

impl ScanOption {
    /// Parses the value given for option `key`.
    pub fn parse(key: &str, value: &str) -> Result<Self, ScanError> {
        let args = |min, max| Args::new(key, value, min, max);
        let option = match key {
            "filter_price" => {
                let a = args(2, 2)?;
                ScanOption::Price {
                    min: a.get(0)?,
                    max: a.get(1)?,
                }
            }
            "filter_zacks" => {
                let a = args(1, 3)?;
                ScanOption::Zacks {
                    rank: a.get(0)?,
                    value: a.raw(1).map(str::to_ascii_uppercase),
                    growth: a.raw(2).map(str::to_ascii_uppercase),
                }
            }
            "sort_brokers" => ScanOption::Brokers {
                min_buy: args(1, 1)?.get(0)?,
            },
            "sort_earnings_date" => ScanOption::EarningsDate,
            "sort_industry" => ScanOption::Industry,
            "sort_trange" => {
                let a = args(2, 2)?;
                ScanOption::TradingRange {
                    days: a.get(0)?,
                    cutoff: a.get(1)?,
                }
            }
            "filter_macd_sgl" => {
                let a = args(3, 3)?;
                ScanOption::MacdSignal {
                    sspan: a.get(0)?,
                    lspan: a.get(1)?,
                    persist: a.get(2)?,
                }
            }
            "filter_ema_sgl" => {
                let a = args(3, 3)?;
                let lookback: usize = a.get(2)?;
                if lookback < 2 {
                    return Err(ScanError::option(key, "lookback must be at least 2"));
                }
                ScanOption::EmaSignal {
                    fast: a.get(0)?,
                    slow: a.get(1)?,
                    lookback,
                }
            }
            "filter_rsi" => {
                let a = args(2, 2)?;
                ScanOption::Rsi {
                    low: a.get(0)?,
                    high: a.get(1)?,
                }
            }
            "filter_surging_volume" => {
                let a = args(2, 3)?;
                ScanOption::SurgingVolume {
                    n: a.get(0)?,
                    ratio: a.get(1)?,
                    hold: a.raw(2).unwrap_or_default().parse()?,
                }
            }
            "filter_exploding_volume" => {
                let a = args(2, 2)?;
                ScanOption::ExplodingVolume {
                    n: a.get(0)?,
                    cutoff: a.get(1)?,
                }
            }
            "filter_consolidation_p" => {
                let a = args(2, 2)?;
                ScanOption::ZigzagP {
                    period: a.get(0)?,
                    cutoff: a.get(1)?,
                }
            }
            "filter_stochastic_sgl" => {
                let a = args(3, 3)?;
                ScanOption::StochasticSignal {
                    n: a.get(0)?,
                    m: a.get(1)?,
                    cutoff: a.get(2)?,
                }
            }
            "filter_parallel_ema" => {
                let a = args(4, 4)?;
                ScanOption::ParallelEma {
                    fast: a.get(0)?,
                    slow: a.get(1)?,
                    window: a.get(2)?,
                    cutoff: a.get(3)?,
                }
            }
            "filter_ema_3layers" => {
                let a = args(3, 5)?;
                ScanOption::EmaLayers {
                    fast: a.get(0)?,
                    mid: a.get(1)?,
                    slow: a.get(2)?,
                    window: a.opt(3)?.unwrap_or(0),
                    cutoff: a.opt(4)?.unwrap_or(DEFAULT_LAYER_CUTOFF),
                }
            }
            "filter_hit_ema_support" => {
                let a = args(2, 2)?;
                ScanOption::HitEmaSupport {
                    span: a.get(0)?,
                    days: a.get(1)?,
                }
            }
            "filter_bbdistance" => {
                let a = args(2, 3)?;
                ScanOption::BbDistance {
                    days: a.get(0)?,
                    cutoff: a.get(1)?,
                    uptrend: a.raw(2).map(|f| parse_flag(key, f)).transpose()?.unwrap_or(false),
                }
            }
            "sort_rsi_std" => {
                let a = args(2, 2)?;
                ScanOption::RsiStd {
                    period: a.get(0)?,
                    cutoff: a.get(1)?,
                }
            }
            "sort_ema_attraction" => {
                let a = args(2, 2)?;
                ScanOption::EmaAttraction {
                    len: a.get(0)?,
                    period: a.get(1)?,
                }
            }
            "sort_ema_entanglement" => {
                let a = args(4, 4)?;
                ScanOption::EmaEntanglement {
                    fast: a.get(0)?,
                    slow: a.get(1)?,
                    span: a.get(2)?,
                    cutoff: a.get(3)?,
                }
            }
            "filter_upward" if value.trim().eq_ignore_ascii_case("launch") => {
                ScanOption::Upward(Upward::Launch)
            }
            "filter_upward" => {
                let a = args(2, 3)?;
                ScanOption::Upward(Upward::Trend {
                    window: a.get(0)?,
                    cutoff: a.get(1)?,
                    blind: a.opt(2)?.unwrap_or(0),
                })
            }
            "filter_horizon_slice" => {
                let a = args(2, 2)?;
                ScanOption::HorizonSlice {
                    days: a.get(0)?,
                    num: a.get(1)?,
                }
            }
            "filter_ema_slice" => ScanOption::EmaSlice {
                span: args(1, 1)?.get(0)?,
            },
            "filter_hit_horizontal_support" | "filter_hit_horizontal_resistance" => {
                let a = args(3, 3)?;
                let (days, length, num) = (a.get(0)?, a.get(1)?, a.get(2)?);
                if key == "filter_hit_horizontal_support" {
                    ScanOption::HorizontalSupport { days, length, num }
                } else {
                    ScanOption::HorizontalResistance { days, length, num }
                }
            }
            "sort_ema_distance" => ScanOption::EmaDistance {
                span: args(1, 1)?.get(0)?,
            },
            "sort_change_to_ref" => {
                let a = args(2, 2)?;
                let reference = parse_date(key, a.raw(0).unwrap_or_default())?;
                let raw = a.raw(1).unwrap_or_default();
                let subject = match raw.parse::<usize>() {
                    Ok(n) if n > 0 => RefSubject::Bars(n),
                    _ => RefSubject::Date(parse_date(key, raw)?),
                };
                ScanOption::ChangeToRef { reference, subject }
            }
            "sort_performance" => {
                let a = args(1, 4)?;
                ScanOption::Performance {
                    days: a.get(0)?,
                    benchmark: a.opt(1)?.unwrap_or(0.0),
                    cutoff: a.opt(2)?,
                    top: a.opt(3)?,
                }
            }
            other => {
                return Err(ScanError::option(other, "unknown option"));
            }
        };
        Ok(option)
    }

    pub fn key(&self) -> &'static str {
        match self {
            ScanOption::Price { .. } => "filter_price",
            ScanOption::Zacks { .. } => "filter_zacks",
            ScanOption::Brokers { .. } => "sort_brokers",
            ScanOption::EarningsDate => "sort_earnings_date",
            ScanOption::Industry => "sort_industry",
            ScanOption::TradingRange { .. } => "sort_trange",
            ScanOption::MacdSignal { .. } => "filter_macd_sgl",
            ScanOption::EmaSignal { .. } => "filter_ema_sgl",
            ScanOption::Rsi { .. } => "filter_rsi",
            ScanOption::SurgingVolume { .. } => "filter_surging_volume",
            ScanOption::ExplodingVolume { .. } => "filter_exploding_volume",
            ScanOption::ZigzagP { .. } => "filter_consolidation_p",
            ScanOption::StochasticSignal { .. } => "filter_stochastic_sgl",
            ScanOption::ParallelEma { .. } => "filter_parallel_ema",
            ScanOption::EmaLayers { .. } => "filter_ema_3layers",
            ScanOption::HitEmaSupport { .. } => "filter_hit_ema_support",
            ScanOption::BbDistance { .. } => "filter_bbdistance",
            ScanOption::RsiStd { .. } => "sort_rsi_std",
            ScanOption::EmaAttraction { .. } => "sort_ema_attraction",
            ScanOption::EmaEntanglement { .. } => "sort_ema_entanglement",
            ScanOption::Upward(_) => "filter_upward",
            ScanOption::HorizonSlice { .. } => "filter_horizon_slice",
            ScanOption::EmaSlice { .. } => "filter_ema_slice",
            ScanOption::HorizontalSupport { .. } => "filter_hit_horizontal_support",
            ScanOption::HorizontalResistance { .. } => "filter_hit_horizontal_resistance",
            ScanOption::EmaDistance { .. } => "sort_ema_distance",
            ScanOption::ChangeToRef { .. } => "sort_change_to_ref",
            ScanOption::Performance { .. } => "sort_performance",
        }
    }

    /// Position in the application order.
    pub fn rank(&self) -> usize {
        let key = self.key();
        VOCABULARY
            .iter()
            .position(|k| *k == key)
            .unwrap_or(VOCABULARY.len())
    }

    /// Applies this option to the table in place.
    pub fn apply(&self, at: &mut AttributeTable) {
        let key = self.key();
        match *self {
            ScanOption::Price { min, max } => {
                filter(at, |e| e.last_close().map(|c| min <= c && c <= max))
            }
            ScanOption::Zacks {
                rank,
                ref value,
                ref growth,
            } => apply_zacks(at, rank, value.as_deref(), growth.as_deref()),
            ScanOption::Brokers { min_buy } => {
                if require_column(at, key, BUY_RATINGS) {
                    let scores = (0..at.len())
                        .map(|r| at.table().number(r, BUY_RATINGS))
                        .collect();
                    rank_rows(at, scores, Some(&|v: f64| v >= min_buy), Direction::Desc);
                }
            }
            ScanOption::EarningsDate => {
                if require_column(at, key, NEXT_EPS) {
                    let scores = (0..at.len())
                        .map(|r| {
                            at.table()
                                .date(r, NEXT_EPS)
                                .map(|d| f64::from(d.num_days_from_ce()))
                        })
                        .collect();
                    rank_rows(at, scores, None, Direction::Asc);
                }
            }
            ScanOption::Industry => {
                if require_column(at, key, INDUSTRY) {
                    let keys: Vec<Option<String>> =
                        (0..at.len()).map(|r| at.table().text(r, INDUSTRY)).collect();
                    at.table_mut()
                        .sort_rows_by(|a, b| missing_last(keys[a].as_ref(), keys[b].as_ref(), Ord::cmp));
                }
            }
            ScanOption::TradingRange { days, cutoff } => score(
                at,
                |e| e.trading_uprange(days),
                Some(&|v: f64| v >= cutoff),
                Direction::Desc,
            ),
            ScanOption::MacdSignal {
                sspan,
                lspan,
                persist,
            } => filter(at, |e| e.macd_cross_up(sspan, lspan, persist).map(|s| s > 0)),
            ScanOption::EmaSignal {
                fast,
                slow,
                lookback,
            } => filter(at, |e| e.ema_cross_up(fast, slow, lookback).map(|s| s > 0)),
            ScanOption::Rsi { low, high } => score(
                at,
                |e| e.rsi(RSI_PERIOD),
                Some(&|v: f64| low < v && v < high),
                Direction::Asc,
            ),
            ScanOption::SurgingVolume { n, ratio, hold } => score(
                at,
                |e| {
                    let index = e.volume_index(n, LONG_VOLUME_WINDOW, hold)?;
                    debug!(symbol = e.symbol(), diagnostic = %index.diagnostic, "volume index");
                    Some(index.score)
                },
                Some(&|v: f64| v > ratio),
                Direction::Desc,
            ),
            ScanOption::ExplodingVolume { n, cutoff } => score(
                at,
                |e| match e.parallel_volume(5, 15, 5, 0.9)? {
                    1 => e.relative_volume(n),
                    _ => None,
                },
                Some(&|v: f64| v > cutoff),
                Direction::Desc,
            ),
            ScanOption::ZigzagP { period, cutoff } => score(
                at,
                |e| e.zigzag_score(period),
                Some(&|v: f64| v > cutoff),
                Direction::Desc,
            ),
            ScanOption::StochasticSignal { n, m, cutoff } => filter(at, |e| {
                let s = e.stochastic_cross(n, m)?;
                Some(s.k < cutoff + 15.0 && s.d < cutoff && (s.k > s.d || s.delta_sign > 0))
            }),
            ScanOption::ParallelEma {
                fast,
                slow,
                window,
                cutoff,
            } => filter(at, |e| e.parallel_ema(fast, slow, window, cutoff).map(|s| s > 0)),
            ScanOption::EmaLayers {
                fast,
                mid,
                slow,
                window,
                cutoff,
            } => filter(at, |e| e.three_layer(fast, mid, slow, window, cutoff)),
            ScanOption::HitEmaSupport { span, days } => {
                filter(at, |e| e.hit_ema_support(span, days))
            }
            ScanOption::BbDistance {
                days,
                cutoff,
                uptrend,
            } => score(
                at,
                |e| {
                    if uptrend && e.bb_uptrend() != Some(true) {
                        return None;
                    }
                    e.bb_distance(days)
                },
                Some(&|v: f64| v <= cutoff),
                Direction::Asc,
            ),
            ScanOption::RsiStd { period, cutoff } => score(
                at,
                |e| e.consolidation(period),
                Some(&|v: f64| v <= cutoff),
                Direction::Asc,
            ),
            ScanOption::EmaAttraction { len, period } => {
                score(at, |e| e.ema_attraction(len, period), None, Direction::Asc)
            }
            ScanOption::EmaEntanglement {
                fast,
                slow,
                span,
                cutoff,
            } => score(
                at,
                |e| e.ema_entanglement(fast, slow, span).map(|c| c as f64),
                Some(&|v: f64| v >= cutoff),
                Direction::Desc,
            ),
            ScanOption::Upward(Upward::Trend {
                window,
                cutoff,
                blind,
            }) => filter(at, |e| e.in_uptrend(window, cutoff, blind).map(|s| s > 0)),
            ScanOption::Upward(Upward::Launch) => {
                filter(at, |e| e.in_uptrend_launch().map(|s| s > 0))
            }
            ScanOption::HorizonSlice { days, num } => {
                filter(at, |e| e.horizon_slice(days).map(|c| c >= num))
            }
            ScanOption::EmaSlice { span } => filter(at, |e| e.ema_slice(span)),
            ScanOption::HorizontalSupport { days, length, num } => {
                filter(at, |e| e.hit_horizontal_support(days, length, num, true))
            }
            ScanOption::HorizontalResistance { days, length, num } => {
                filter(at, |e| e.hit_horizontal_support(days, length, num, false))
            }
            ScanOption::EmaDistance { span } => {
                score(at, |e| e.sma_distance(span), None, Direction::Asc)
            }
            ScanOption::ChangeToRef { reference, subject } => score(
                at,
                |e| e.referenced_change(reference, subject),
                None,
                Direction::Asc,
            ),
            ScanOption::Performance {
                days,
                benchmark,
                cutoff,
                top,
            } => {
                let keep = cutoff.map(|c| move |v: f64| v >= c);
                score(
                    at,
                    |e| e.performance(days, benchmark),
                    keep.as_ref().map(|k| k as &dyn Fn(f64) -> bool),
                    Direction::Desc,
                );
                if let Some(top) = top {
                    at.table_mut().retain(|r| r < top);
                }
            }
        }
    }
}

/// Applies `options` in vocabulary order.
pub fn apply_chain(at: &mut AttributeTable, options: &[ScanOption]) {
    let mut ordered: Vec<&ScanOption> = options.iter().collect();
    ordered.sort_by_key(|o| o.rank());
    for option in ordered {
        let before = at.len();
        option.apply(at);
        info!(option = option.key(), before, after = at.len(), "option applied");
    }
}

fn require_column(at: &AttributeTable, option: &str, column: &str) -> bool {
    let present = at.table().has_column(column);
    if !present {
        warn!(option, column, "input column absent, option skipped");
    }
    present
}

/// Keeps rows whose predicate holds; undefined counts as failed.
fn filter<F>(at: &mut AttributeTable, predicate: F)
where
    F: Fn(&TimeSeriesEngine) -> Option<bool>,
{
    let keep: Vec<bool> = (0..at.len())
        .map(|r| at.engine(r).and_then(&predicate).unwrap_or(false))
        .collect();
    at.table_mut().retain(|r| keep[r]);
}

fn score<F>(
    at: &mut AttributeTable,
    metric: F,
    keep: Option<&dyn Fn(f64) -> bool>,
    direction: Direction,
) where
    F: Fn(&TimeSeriesEngine) -> Option<f64>,
{
    let scores = (0..at.len())
        .map(|r| at.engine(r).and_then(&metric))
        .collect();
    rank_rows(at, scores, keep, direction);
}

/// Writes `Sort`, drops rows failing `keep` (all rows with an undefined
/// score when `keep` is given), then stable-sorts.
fn rank_rows(
    at: &mut AttributeTable,
    scores: Vec<Option<f64>>,
    keep: Option<&dyn Fn(f64) -> bool>,
    direction: Direction,
) {
    let table = at.table_mut();
    let cells = scores
        .iter()
        .map(|s| s.map_or(Cell::Missing, Cell::Number))
        .collect();
    table.set_column(SORT, cells);

    if let Some(keep) = keep {
        let kept: Vec<bool> = scores.iter().map(|s| s.is_some_and(keep)).collect();
        table.retain(|r| kept[r]);
    }

    let keys: Vec<Option<f64>> = (0..table.len()).map(|r| table.number(r, SORT)).collect();
    table.sort_rows_by(|a, b| {
        missing_last(keys[a], keys[b], |x, y| match direction {
            Direction::Asc => x.total_cmp(y),
            Direction::Desc => y.total_cmp(x),
        })
    });
}

/// Rank at or better than `rank`; style letters at or better than the
/// given grades (A best).
fn apply_zacks(at: &mut AttributeTable, rank: i64, value: Option<&str>, growth: Option<&str>) {
    if !require_column(at, "filter_zacks", ZACKS_RANK) {
        return;
    }
    let table = at.table();
    let grade_ok = |r: usize, column: &str, limit: Option<&str>| match limit {
        None => true,
        Some(limit) => table
            .text(r, column)
            .is_some_and(|grade| grade.to_ascii_uppercase().as_str() <= limit),
    };
    let keep: Vec<bool> = (0..table.len())
        .map(|r| {
            table
                .number(r, ZACKS_RANK)
                .is_some_and(|z| z.round() as i64 <= rank)
                && grade_ok(r, VALUE_SCORE, value)
                && grade_ok(r, GROWTH_SCORE, growth)
        })
        .collect();
    at.table_mut().retain(|r| keep[r]);
}
