//! Run settings from the `[scan]` section of an optional INI file.
//!
//! Every key is optional. Command-line values are layered on top by the CLI.

use crate::domain::chart_batch::{DEFAULT_ROW_NUMBER, DEFAULT_SPAN};
use crate::domain::error::ScanError;
use crate::ports::config_port::ConfigPort;

pub const SECTION: &str = "scan";
pub const DEFAULT_WORKERS: usize = 1;
/// Chart spans beyond this are rejected.
pub const MAX_SPANS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    pub data_dir: Option<String>,
    pub workers: usize,
    pub row_number: usize,
    pub exclude_sectors: Vec<String>,
    pub output_dir: Option<String>,
    pub spans: Vec<usize>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings {
            data_dir: None,
            workers: DEFAULT_WORKERS,
            row_number: DEFAULT_ROW_NUMBER,
            exclude_sectors: Vec::new(),
            output_dir: None,
            spans: vec![DEFAULT_SPAN],
        }
    }
}

impl ScanSettings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ScanError> {
        let defaults = ScanSettings::default();
        let settings = ScanSettings {
            data_dir: non_empty(config.get_string(SECTION, "data_dir")),
            workers: positive(config, "workers")?.unwrap_or(defaults.workers),
            row_number: positive(config, "row_number")?.unwrap_or(defaults.row_number),
            exclude_sectors: config.get_list(SECTION, "exclude_sectors"),
            output_dir: non_empty(config.get_string(SECTION, "output_dir")),
            spans: match non_empty(config.get_string(SECTION, "days")) {
                Some(raw) => parse_spans(&raw).map_err(|reason| invalid("days", reason))?,
                None => defaults.spans,
            },
        };
        Ok(settings)
    }
}

/// Parses `N` or `N,M` chart spans.
pub fn parse_spans(raw: &str) -> Result<Vec<usize>, String> {
    let spans = raw
        .split(',')
        .map(|part| match part.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("'{}' is not a positive bar count", part.trim())),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if spans.len() > MAX_SPANS {
        return Err(format!("at most {MAX_SPANS} spans, got {}", spans.len()));
    }
    Ok(spans)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn positive(config: &dyn ConfigPort, key: &str) -> Result<Option<usize>, ScanError> {
    let Some(raw) = non_empty(config.get_string(SECTION, key)) else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(invalid(key, format!("{key} must be a positive integer, got '{raw}'"))),
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ScanError {
    ScanError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}
