//! Domain error types.

/// Top-level error type for barscan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid value for --{option}: {reason}")]
    OptionSyntax { option: String, reason: String },

    #[error("watch-list {file} has neither a Symbol nor a Ticker column")]
    MissingSymbolColumn { file: String },

    #[error("no price file for {symbol} at {path}")]
    NotFound { symbol: String, path: String },

    #[error("malformed price file {path}: {reason}")]
    Malformed { path: String, reason: String },

    #[error("{date} is missing from {misses} consecutive symbols, likely not a trading day")]
    NotTradingDay { date: String, misses: usize },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Shorthand for the error raised while parsing a command-line option value.
    pub fn option(option: &str, reason: impl Into<String>) -> Self {
        ScanError::OptionSyntax {
            option: option.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&ScanError> for std::process::ExitCode {
    fn from(err: &ScanError) -> Self {
        let code: u8 = match err {
            ScanError::Io(_) | ScanError::Csv(_) => 1,
            ScanError::ConfigParse { .. }
            | ScanError::ConfigInvalid { .. }
            | ScanError::OptionSyntax { .. } => 2,
            ScanError::MissingSymbolColumn { .. } => 3,
            ScanError::NotTradingDay { .. } => 4,
            ScanError::NotFound { .. } | ScanError::Malformed { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
