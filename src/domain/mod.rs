//! Core domain types and screening logic.

pub mod chart_batch;
pub mod dates;
pub mod engine;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod scan_option;
pub mod series;
pub mod settings;
pub mod table;
pub mod trade;
pub mod watchlist;
