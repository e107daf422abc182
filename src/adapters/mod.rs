//! Concrete adapter implementations for ports.

pub mod archive_adapter;
pub mod file_config_adapter;
pub mod typst_chart;
pub mod watchlist_adapter;
