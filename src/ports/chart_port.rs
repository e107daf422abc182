//! Chart rendering port trait.

use crate::domain::chart_batch::ChartPage;
use crate::domain::error::ScanError;

/// Port for writing one page of candlestick panels.
pub trait ChartPort {
    /// Renders `page` to `path`, the page's `.pdf` file name under the
    /// output directory.
    fn render(&self, page: &ChartPage, path: &str) -> Result<(), ScanError>;
}
