//! Price archive port trait.

use crate::domain::error::ScanError;
use crate::domain::series::Series;

/// Source of per-symbol daily bars.
///
/// Implementations are shared across ingestion workers.
pub trait PriceArchive: Send + Sync {
    /// Loads the full bar history of `symbol`, ascending by date.
    fn load(&self, symbol: &str) -> Result<Series, ScanError>;
}
