//! Pivots and horizontal support.

use super::{Line, TimeSeriesEngine};
use crate::domain::indicator::{atr, pivot, Column, IndicatorType};

/// Cutoff for the EMA3-versus-level test.
const LEVEL_CUTOFF: f64 = 0.95;

impl TimeSeriesEngine {
    /// Pivot close per bar, `None` where neither pivot rule fires.
    pub fn find_pivot(&self, length: usize) -> Column {
        let atr = self.column(IndicatorType::Atr(atr::DEFAULT_PERIOD));
        pivot::find_pivots(&self.series().bars, length, &atr)
    }

    /// Number of pivots among the `days` bars before the last bar whose
    /// price lies inside the last bar's open-close body.
    pub fn horizon_slice(&self, days: usize) -> Option<usize> {
        let len = self.len();
        if days == 0 || len < days + 1 {
            return None;
        }
        let (floor, ceiling) = self.series().last()?.body();
        let pivots = self.find_pivot(pivot::DEFAULT_LENGTH);

        let count = pivots[len - 1 - days..len - 1]
            .iter()
            .flatten()
            .filter(|&&price| floor <= price && price <= ceiling)
            .count();
        Some(count)
    }

    /// At least `num` pivots stack at today's body while EMA3 approaches the
    /// last close from above (`touch_down`) or from below.
    pub fn hit_horizontal_support(
        &self,
        days: usize,
        length: usize,
        num: usize,
        touch_down: bool,
    ) -> Option<bool> {
        let pivots = self.horizon_slice(days)?;
        let level = self.last_close()?;
        let side = self.parallel_lines(
            Line::Ema(3),
            Line::Level(level),
            length,
            LEVEL_CUTOFF,
            self.len(),
        )?;
        let wanted = if touch_down { 1 } else { -1 };
        Some(pivots >= num && side == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::domain::series::Series;

    /// Two V-shaped dips bottoming at 50, then a slide back onto 50.
    fn double_bottom() -> TimeSeriesEngine {
        let mut closes: Vec<f64> = (0..=40)
            .map(|i: i32| 50.0 + f64::from(((i % 20) - 10).abs()))
            .collect();
        closes.extend((1..=10).map(|i: i32| 60.0 - f64::from(i)));
        let mut series = series_from_closes(&closes);
        let last = series.bars.len() - 1;
        series.bars[last].open = 51.0;
        series.bars[last].high = 51.5;
        TimeSeriesEngine::new(Series::new("DB", series.bars))
    }

    #[test]
    fn pivots_mark_dips_and_peaks() {
        let engine = double_bottom();
        let pivots = engine.find_pivot(5);
        assert_eq!(pivots[10], Some(50.0));
        assert_eq!(pivots[20], Some(60.0));
        assert_eq!(pivots[30], Some(50.0));
        assert_eq!(pivots[15], None);
    }

    #[test]
    fn horizon_slice_counts_pivots_in_body() {
        let engine = double_bottom();
        assert_eq!(engine.len(), 51);
        assert_eq!(engine.horizon_slice(45), Some(2));
        assert_eq!(engine.horizon_slice(15), Some(0));
        assert_eq!(engine.horizon_slice(51), None);
    }

    #[test]
    fn horizontal_support_from_above() {
        let engine = double_bottom();
        assert_eq!(engine.hit_horizontal_support(45, 5, 2, true), Some(true));
        assert_eq!(engine.hit_horizontal_support(45, 5, 2, false), Some(false));
        assert_eq!(engine.hit_horizontal_support(45, 5, 3, true), Some(false));
    }
}
