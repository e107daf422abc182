//! Weekly and monthly aggregation.

use super::TimeSeriesEngine;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::Series;
use chrono::Datelike;

impl TimeSeriesEngine {
    /// Engine over ISO-week bars.
    pub fn to_weekly(&self) -> TimeSeriesEngine {
        self.resample(|bar| {
            let week = bar.date.iso_week();
            (week.year(), week.week())
        })
    }

    /// Engine over calendar-month bars.
    pub fn to_monthly(&self) -> TimeSeriesEngine {
        self.resample(|bar| (bar.date.year(), bar.date.month()))
    }

    /// Groups consecutive bars sharing a period key into one bar dated on
    /// the group's last trading day.
    fn resample<F>(&self, key: F) -> TimeSeriesEngine
    where
        F: Fn(&OhlcvBar) -> (i32, u32),
    {
        let mut out: Vec<OhlcvBar> = Vec::new();
        let mut current = None;

        for bar in &self.series().bars {
            let period = key(bar);
            match out.last_mut() {
                Some(agg) if current == Some(period) => {
                    agg.date = bar.date;
                    agg.high = agg.high.max(bar.high);
                    agg.low = agg.low.min(bar.low);
                    agg.close = bar.close;
                    agg.volume += bar.volume;
                }
                _ => {
                    out.push(bar.clone());
                    current = Some(period);
                }
            }
        }

        TimeSeriesEngine::new(Series::new(self.symbol(), out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn weekly_bars_follow_iso_weeks() {
        // 2020-01-01 is a Wednesday
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(14)));
        let weekly = engine.to_weekly();
        let bars = &weekly.series().bars;

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2020, 1, 5).unwrap());
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 104.5);
        assert_eq!(bars[0].low, 99.5);
        assert_eq!(bars[0].close, 104.0);
        assert_eq!(bars[0].volume, 5_000_000.0);
        assert_eq!(bars[2].close, 113.0);
        assert_eq!(weekly.symbol(), "TEST");
    }

    #[test]
    fn monthly_bars() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(40)));
        let monthly = engine.to_monthly();
        let bars = &monthly.series().bars;

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 130.0);
        assert_eq!(bars[1].open, 131.0);
        assert_eq!(bars[1].volume, 9_000_000.0);
        assert!(monthly.ema(20)[1].is_some());
    }

    #[test]
    fn resampling_leaves_source_untouched() {
        let engine = TimeSeriesEngine::new(series_from_closes(&rising(30)));
        let _ = engine.to_weekly();
        assert_eq!(engine.len(), 30);
    }
}
