//! OHLCV bar representation.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// low <= min(open, close) <= max(open, close) <= high, volume >= 0.
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open.min(self.close)
            && self.open.max(self.close) <= self.high
            && self.volume >= 0.0
    }

    /// Lower and upper edge of the candle body.
    pub fn body(&self) -> (f64, f64) {
        (self.open.min(self.close), self.open.max(self.close))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        // high-low=20, |110-130|=20, |90-130|=40 → 40
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn consistency_rejects_inverted_candle() {
        let mut bar = sample_bar();
        assert!(bar.is_consistent());
        bar.low = 101.0;
        assert!(!bar.is_consistent());
    }

    #[test]
    fn body_orders_open_and_close() {
        let mut bar = sample_bar();
        assert_eq!(bar.body(), (100.0, 105.0));
        bar.close = 95.0;
        assert_eq!(bar.body(), (95.0, 100.0));
    }
}
