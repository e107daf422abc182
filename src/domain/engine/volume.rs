//! Volume surge predicates.

use super::{TimeSeriesEngine, EPSILON};
use crate::domain::error::ScanError;
use crate::domain::indicator::{last_value, median, IndicatorType};
use std::str::FromStr;

/// Bars that must pass after the peak-volume bar for a `Hold`.
const HOLD_MIN_ELAPSED: usize = 3;

/// Volume mean window used as the baseline of `relative_volume`.
const BASELINE_SPAN: usize = 30;

/// Post-surge condition checked by `volume_index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VolumeHold {
    #[default]
    Any,
    /// The peak-volume bar's low must hold until the last bar.
    Hold,
    Unconditional,
}

impl FromStr for VolumeHold {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Ok(VolumeHold::Any),
            "h" => Ok(VolumeHold::Hold),
            "x" => Ok(VolumeHold::Unconditional),
            other => Err(ScanError::option(
                "filter_surging_volume",
                format!("unknown hold mode '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeIndex {
    /// Peak short-window relative volume over the current one.
    pub score: f64,
    pub diagnostic: String,
}

impl TimeSeriesEngine {
    /// SMA(volume, n) / SMA(volume, 30) at the last bar.
    pub fn relative_volume(&self, n: usize) -> Option<f64> {
        let short = last_value(&self.column(IndicatorType::VolumeSma(n)))?;
        let long = last_value(&self.column(IndicatorType::VolumeSma(BASELINE_SPAN)))?;
        Some(short / long.max(EPSILON))
    }

    /// How far the recent volume peak stands above today's volume, using
    /// median-normalised volumes over the last `n` and `m` bars.
    pub fn volume_index(&self, n: usize, m: usize, hold: VolumeHold) -> Option<VolumeIndex> {
        let bars = &self.series().bars;
        let len = bars.len();
        if n == 0 || m == 0 || len < n.max(m) {
            return None;
        }

        let short = &bars[len - n..];
        let volumes: Vec<f64> = short.iter().map(|b| b.volume).collect();
        let short_median = median(&volumes)?.max(EPSILON);
        let (peak_at, peak) = volumes
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
                if v > best.1 { (i, v) } else { best }
            });
        let max_short = peak / short_median;
        let last_volume = volumes[n - 1];
        let cur_short = last_volume / short_median;

        let long_volumes: Vec<f64> = bars[len - m..].iter().map(|b| b.volume).collect();
        let cur_long = last_volume / median(&long_volumes)?.max(EPSILON);
        let cur = cur_short.max(cur_long);

        let held = match hold {
            VolumeHold::Any | VolumeHold::Unconditional => true,
            VolumeHold::Hold => {
                let elapsed = n - 1 - peak_at;
                let peak_low = short[peak_at].low;
                elapsed >= HOLD_MIN_ELAPSED && short[peak_at..].iter().all(|b| b.low >= peak_low)
            }
        };

        let score = if held { max_short / cur.max(EPSILON) } else { 0.0 };
        Some(VolumeIndex {
            score,
            diagnostic: format!(
                "max {max_short:.2} cur {cur_short:.2}/{cur_long:.2} peak -{} held {held}",
                n - 1 - peak_at
            ),
        })
    }
}
