//! Candlestick SVG for one chart panel.

use crate::domain::series::Series;
use std::fmt::Write;

pub const WIDTH: f64 = 400.0;
pub const HEIGHT: f64 = 240.0;
const PADDING: f64 = 6.0;
/// Share of the plot height given to volume bars when they are drawn.
const VOLUME_SHARE: f64 = 0.22;
const UP: &str = "#1a9850";
const DOWN: &str = "#d73027";
const VOLUME: &str = "#9e9e9e";
/// Opacity of the oldest bar in gradient mode.
const FADE_FLOOR: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CandleStyle {
    pub gradient: bool,
    pub volume: bool,
}

/// Empty when the series has no bars.
pub fn candlestick_svg(series: &Series, style: CandleStyle) -> String {
    let bars = &series.bars;
    if bars.is_empty() {
        return String::new();
    }

    let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let max_volume = bars.iter().map(|b| b.volume).fold(0.0, f64::max);

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let volume_height = if style.volume {
        plot_height * VOLUME_SHARE
    } else {
        0.0
    };
    let price_height = plot_height - volume_height;

    let range = high - low;
    let scale_y = if range > 0.0 { price_height / range } else { 1.0 };
    let y = |price: f64| PADDING + (high - price) * scale_y;
    let slot = plot_width / bars.len() as f64;
    let body_width = (slot * 0.7).max(0.5);

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH:.0}" height="{HEIGHT:.0}" viewBox="0 0 {WIDTH:.0} {HEIGHT:.0}"><rect width="100%" height="100%" fill="white"/>"#
    );

    let last = (bars.len() - 1).max(1) as f64;
    for (i, bar) in bars.iter().enumerate() {
        let opacity = if style.gradient {
            FADE_FLOOR + (1.0 - FADE_FLOOR) * i as f64 / last
        } else {
            1.0
        };
        let color = if bar.close >= bar.open { UP } else { DOWN };
        let center = PADDING + (i as f64 + 0.5) * slot;
        let (body_low, body_high) = bar.body();
        let body_top = y(body_high);
        let body_size = (y(body_low) - body_top).max(0.5);

        let _ = write!(
            svg,
            r#"<g opacity="{opacity:.2}"><line x1="{center:.1}" y1="{:.1}" x2="{center:.1}" y2="{:.1}" stroke="{color}" stroke-width="0.8"/><rect x="{:.1}" y="{body_top:.1}" width="{body_width:.1}" height="{body_size:.1}" fill="{color}"/>"#,
            y(bar.high),
            y(bar.low),
            center - body_width / 2.0,
        );
        if style.volume && max_volume > 0.0 {
            let size = bar.volume / max_volume * volume_height;
            let _ = write!(
                svg,
                r#"<rect x="{:.1}" y="{:.1}" width="{body_width:.1}" height="{size:.1}" fill="{VOLUME}"/>"#,
                center - body_width / 2.0,
                HEIGHT - PADDING - size,
            );
        }
        svg.push_str("</g>");
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::OhlcvBar;
    use chrono::NaiveDate;

    fn series() -> Series {
        let date = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        Series::new(
            "T",
            vec![
                OhlcvBar {
                    date: date(1),
                    open: 10.0,
                    high: 12.0,
                    low: 9.0,
                    close: 11.0,
                    volume: 1000.0,
                },
                OhlcvBar {
                    date: date(4),
                    open: 11.0,
                    high: 11.5,
                    low: 8.0,
                    close: 8.5,
                    volume: 3000.0,
                },
            ],
        )
    }

    #[test]
    fn empty_series_has_no_svg() {
        assert!(candlestick_svg(&Series::new("E", Vec::new()), CandleStyle::default()).is_empty());
    }

    #[test]
    fn one_candle_per_bar() {
        let svg = candlestick_svg(&series(), CandleStyle::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<line").count(), 2);
        assert!(svg.contains(UP));
        assert!(svg.contains(DOWN));
        assert!(!svg.contains(VOLUME));
    }

    #[test]
    fn volume_bars_are_optional() {
        let style = CandleStyle {
            gradient: false,
            volume: true,
        };
        let svg = candlestick_svg(&series(), style);
        assert_eq!(svg.matches(VOLUME).count(), 2);
    }

    #[test]
    fn gradient_fades_older_bars() {
        let style = CandleStyle {
            gradient: true,
            volume: false,
        };
        let svg = candlestick_svg(&series(), style);
        assert!(svg.contains(r#"opacity="0.30""#));
        assert!(svg.contains(r#"opacity="1.00""#));
    }
}
