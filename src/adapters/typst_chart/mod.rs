//! Typst chart pages.
//!
//! Each page becomes a `.typ` document next to the PDF name the batcher
//! chose; `typst compile` on it yields that PDF. Panels sit in a grid at
//! their batcher-assigned cells with the symbol and header above the
//! candlesticks and the annotation below.

pub mod candle_svg;

use crate::domain::chart_batch::{ChartPage, Panel};
use crate::domain::error::ScanError;
use crate::ports::chart_port::ChartPort;
use candle_svg::{candlestick_svg, CandleStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const GUTTER: f64 = 4.0;
const MARGIN: f64 = 12.0;
/// Room for the caption lines around each panel.
const CAPTION_HEIGHT: f64 = 24.0;

pub struct TypstChartAdapter;

impl TypstChartAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TypstChartAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartPort for TypstChartAdapter {
    fn render(&self, page: &ChartPage, path: &str) -> Result<(), ScanError> {
        let target = typst_path(path);
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, render_page(page))?;
        debug!(path = %target.display(), panels = page.panels.len(), "chart page written");
        Ok(())
    }
}

/// The `.typ` source path for a `.pdf` page name.
pub fn typst_path(pdf: &str) -> PathBuf {
    Path::new(pdf).with_extension("typ")
}

pub fn render_page(page: &ChartPage) -> String {
    let style = CandleStyle {
        gradient: page.gradient,
        volume: page.plot_volume,
    };
    let cols = page.cols.max(1);
    let rows = page.rows.max(1);
    let width = cols as f64 * (candle_svg::WIDTH + GUTTER) + 2.0 * MARGIN;
    let height = rows as f64 * (candle_svg::HEIGHT + CAPTION_HEIGHT + GUTTER) + 2.0 * MARGIN;

    let mut output = format!(
        "#set page(width: {width:.0}pt, height: {height:.0}pt, margin: {MARGIN:.0}pt)\n\
         #set text(size: 7pt)\n\
         #grid(\n  columns: {cols},\n  rows: {rows},\n  gutter: {GUTTER:.0}pt,\n"
    );
    for panel in &page.panels {
        output.push_str(&render_panel(panel, style));
    }
    output.push_str(")\n");
    output
}

fn render_panel(panel: &Panel, style: CandleStyle) -> String {
    let svg = candlestick_svg(&panel.series, style);
    let body = if svg.is_empty() {
        "_No price data._".to_string()
    } else {
        format!(
            "#image.decode(\n\"{}\",\n  width: 100%,\n)",
            svg.replace('\\', "\\\\").replace('"', "\\\"")
        )
    };
    format!(
        "  grid.cell(x: {}, y: {})[\n#strong[{}] {} ({}d)\n\n{}\n\n{}\n],\n",
        panel.col,
        panel.row,
        escape_markup(&panel.symbol),
        escape_markup(&panel.header),
        panel.span,
        body,
        escape_markup(&panel.annotation),
    )
}

/// Escapes characters with markup meaning in Typst content blocks.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(
            ch,
            '\\' | '#' | '[' | ']' | '*' | '_' | '$' | '@' | '<' | '>' | '`' | '~' | '/'
        ) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart_batch::{paginate, ChartSource, Layout};
    use crate::domain::ohlcv::OhlcvBar;
    use crate::domain::series::Series;
    use chrono::{Days, NaiveDate};
    use tempfile::TempDir;

    fn series(n: usize) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars = (0..n)
            .map(|i| OhlcvBar {
                date: start + Days::new(i as u64),
                open: 10.0,
                high: 11.0,
                low: 9.0,
                close: 10.5,
                volume: 5000.0,
            })
            .collect();
        Series::new("S", bars)
    }

    fn sample_page() -> ChartPage {
        let data = series(30);
        let sources = [
            ChartSource {
                symbol: "AAPL",
                header: "zr1 A/B",
                annotation: "pe20.1peg1.3eday11/05",
                series: &data,
            },
            ChartSource {
                symbol: "MSFT",
                header: "",
                annotation: "",
                series: &data,
            },
        ];
        let mut layout = Layout::new("watch");
        layout.spans = vec![20];
        paginate(&sources, &layout).remove(0)
    }

    #[test]
    fn page_lists_every_panel_at_its_cell() {
        let output = render_page(&sample_page());
        assert!(output.starts_with("#set page("));
        assert!(output.contains("columns: 2"));
        assert!(output.contains("grid.cell(x: 0, y: 0)"));
        assert!(output.contains("grid.cell(x: 0, y: 1)"));
        assert!(output.contains("#strong[AAPL] zr1 A\\/B (20d)"));
        assert!(output.contains("pe20.1peg1.3eday11\\/05"));
        assert_eq!(output.matches("#image.decode").count(), 2);
    }

    #[test]
    fn markup_is_escaped() {
        assert_eq!(escape_markup("# of *bulls*"), "\\# of \\*bulls\\*");
        assert_eq!(escape_markup("plain"), "plain");
    }

    #[test]
    fn typ_extension_replaces_pdf() {
        assert_eq!(
            typst_path("out/chart.w.200d.00001i.pdf"),
            PathBuf::from("out/chart.w.200d.00001i.typ")
        );
    }

    #[test]
    fn render_writes_typst_file() {
        let dir = TempDir::new().unwrap();
        let page = sample_page();
        let pdf = dir.path().join("charts").join(&page.file_name);

        TypstChartAdapter::new()
            .render(&page, pdf.to_str().unwrap())
            .unwrap();

        let written = fs::read_to_string(dir.path().join("charts").join("chart.watch.20d.00001i.typ"))
            .unwrap();
        assert!(written.contains("#strong[MSFT]"));
    }
}
