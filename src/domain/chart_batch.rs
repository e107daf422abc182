//! Pagination of chart panels into fixed grids.
//!
//! A run with N symbols uses a square grid of side `min(ceil(sqrt(N)),
//! row_number)`. With more than one span every symbol gets one panel per
//! span in adjacent columns, so the number of symbol columns shrinks
//! accordingly.

use crate::domain::series::Series;

pub const DEFAULT_ROW_NUMBER: usize = 7;
pub const DEFAULT_SPAN: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub stem: String,
    /// Bars shown per panel; one panel per entry and symbol.
    pub spans: Vec<usize>,
    pub row_number: usize,
    pub row_major: bool,
    pub gradient: bool,
    pub plot_volume: bool,
}

impl Layout {
    pub fn new(stem: impl Into<String>) -> Self {
        Layout {
            stem: stem.into(),
            spans: vec![DEFAULT_SPAN],
            row_number: DEFAULT_ROW_NUMBER,
            row_major: false,
            gradient: false,
            plot_volume: false,
        }
    }

    fn span_count(&self) -> usize {
        self.spans.len().max(1)
    }

    /// Symbol rows and symbol columns per page for `n` symbols.
    pub fn grid(&self, n: usize) -> (usize, usize) {
        let side = (n as f64).sqrt().ceil() as usize;
        let rows = side.min(self.row_number).max(1);
        let cols = if self.span_count() > 1 {
            (rows / self.span_count()).max(1)
        } else {
            rows
        };
        (rows, cols)
    }

    /// `chart.{stem}.{spans}d.{page:05}i.pdf`, pages numbered from 1.
    pub fn page_name(&self, page: usize) -> String {
        let spans = self
            .spans
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("-");
        format!("chart.{}.{}d.{:05}i.pdf", self.stem, spans, page)
    }
}

/// What the batcher needs to know about one surviving symbol.
#[derive(Debug, Clone, Copy)]
pub struct ChartSource<'a> {
    pub symbol: &'a str,
    pub header: &'a str,
    pub annotation: &'a str,
    pub series: &'a Series,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub symbol: String,
    pub header: String,
    pub annotation: String,
    pub span: usize,
    pub row: usize,
    /// Physical column, counting one slot per span.
    pub col: usize,
    /// The last `span` bars of the plot scope.
    pub series: Series,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPage {
    pub number: usize,
    pub file_name: String,
    pub rows: usize,
    pub cols: usize,
    pub gradient: bool,
    pub plot_volume: bool,
    pub panels: Vec<Panel>,
}

pub fn paginate(symbols: &[ChartSource<'_>], layout: &Layout) -> Vec<ChartPage> {
    if symbols.is_empty() {
        return Vec::new();
    }
    let (rows, cols) = layout.grid(symbols.len());
    let per_page = rows * cols;
    let spans: &[usize] = if layout.spans.is_empty() {
        &[DEFAULT_SPAN]
    } else {
        &layout.spans
    };

    symbols
        .chunks(per_page)
        .enumerate()
        .map(|(p, chunk)| {
            let number = p + 1;
            let panels = chunk
                .iter()
                .enumerate()
                .flat_map(|(k, source)| {
                    let (row, col) = if layout.row_major {
                        (k / cols, k % cols)
                    } else {
                        (k % rows, k / rows)
                    };
                    spans.iter().enumerate().map(move |(s, &span)| Panel {
                        symbol: source.symbol.to_string(),
                        header: source.header.to_string(),
                        annotation: source.annotation.to_string(),
                        span,
                        row,
                        col: col * spans.len() + s,
                        series: source.series.tail(span),
                    })
                })
                .collect();
            ChartPage {
                number,
                file_name: layout.page_name(number),
                rows,
                cols: cols * spans.len(),
                gradient: layout.gradient,
                plot_volume: layout.plot_volume,
                panels,
            }
        })
        .collect()
}
