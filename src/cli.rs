//! CLI definition and the per-watch-list scan pipeline.

use clap::{Args, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::archive_adapter::ArchiveAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::typst_chart::TypstChartAdapter;
use crate::adapters::watchlist_adapter;
use crate::domain::chart_batch::{paginate, Layout};
use crate::domain::error::ScanError;
use crate::domain::scan_option::{apply_chain, ScanOption};
use crate::domain::settings::{parse_spans, ScanSettings};
use crate::domain::watchlist::{AttributeTable, BacktestSpec, IngestSettings};
use crate::ports::chart_port::ChartPort;
use crate::ports::data_port::PriceArchive;

#[derive(Parser, Debug)]
#[command(
    name = "barscan",
    about = "Screen watch-lists against end-of-day price archives"
)]
pub struct Cli {
    /// Tab-delimited watch-list files
    #[arg(required = true)]
    pub watchlists: Vec<PathBuf>,
    /// Price archive directory holding `{SYMBOL}.txt` files
    #[arg(long)]
    pub dir: Option<PathBuf>,
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Bars per chart panel, `N` or `N,M` for two spans side by side
    #[arg(long, value_name = "N[,M]")]
    pub days: Option<String>,
    #[arg(long)]
    pub gradient: bool,
    #[arg(long = "row_number")]
    pub row_number: Option<usize>,
    #[arg(long = "row_major")]
    pub row_major: bool,
    #[arg(long)]
    pub workers: Option<usize>,
    /// Comma-separated sectors to skip
    #[arg(long = "exclude_sectors")]
    pub exclude_sectors: Option<String>,
    #[arg(long = "sort_date_added")]
    pub sort_date_added: bool,
    #[arg(long = "backtest_date", value_name = "YYYY-MM-DD[,EXTENSION,STRATEGY]")]
    pub backtest_date: Option<String>,
    /// Write the filtered table only, no charts
    #[arg(long = "filterOnly")]
    pub filter_only: bool,
    #[arg(long = "plot_volumne")]
    pub plot_volume: bool,
    #[arg(long = "output_dir")]
    pub output_dir: Option<PathBuf>,
    #[command(flatten)]
    pub options: OptionArgs,
}

/// One flag per screening option; values are parsed by `ScanOption::parse`.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    #[arg(long = "filter_price", value_name = "MIN,MAX", allow_hyphen_values = true)]
    pub filter_price: Option<String>,
    #[arg(long = "filter_zacks", value_name = "RANK[,VALUE[,GROWTH]]")]
    pub filter_zacks: Option<String>,
    #[arg(long = "sort_brokers", value_name = "MIN_BUY")]
    pub sort_brokers: Option<String>,
    #[arg(long = "sort_earnings_date")]
    pub sort_earnings_date: bool,
    #[arg(long = "sort_industry")]
    pub sort_industry: bool,
    #[arg(long = "sort_trange", value_name = "DAYS,CUTOFF", allow_hyphen_values = true)]
    pub sort_trange: Option<String>,
    #[arg(long = "filter_macd_sgl", value_name = "S,L,PERSIST")]
    pub filter_macd_sgl: Option<String>,
    #[arg(long = "filter_ema_sgl", value_name = "FAST,SLOW,LOOKBACK")]
    pub filter_ema_sgl: Option<String>,
    #[arg(long = "filter_rsi", value_name = "LOW,HIGH")]
    pub filter_rsi: Option<String>,
    #[arg(long = "filter_surging_volume", value_name = "N,RATIO[,HOLD]")]
    pub filter_surging_volume: Option<String>,
    #[arg(long = "filter_exploding_volume", value_name = "N,CUTOFF")]
    pub filter_exploding_volume: Option<String>,
    #[arg(long = "filter_consolidation_p", value_name = "PERIOD,CUTOFF")]
    pub filter_consolidation_p: Option<String>,
    #[arg(long = "filter_stochastic_sgl", value_name = "N,M,CUTOFF")]
    pub filter_stochastic_sgl: Option<String>,
    #[arg(long = "filter_parallel_ema", value_name = "FAST,SLOW,WINDOW,CUTOFF")]
    pub filter_parallel_ema: Option<String>,
    #[arg(long = "filter_ema_3layers", value_name = "FAST,MID,SLOW[,WINDOW,CUTOFF]")]
    pub filter_ema_3layers: Option<String>,
    #[arg(long = "filter_hit_ema_support", value_name = "SPAN,DAYS")]
    pub filter_hit_ema_support: Option<String>,
    #[arg(
        long = "filter_bbdistance",
        value_name = "DAYS,CUTOFF[,UPTREND]",
        allow_hyphen_values = true
    )]
    pub filter_bbdistance: Option<String>,
    #[arg(long = "sort_rsi_std", value_name = "PERIOD,CUTOFF")]
    pub sort_rsi_std: Option<String>,
    #[arg(long = "sort_ema_attraction", value_name = "LEN,PERIOD")]
    pub sort_ema_attraction: Option<String>,
    #[arg(long = "sort_ema_entanglement", value_name = "FAST,SLOW,SPAN,CUTOFF")]
    pub sort_ema_entanglement: Option<String>,
    #[arg(long = "filter_upward", value_name = "WINDOW,CUTOFF[,BLIND]|launch")]
    pub filter_upward: Option<String>,
    #[arg(long = "filter_horizon_slice", value_name = "DAYS,NUM")]
    pub filter_horizon_slice: Option<String>,
    #[arg(long = "filter_ema_slice", value_name = "SPAN")]
    pub filter_ema_slice: Option<String>,
    #[arg(long = "filter_hit_horizontal_support", value_name = "DAYS,LENGTH,NUM")]
    pub filter_hit_horizontal_support: Option<String>,
    #[arg(long = "filter_hit_horizontal_resistance", value_name = "DAYS,LENGTH,NUM")]
    pub filter_hit_horizontal_resistance: Option<String>,
    #[arg(long = "sort_ema_distance", value_name = "SPAN")]
    pub sort_ema_distance: Option<String>,
    #[arg(long = "sort_change_to_ref", value_name = "REF_DATE,SUBJECT")]
    pub sort_change_to_ref: Option<String>,
    #[arg(
        long = "sort_performance",
        value_name = "DAYS[,BENCHMARK[,CUTOFF[,TOP]]]",
        allow_hyphen_values = true
    )]
    pub sort_performance: Option<String>,
}

impl OptionArgs {
    /// Parses every option given on the command line.
    pub fn scan_options(&self) -> Result<Vec<ScanOption>, ScanError> {
        let valued = [
            ("filter_price", &self.filter_price),
            ("filter_zacks", &self.filter_zacks),
            ("sort_brokers", &self.sort_brokers),
            ("sort_trange", &self.sort_trange),
            ("filter_macd_sgl", &self.filter_macd_sgl),
            ("filter_ema_sgl", &self.filter_ema_sgl),
            ("filter_rsi", &self.filter_rsi),
            ("filter_surging_volume", &self.filter_surging_volume),
            ("filter_exploding_volume", &self.filter_exploding_volume),
            ("filter_consolidation_p", &self.filter_consolidation_p),
            ("filter_stochastic_sgl", &self.filter_stochastic_sgl),
            ("filter_parallel_ema", &self.filter_parallel_ema),
            ("filter_ema_3layers", &self.filter_ema_3layers),
            ("filter_hit_ema_support", &self.filter_hit_ema_support),
            ("filter_bbdistance", &self.filter_bbdistance),
            ("sort_rsi_std", &self.sort_rsi_std),
            ("sort_ema_attraction", &self.sort_ema_attraction),
            ("sort_ema_entanglement", &self.sort_ema_entanglement),
            ("filter_upward", &self.filter_upward),
            ("filter_horizon_slice", &self.filter_horizon_slice),
            ("filter_ema_slice", &self.filter_ema_slice),
            (
                "filter_hit_horizontal_support",
                &self.filter_hit_horizontal_support,
            ),
            (
                "filter_hit_horizontal_resistance",
                &self.filter_hit_horizontal_resistance,
            ),
            ("sort_ema_distance", &self.sort_ema_distance),
            ("sort_change_to_ref", &self.sort_change_to_ref),
            ("sort_performance", &self.sort_performance),
        ];
        let flags = [
            ("sort_earnings_date", self.sort_earnings_date),
            ("sort_industry", self.sort_industry),
        ];

        let mut options = valued
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| ScanOption::parse(key, v)))
            .collect::<Result<Vec<_>, _>>()?;
        for (key, set) in flags {
            if set {
                options.push(ScanOption::parse(key, "")?);
            }
        }
        Ok(options)
    }
}

/// Everything a watch-list scan needs beyond its path.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub settings: ScanSettings,
    pub ingest: IngestSettings,
    pub options: Vec<ScanOption>,
    pub filter_only: bool,
    pub gradient: bool,
    pub row_major: bool,
    pub plot_volume: bool,
    pub sort_date_added: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub rows: usize,
    pub pages: usize,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(cli: &Cli) -> Result<(), ScanError> {
    let plan = build_plan(cli)?;
    let data_dir = plan
        .settings
        .data_dir
        .clone()
        .ok_or_else(|| ScanError::ConfigInvalid {
            section: "scan".into(),
            key: "data_dir".into(),
            reason: "no price archive directory; pass --dir or set data_dir".into(),
        })?;
    let archive = ArchiveAdapter::new(data_dir);
    let charts = TypstChartAdapter::new();

    for path in &cli.watchlists {
        let summary = scan_watchlist(path, &archive, &charts, &plan)?;
        info!(
            watchlist = %path.display(),
            rows = summary.rows,
            pages = summary.pages,
            "watch-list done"
        );
    }
    Ok(())
}

/// Config file first, then command-line overrides.
pub fn build_plan(cli: &Cli) -> Result<RunPlan, ScanError> {
    let mut settings = match &cli.config {
        Some(path) => ScanSettings::from_config(&FileConfigAdapter::from_file(path)?)?,
        None => ScanSettings::default(),
    };
    if let Some(dir) = &cli.dir {
        settings.data_dir = Some(dir.display().to_string());
    }
    if let Some(workers) = cli.workers {
        settings.workers = at_least_one("workers", workers)?;
    }
    if let Some(rows) = cli.row_number {
        settings.row_number = at_least_one("row_number", rows)?;
    }
    if let Some(days) = &cli.days {
        settings.spans = parse_spans(days).map_err(|reason| ScanError::option("days", reason))?;
    }
    if let Some(sectors) = &cli.exclude_sectors {
        settings.exclude_sectors = sectors
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = Some(dir.display().to_string());
    }

    let backtest = cli
        .backtest_date
        .as_deref()
        .map(str::parse::<BacktestSpec>)
        .transpose()?;
    let ingest = IngestSettings {
        workers: settings.workers,
        exclude_sectors: settings.exclude_sectors.clone(),
        backtest,
    };

    Ok(RunPlan {
        settings,
        ingest,
        options: cli.options.scan_options()?,
        filter_only: cli.filter_only,
        gradient: cli.gradient,
        row_major: cli.row_major,
        plot_volume: cli.plot_volume,
        sort_date_added: cli.sort_date_added,
    })
}

fn at_least_one(option: &str, value: usize) -> Result<usize, ScanError> {
    if value == 0 {
        return Err(ScanError::option(option, "must be at least 1"));
    }
    Ok(value)
}

/// Reads, ingests, screens and writes one watch-list. The filtered table
/// always lands in `{stem}.tsv`; chart pages follow unless `filter_only`.
pub fn scan_watchlist(
    path: &Path,
    archive: &dyn PriceArchive,
    charts: &dyn ChartPort,
    plan: &RunPlan,
) -> Result<ScanSummary, ScanError> {
    let source = path.display().to_string();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "watchlist".to_string());
    let output_dir = PathBuf::from(plan.settings.output_dir.as_deref().unwrap_or("."));

    info!(watchlist = %source, "reading watch-list");
    let table = watchlist_adapter::read_table(path)?;
    let mut at = AttributeTable::new(table, &source, plan.sort_date_added)?;
    at.ingest(archive, &plan.ingest)?;
    apply_chain(&mut at, &plan.options);

    let tsv = output_dir.join(format!("{stem}.tsv"));
    watchlist_adapter::write_table(at.table(), &tsv)?;
    info!(path = %tsv.display(), rows = at.len(), "table written");

    if plan.filter_only {
        return Ok(ScanSummary {
            rows: at.len(),
            pages: 0,
        });
    }

    let layout = Layout {
        stem,
        spans: plan.settings.spans.clone(),
        row_number: plan.settings.row_number,
        row_major: plan.row_major,
        gradient: plan.gradient,
        plot_volume: plan.plot_volume,
    };
    let pages = paginate(&at.chart_sources(), &layout);
    for page in &pages {
        let target = output_dir.join(&page.file_name);
        charts.render(page, &target.display().to_string())?;
    }
    info!(pages = pages.len(), "charts written");

    Ok(ScanSummary {
        rows: at.len(),
        pages: pages.len(),
    })
}
