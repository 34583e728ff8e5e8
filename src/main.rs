//! CPI Report - Regional Consumer Price Index & Minimum Wage Analysis
//!
//! Loads one wide CPI table per region plus a minimum-wage table, reshapes them
//! into a long table and prints month-to-month change, salary scaling, real
//! wages and annual change.
//!
//! ```bash
//! cpi-report --data-dir data
//! cpi-report -t ON=data/ON.csv -t BC=data/BC.csv -w data/MinimumWages.csv --reference BC
//! cpi-report --data-dir data --format json --export-long combined.csv
//! ```

mod config;
mod data;
mod pipeline;
mod report;
mod stats;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use config::{InputConfig, ReportConfig};
use data::{Period, TableSource};
use report::{OutputFormat, ReportRenderer};
use stats::Granularity;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "cpi-report")]
#[command(about = "Regional CPI and minimum wage report", long_about = None)]
struct Cli {
    /// Directory holding the default CPI file set and MinimumWages.csv
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// CPI table as REGION=PATH, or a path named REGION.*.csv (repeatable; replaces the default set)
    #[arg(short, long = "table", value_name = "REGION=PATH")]
    tables: Vec<TableSource>,

    /// Minimum wage table (default: <data-dir>/MinimumWages.csv)
    #[arg(short, long)]
    wages: Option<PathBuf>,

    /// Reference region code for salary scaling
    #[arg(long, default_value = "ON")]
    reference: String,

    /// Salary to scale across regions
    #[arg(long, default_value = "100000")]
    base_amount: f64,

    /// Month of the cross-region snapshot (YY-Mon)
    #[arg(long, default_value = "24-Dec")]
    snapshot: Period,

    /// Item used for the snapshot
    #[arg(long, default_value = "All-items")]
    snapshot_item: String,

    /// Item for the annual change
    #[arg(long, default_value = "Services")]
    annual_item: String,

    /// Start of the annual change period (YY-Mon)
    #[arg(long, default_value = "24-Jan")]
    from: Period,

    /// End of the annual change period (YY-Mon)
    #[arg(long, default_value = "24-Dec")]
    to: Period,

    /// Category broken out in the month-to-month section (repeatable)
    #[arg(long = "item", value_name = "ITEM")]
    items: Vec<String>,

    /// Grouping of month-to-month change series
    #[arg(long, value_enum, default_value = "region-item")]
    granularity: GranularityArg,

    /// Region shown in the combined-table excerpt
    #[arg(long, default_value = "Canada")]
    sample_region: String,

    /// Rows of the combined table to print
    #[arg(long, default_value = "12")]
    head: usize,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: FormatArg,

    /// Also write the combined long table as CSV
    #[arg(long)]
    export_long: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum GranularityArg {
    /// One series per region, all items mixed
    Region,
    /// One series per region and item
    RegionItem,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Region => Granularity::Region,
            GranularityArg::RegionItem => Granularity::RegionItem,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

impl Cli {
    fn inputs(&self) -> InputConfig {
        let mut inputs = InputConfig::from_data_dir(&self.data_dir);
        if !self.tables.is_empty() {
            inputs.tables = self.tables.clone();
        }
        if let Some(wages) = &self.wages {
            inputs.wages = wages.clone();
        }
        inputs.export_long = self.export_long.clone();
        inputs
    }

    fn report_config(&self) -> ReportConfig {
        let defaults = ReportConfig::default();
        ReportConfig {
            sample_region: self.sample_region.clone(),
            head_rows: self.head,
            change_items: if self.items.is_empty() {
                defaults.change_items.clone()
            } else {
                self.items.clone()
            },
            granularity: self.granularity.into(),
            snapshot_item: self.snapshot_item.clone(),
            snapshot_period: self.snapshot,
            reference_region: self.reference.clone(),
            base_amount: self.base_amount,
            annual_item: self.annual_item.clone(),
            annual_start: self.from,
            annual_end: self.to,
            ..defaults
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let inputs = cli.inputs();
    let config = cli.report_config();

    let (combined, wages) = pipeline::load(&inputs)?;
    let report = pipeline::build_report(&combined, &wages, &config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    ReportRenderer::render(&report, cli.format.into(), &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() {
    // Logs go to stderr so stdout carries only the report.
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    info!("startup");

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
