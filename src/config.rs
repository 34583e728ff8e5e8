//! Report configuration: which tables to read and which questions to ask of them.

use crate::data::{Month, Period, TableSource, DEFAULT_WAGE_FILE};
use crate::stats::Granularity;
use serde::Serialize;
use std::path::PathBuf;

/// Where the input tables live.
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub tables: Vec<TableSource>,
    pub wages: PathBuf,
    /// Optional CSV export of the combined long table.
    pub export_long: Option<PathBuf>,
}

impl InputConfig {
    /// The default file set inside `data_dir`.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            tables: TableSource::default_set(&data_dir),
            wages: data_dir.join(DEFAULT_WAGE_FILE),
            export_long: None,
        }
    }
}

/// Parameters of every report section.
#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    /// Region, month and items shown as the combined-table excerpt.
    pub sample_region: String,
    pub sample_period: Period,
    pub sample_items: Vec<String>,
    /// Leading rows of the combined table to print.
    pub head_rows: usize,
    /// Items broken out in the month-to-month section; empty means all items.
    pub change_items: Vec<String>,
    pub granularity: Granularity,
    /// Item and month of the cross-region CPI snapshot.
    pub snapshot_item: String,
    pub snapshot_period: Period,
    pub reference_region: String,
    pub base_amount: f64,
    pub annual_item: String,
    pub annual_start: Period,
    pub annual_end: Period,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let jan = Period::new(2024, Month::Jan);
        let dec = Period::new(2024, Month::Dec);
        Self {
            sample_region: "Canada".to_string(),
            sample_period: jan,
            sample_items: vec![
                "All-items".to_string(),
                "Food".to_string(),
                "Shelter".to_string(),
            ],
            head_rows: 12,
            change_items: vec![
                "Food".to_string(),
                "Shelter".to_string(),
                "All-items excluding food and energy".to_string(),
            ],
            granularity: Granularity::RegionItem,
            snapshot_item: "All-items".to_string(),
            snapshot_period: dec,
            reference_region: "ON".to_string(),
            base_amount: 100_000.0,
            annual_item: "Services".to_string(),
            annual_start: jan,
            annual_end: dec,
        }
    }
}
