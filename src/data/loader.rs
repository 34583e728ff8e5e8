//! CSV Data Loader Module
//! Reads wide CPI tables and the minimum-wage table using Polars.

use super::period::{Period, PeriodError};
use super::region::RegionDirectory;
use super::table::{WageRecord, WideTable};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const ITEM_COLUMN: &str = "Item";
pub const WAGE_COLUMN: &str = "MinimumWage";
pub const REGION_COLUMN: &str = "Region";
/// Older wage files key rows by province instead of region.
pub const REGION_ALIAS_COLUMN: &str = "Province";

/// File name suffix of the default CPI table set.
pub const DEFAULT_TABLE_SUFFIX: &str = ".CPI.1810000401.csv";
pub const DEFAULT_WAGE_FILE: &str = "MinimumWages.csv";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("[{identifier}] file not found: {}", .path.display())]
    MissingFile { identifier: String, path: PathBuf },
    #[error("[{identifier}] failed to load CSV: {source}")]
    Csv {
        identifier: String,
        #[source]
        source: PolarsError,
    },
    #[error("[{identifier}] missing required column '{column}'")]
    MissingColumn { identifier: String, column: String },
    #[error("[{identifier}] table has no month columns")]
    NoMonthColumns { identifier: String },
    #[error("[{identifier}] column '{column}' is not a month label: {source}")]
    InvalidMonthColumn {
        identifier: String,
        column: String,
        #[source]
        source: PeriodError,
    },
    #[error("[{identifier}] month '{period}' appears more than once")]
    DuplicateMonth { identifier: String, period: Period },
    #[error("[{identifier}] invalid value at row {row}, column '{column}': {message}")]
    InvalidValue {
        identifier: String,
        row: usize,
        column: String,
        message: String,
    },
    #[error("[{identifier}] region '{region}' appears more than once")]
    DuplicateRegion { identifier: String, region: String },
    #[error("Invalid table identifier '{0}': expected REGION=PATH or a file named REGION.*.csv")]
    InvalidIdentifier(String),
}

impl LoaderError {
    fn polars(identifier: &str, source: PolarsError) -> Self {
        LoaderError::Csv {
            identifier: identifier.to_string(),
            source,
        }
    }
}

/// A CPI table to load and the region its rows belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub region: String,
    pub path: PathBuf,
}

impl TableSource {
    pub fn new(region: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            region: region.into(),
            path: path.into(),
        }
    }

    /// Derive the region from the file name prefix (`ON.CPI.1810000401.csv` -> `ON`).
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, LoaderError> {
        let path = path.into();
        let region = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split('.').next())
            .filter(|prefix| !prefix.is_empty())
            .ok_or_else(|| LoaderError::InvalidIdentifier(path.display().to_string()))?
            .to_string();
        Ok(Self { region, path })
    }

    /// The standard national + provincial file set inside `data_dir`.
    pub fn default_set(data_dir: &Path) -> Vec<Self> {
        RegionDirectory::default_codes()
            .into_iter()
            .map(|code| {
                let path = data_dir.join(format!("{code}{DEFAULT_TABLE_SUFFIX}"));
                Self::new(code, path)
            })
            .collect()
    }
}

impl FromStr for TableSource {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((region, path)) if !region.trim().is_empty() && !path.trim().is_empty() => {
                Ok(Self::new(region.trim(), path.trim()))
            }
            Some(_) => Err(LoaderError::InvalidIdentifier(s.to_string())),
            None => Self::from_path(s),
        }
    }
}

/// Handles CSV loading for the CPI and wage tables.
pub struct DataLoader;

impl DataLoader {
    /// Read a CSV file into a DataFrame.
    pub fn read_frame(identifier: &str, path: &Path) -> Result<DataFrame, LoaderError> {
        if !path.is_file() {
            return Err(LoaderError::MissingFile {
                identifier: identifier.to_string(),
                path: path.to_path_buf(),
            });
        }

        LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()
            .and_then(|lazy| lazy.collect())
            .map_err(|e| LoaderError::polars(identifier, e))
    }

    /// Load one region's wide CPI table.
    pub fn load_wide(source: &TableSource) -> Result<WideTable, LoaderError> {
        let df = Self::read_frame(&source.region, &source.path)?;
        let table = Self::wide_from_frame(&source.region, &df)?;
        info!(
            region = %source.region,
            items = table.row_count(),
            months = table.month_count(),
            "loaded CPI table from {}",
            source.path.display()
        );
        Ok(table)
    }

    /// Load every table in order. Stops at the first failure.
    pub fn load_all(sources: &[TableSource]) -> Result<Vec<WideTable>, LoaderError> {
        sources.iter().map(Self::load_wide).collect()
    }

    /// Load the minimum-wage table.
    pub fn load_wages(path: &Path) -> Result<Vec<WageRecord>, LoaderError> {
        let identifier = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("wages")
            .to_string();
        let df = Self::read_frame(&identifier, path)?;
        let wages = Self::wages_from_frame(&identifier, &df)?;
        info!(regions = wages.len(), "loaded minimum wages from {}", path.display());
        Ok(wages)
    }

    /// Build a WideTable from a frame with an `Item` column and `YY-Mon` month columns.
    pub fn wide_from_frame(identifier: &str, df: &DataFrame) -> Result<WideTable, LoaderError> {
        let columns = Self::column_names(df);
        if !columns.iter().any(|c| c == ITEM_COLUMN) {
            return Err(LoaderError::MissingColumn {
                identifier: identifier.to_string(),
                column: ITEM_COLUMN.to_string(),
            });
        }

        let mut periods = Vec::new();
        let mut month_columns = Vec::new();
        let mut seen = HashSet::new();
        for name in columns.iter().filter(|c| *c != ITEM_COLUMN) {
            let period = name
                .parse::<Period>()
                .map_err(|source| LoaderError::InvalidMonthColumn {
                    identifier: identifier.to_string(),
                    column: name.clone(),
                    source,
                })?;
            if !seen.insert(period) {
                return Err(LoaderError::DuplicateMonth {
                    identifier: identifier.to_string(),
                    period,
                });
            }
            periods.push(period);
            month_columns.push(name.as_str());
        }
        if periods.is_empty() {
            return Err(LoaderError::NoMonthColumns {
                identifier: identifier.to_string(),
            });
        }

        let items = Self::string_column(identifier, df, ITEM_COLUMN)?;
        let month_values: Vec<Vec<Option<f64>>> = month_columns
            .iter()
            .map(|name| Self::float_column(identifier, df, name))
            .collect::<Result<_, _>>()?;

        let mut kept_items = Vec::with_capacity(items.len());
        let mut values = Vec::with_capacity(items.len());
        for (row, item) in items.into_iter().enumerate() {
            let Some(item) = item.filter(|i| !i.is_empty()) else {
                warn!(identifier, row, "skipping row without an item name");
                continue;
            };

            let mut cells = Vec::with_capacity(month_values.len());
            for (col, column_values) in month_values.iter().enumerate() {
                let cell = column_values[row];
                if let Some(v) = cell {
                    if v < 0.0 {
                        return Err(LoaderError::InvalidValue {
                            identifier: identifier.to_string(),
                            row,
                            column: month_columns[col].to_string(),
                            message: format!("CPI must be non-negative, got {v}"),
                        });
                    }
                }
                cells.push(cell);
            }
            kept_items.push(item);
            values.push(cells);
        }

        debug!(identifier, rows = kept_items.len(), "parsed wide table");

        Ok(WideTable {
            region: identifier.to_string(),
            items: kept_items,
            periods,
            values,
        })
    }

    /// Build wage records from a frame with region and `MinimumWage` columns.
    pub fn wages_from_frame(
        identifier: &str,
        df: &DataFrame,
    ) -> Result<Vec<WageRecord>, LoaderError> {
        let columns = Self::column_names(df);
        let region_column = [REGION_COLUMN, REGION_ALIAS_COLUMN]
            .into_iter()
            .find(|name| columns.iter().any(|c| c == name))
            .ok_or_else(|| LoaderError::MissingColumn {
                identifier: identifier.to_string(),
                column: REGION_COLUMN.to_string(),
            })?;
        if !columns.iter().any(|c| c == WAGE_COLUMN) {
            return Err(LoaderError::MissingColumn {
                identifier: identifier.to_string(),
                column: WAGE_COLUMN.to_string(),
            });
        }

        let regions = Self::string_column(identifier, df, region_column)?;
        let wages = Self::float_column(identifier, df, WAGE_COLUMN)?;

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(regions.len());
        for (row, (region, wage)) in regions.into_iter().zip(wages).enumerate() {
            let region = region
                .filter(|r| !r.is_empty())
                .ok_or_else(|| LoaderError::InvalidValue {
                    identifier: identifier.to_string(),
                    row,
                    column: region_column.to_string(),
                    message: "region is empty".to_string(),
                })?;
            let minimum_wage = match wage {
                Some(w) if w > 0.0 => w,
                other => {
                    return Err(LoaderError::InvalidValue {
                        identifier: identifier.to_string(),
                        row,
                        column: WAGE_COLUMN.to_string(),
                        message: match other {
                            Some(w) => format!("minimum wage must be positive, got {w}"),
                            None => "minimum wage is missing".to_string(),
                        },
                    })
                }
            };
            if !seen.insert(region.clone()) {
                return Err(LoaderError::DuplicateRegion {
                    identifier: identifier.to_string(),
                    region,
                });
            }
            records.push(WageRecord {
                region,
                minimum_wage,
            });
        }

        Ok(records)
    }

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.trim().to_string())
            .collect()
    }

    /// Find a column by trimmed header name.
    fn column<'a>(
        identifier: &str,
        df: &'a DataFrame,
        name: &str,
    ) -> Result<&'a Column, LoaderError> {
        df.get_columns()
            .iter()
            .find(|c| c.name().trim() == name)
            .ok_or_else(|| LoaderError::MissingColumn {
                identifier: identifier.to_string(),
                column: name.to_string(),
            })
    }

    fn string_column(
        identifier: &str,
        df: &DataFrame,
        name: &str,
    ) -> Result<Vec<Option<String>>, LoaderError> {
        let column = Self::column(identifier, df, name)?
            .cast(&DataType::String)
            .map_err(|e| LoaderError::polars(identifier, e))?;
        let ca = column
            .as_materialized_series()
            .str()
            .map_err(|e| LoaderError::polars(identifier, e))?;
        Ok(ca
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect())
    }

    fn float_column(
        identifier: &str,
        df: &DataFrame,
        name: &str,
    ) -> Result<Vec<Option<f64>>, LoaderError> {
        let column = Self::column(identifier, df, name)?
            .cast(&DataType::Float64)
            .map_err(|e| LoaderError::polars(identifier, e))?;
        let ca = column
            .as_materialized_series()
            .f64()
            .map_err(|e| LoaderError::polars(identifier, e))?;
        Ok(ca
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_wide_table() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "ON.CPI.1810000401.csv",
            "Item,24-Jan,24-Feb,24-Mar\nAll-items,160.1,161.0,162.3\nFood,190.5,191.2,190.9\n",
        );

        let source = TableSource::from_path(&path).unwrap();
        assert_eq!(source.region, "ON");

        let table = DataLoader::load_wide(&source).unwrap();
        assert_eq!(table.region, "ON");
        assert_eq!(table.items, vec!["All-items", "Food"]);
        assert_eq!(
            table.periods.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["24-Jan", "24-Feb", "24-Mar"]
        );
        assert_eq!(table.cell(1, 2), Some(190.9));
    }

    #[test]
    fn test_non_numeric_cells_become_missing() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "NL.csv",
            "Item,24-Jan,24-Feb\nAll-items,150.0,..\nFood,170.0,171.0\n",
        );

        let table = DataLoader::load_wide(&TableSource::new("NL", path)).unwrap();
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(1, 1), Some(171.0));
    }

    #[test]
    fn test_missing_file_names_identifier() {
        let dir = TempDir::new().unwrap();
        let source = TableSource::new("QC", dir.path().join("QC.CPI.csv"));

        let err = DataLoader::load_wide(&source).unwrap_err();
        assert!(matches!(err, LoaderError::MissingFile { .. }));
        assert!(err.to_string().contains("[QC]"));
    }

    #[test]
    fn test_missing_item_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "AB.csv", "Product,24-Jan\nFood,1.0\n");

        let err = DataLoader::load_wide(&TableSource::new("AB", path)).unwrap_err();
        match err {
            LoaderError::MissingColumn { column, .. } => assert_eq!(column, "Item"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_month_header() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "AB.csv", "Item,24-Jan,Notes\nFood,1.0,x\n");

        let err = DataLoader::load_wide(&TableSource::new("AB", path)).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidMonthColumn { .. }));
    }

    #[test]
    fn test_no_month_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "AB.csv", "Item\nFood\n");

        let err = DataLoader::load_wide(&TableSource::new("AB", path)).unwrap_err();
        assert!(matches!(err, LoaderError::NoMonthColumns { .. }));
    }

    #[test]
    fn test_negative_cpi_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "AB.csv", "Item,24-Jan\nFood,-3.0\n");

        let err = DataLoader::load_wide(&TableSource::new("AB", path)).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_wages_with_province_alias() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "MinimumWages.csv",
            "Province,MinimumWage\nON,17.2\nAB,15.0\n",
        );

        let wages = DataLoader::load_wages(&path).unwrap();
        assert_eq!(wages.len(), 2);
        assert_eq!(wages[0].region, "ON");
        assert_eq!(wages[1].minimum_wage, 15.0);
    }

    #[test]
    fn test_wages_require_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "MinimumWages.csv", "Region,Wage\nON,17.2\n");

        let err = DataLoader::load_wages(&path).unwrap_err();
        match err {
            LoaderError::MissingColumn { column, .. } => assert_eq!(column, "MinimumWage"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wages_require_region_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "MinimumWages.csv", "Name,MinimumWage\nON,17.2\n");

        let err = DataLoader::load_wages(&path).unwrap_err();
        match err {
            LoaderError::MissingColumn { column, .. } => assert_eq!(column, "Region"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wages_reject_duplicates_and_non_positive() {
        let dir = TempDir::new().unwrap();
        let dup = write(&dir, "dup.csv", "Region,MinimumWage\nON,17.2\nON,16.0\n");
        assert!(matches!(
            DataLoader::load_wages(&dup).unwrap_err(),
            LoaderError::DuplicateRegion { .. }
        ));

        let zero = write(&dir, "zero.csv", "Region,MinimumWage\nON,0\n");
        assert!(matches!(
            DataLoader::load_wages(&zero).unwrap_err(),
            LoaderError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_table_source_parsing() {
        let explicit: TableSource = "BC=data/bc.csv".parse().unwrap();
        assert_eq!(explicit, TableSource::new("BC", "data/bc.csv"));

        let derived: TableSource = "data/PEI.CPI.1810000401.csv".parse().unwrap();
        assert_eq!(derived.region, "PEI");

        assert!("=data/bc.csv".parse::<TableSource>().is_err());
    }

    #[test]
    fn test_default_set_paths() {
        let set = TableSource::default_set(Path::new("data"));
        assert_eq!(set.len(), 11);
        assert_eq!(set[0].region, "Canada");
        assert_eq!(set[0].path, Path::new("data/Canada.CPI.1810000401.csv"));
    }
}
