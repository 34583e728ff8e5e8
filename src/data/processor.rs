//! Data Processor Module
//! Reshapes wide CPI tables into long records and combines regions.

use super::period::Period;
use super::table::{LongRecord, WideTable};
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Duplicate observation for item '{item}' in region '{region}' at {period}")]
    DuplicateObservation {
        item: String,
        region: String,
        period: Period,
    },
}

/// Handles the wide -> long reshape (melt).
pub struct DataProcessor;

impl DataProcessor {
    /// Melt a wide table into one record per (item, month), tagged with `region`.
    ///
    /// Emitted row-major: every month of the first item, then the next item.
    pub fn reshape(table: &WideTable, region: &str) -> Vec<LongRecord> {
        let mut records = Vec::with_capacity(table.row_count() * table.month_count());
        for (row, item) in table.items.iter().enumerate() {
            for (column, period) in table.periods.iter().enumerate() {
                records.push(LongRecord {
                    item: item.clone(),
                    region: region.to_string(),
                    period: *period,
                    cpi: table.cell(row, column),
                });
            }
        }
        records
    }
}

/// Every region's long records, concatenated in load order.
#[derive(Debug, Clone, Default)]
pub struct CombinedTable {
    records: Vec<LongRecord>,
    regions: Vec<String>,
}

impl CombinedTable {
    /// Reshape and concatenate tables. Fails if any (item, region, month) repeats.
    pub fn concat(tables: &[WideTable]) -> Result<Self, ProcessorError> {
        let mut combined = Self::default();
        for table in tables {
            combined.extend(DataProcessor::reshape(table, &table.region))?;
        }
        info!(
            records = combined.records.len(),
            regions = combined.regions.len(),
            "combined long table"
        );
        Ok(combined)
    }

    /// Build directly from long records.
    pub fn from_records(records: Vec<LongRecord>) -> Result<Self, ProcessorError> {
        let mut combined = Self::default();
        combined.extend(records)?;
        Ok(combined)
    }

    fn extend(&mut self, records: Vec<LongRecord>) -> Result<(), ProcessorError> {
        let mut seen: HashSet<(&str, &str, Period)> = self
            .records
            .iter()
            .map(|r| (r.item.as_str(), r.region.as_str(), r.period))
            .collect();
        for record in &records {
            if !seen.insert((record.item.as_str(), record.region.as_str(), record.period)) {
                return Err(ProcessorError::DuplicateObservation {
                    item: record.item.clone(),
                    region: record.region.clone(),
                    period: record.period,
                });
            }
        }
        drop(seen);

        for record in records {
            if !self.regions.contains(&record.region) {
                self.regions.push(record.region.clone());
            }
            self.records.push(record);
        }
        Ok(())
    }

    pub fn records(&self) -> &[LongRecord] {
        &self.records
    }

    /// Regions in the order they were first loaded.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn head(&self, n: usize) -> &[LongRecord] {
        &self.records[..n.min(self.records.len())]
    }

    /// Records whose item is listed, in table order. An empty list keeps every record.
    pub fn filter_items(&self, items: &[String]) -> Vec<LongRecord> {
        self.records
            .iter()
            .filter(|r| items.is_empty() || items.contains(&r.item))
            .cloned()
            .collect()
    }

    /// Records of one region at one month for the listed items, in table order.
    pub fn sample(&self, region: &str, period: Period, items: &[String]) -> Vec<&LongRecord> {
        self.records
            .iter()
            .filter(|r| r.region == region && r.period == period && items.contains(&r.item))
            .collect()
    }

    /// Rebuild one region's wide table (long -> wide).
    ///
    /// Items and months keep their first-seen order.
    pub fn pivot(&self, region: &str) -> Option<WideTable> {
        let mut items: Vec<String> = Vec::new();
        let mut periods: Vec<Period> = Vec::new();
        let region_records: Vec<&LongRecord> =
            self.records.iter().filter(|r| r.region == region).collect();
        if region_records.is_empty() {
            return None;
        }

        for record in &region_records {
            if !items.contains(&record.item) {
                items.push(record.item.clone());
            }
            if !periods.contains(&record.period) {
                periods.push(record.period);
            }
        }

        let mut values = vec![vec![None; periods.len()]; items.len()];
        for record in region_records {
            let row = items.iter().position(|i| *i == record.item)?;
            let column = periods.iter().position(|p| *p == record.period)?;
            values[row][column] = record.cpi;
        }

        Some(WideTable {
            region: region.to_string(),
            items,
            periods,
            values,
        })
    }

    /// Long table as a DataFrame with columns `Item, Month, Region, CPI`.
    pub fn to_dataframe(&self) -> Result<DataFrame, ProcessorError> {
        let items: Vec<&str> = self.records.iter().map(|r| r.item.as_str()).collect();
        let months: Vec<String> = self.records.iter().map(|r| r.period.to_string()).collect();
        let regions: Vec<&str> = self.records.iter().map(|r| r.region.as_str()).collect();
        let cpi: Vec<Option<f64>> = self.records.iter().map(|r| r.cpi).collect();

        let df = DataFrame::new(vec![
            Column::new("Item".into(), items),
            Column::new("Month".into(), months),
            Column::new("Region".into(), regions),
            Column::new("CPI".into(), cpi),
        ])?;

        Ok(df)
    }

    /// Write the long table to a CSV file.
    pub fn write_csv(&self, path: &Path) -> Result<(), ProcessorError> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        info!(rows = df.height(), "exported long table to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn period(label: &str) -> Period {
        label.parse().unwrap()
    }

    fn wide(region: &str) -> WideTable {
        WideTable {
            region: region.to_string(),
            items: vec!["All-items".into(), "Food".into(), "Shelter".into()],
            periods: vec![period("24-Jan"), period("24-Feb")],
            values: vec![
                vec![Some(158.3), Some(159.2)],
                vec![Some(189.0), None],
                vec![Some(171.4), Some(172.0)],
            ],
        }
    }

    #[test]
    fn test_reshape_row_count_and_order() {
        let table = wide("ON");
        let long = DataProcessor::reshape(&table, "ON");

        assert_eq!(long.len(), table.row_count() * table.month_count());
        assert_eq!(long[0].item, "All-items");
        assert_eq!(long[0].period, period("24-Jan"));
        assert_eq!(long[1].item, "All-items");
        assert_eq!(long[1].period, period("24-Feb"));
        assert_eq!(long[2].item, "Food");
        assert!(long.iter().all(|r| r.region == "ON"));
    }

    #[test]
    fn test_missing_cells_are_kept() {
        let long = DataProcessor::reshape(&wide("ON"), "ON");
        let food_feb = long
            .iter()
            .find(|r| r.item == "Food" && r.period == period("24-Feb"))
            .unwrap();
        assert_eq!(food_feb.cpi, None);
    }

    #[test]
    fn test_pivot_round_trip() {
        let combined = CombinedTable::concat(&[wide("ON"), wide("BC")]).unwrap();
        assert_eq!(combined.pivot("ON").unwrap(), wide("ON"));
        assert_eq!(combined.pivot("BC").unwrap(), wide("BC"));
        assert!(combined.pivot("QC").is_none());
    }

    #[test]
    fn test_concat_keeps_region_order() {
        let combined = CombinedTable::concat(&[wide("SK"), wide("AB")]).unwrap();
        assert_eq!(combined.regions(), &["SK".to_string(), "AB".to_string()]);
        assert_eq!(combined.len(), 12);
        assert_eq!(combined.head(3).len(), 3);
        assert_eq!(combined.head(100).len(), 12);
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let err = CombinedTable::concat(&[wide("ON"), wide("ON")]).unwrap_err();
        assert!(matches!(err, ProcessorError::DuplicateObservation { .. }));
    }

    #[test]
    fn test_sample_filters_region_month_items() {
        let combined = CombinedTable::concat(&[wide("ON"), wide("BC")]).unwrap();
        let items = vec!["Food".to_string(), "Shelter".to_string()];
        let sample = combined.sample("BC", period("24-Jan"), &items);

        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].item, "Food");
        assert_eq!(sample[1].cpi, Some(171.4));
    }

    #[test]
    fn test_filter_items() {
        let combined = CombinedTable::concat(&[wide("ON"), wide("BC")]).unwrap();

        let food = combined.filter_items(&["Food".to_string()]);
        assert_eq!(food.len(), 4);
        assert!(food.iter().all(|r| r.item == "Food"));
        assert_eq!(food[0].region, "ON");
        assert_eq!(food[2].region, "BC");

        assert_eq!(combined.filter_items(&[]).len(), combined.len());
        assert!(combined.filter_items(&["Energy".to_string()]).is_empty());
    }

    #[test]
    fn test_dataframe_columns() {
        let combined = CombinedTable::concat(&[wide("ON")]).unwrap();
        let df = combined.to_dataframe().unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["Item", "Month", "Region", "CPI"]);
        assert_eq!(df.height(), 6);
    }

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.csv");
        let combined = CombinedTable::concat(&[wide("ON")]).unwrap();
        combined.write_csv(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Item,Month,Region,CPI"));
        assert_eq!(content.lines().count(), 7);
    }
}
