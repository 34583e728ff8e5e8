//! Table Types
//! Wide (one column per month) and long (one row per observation) CPI shapes.

use super::period::Period;
use serde::Serialize;

/// One region's CPI table as loaded: one row per item, one column per month.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub region: String,
    pub items: Vec<String>,
    pub periods: Vec<Period>,
    /// Row-major cells, `values[row][column]`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl WideTable {
    pub fn row_count(&self) -> usize {
        self.items.len()
    }

    pub fn month_count(&self) -> usize {
        self.periods.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(column)).copied().flatten()
    }
}

/// A single (item, region, month) observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRecord {
    pub item: String,
    pub region: String,
    pub period: Period,
    /// `None` when the source cell was empty or not numeric.
    pub cpi: Option<f64>,
}

/// Nominal minimum wage for one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WageRecord {
    pub region: String,
    pub minimum_wage: f64,
}
