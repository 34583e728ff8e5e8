//! Report module - Section model and rendering

mod renderer;

pub use renderer::{OutputFormat, ReportRenderer};

use crate::config::ReportConfig;
use crate::data::LongRecord;
use crate::stats::{
    AnnualChange, AverageChange, DescriptiveStats, EquivalentSalary, RealWage, Selection,
};
use serde::Serialize;

/// How a leader's value is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Currency,
}

/// The winner of an arg-max / arg-min question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leader {
    pub label: String,
    pub region: String,
    pub value: f64,
    pub unit: Unit,
    /// Regions with exactly the same value, in region order.
    pub ties: Vec<String>,
}

impl Leader {
    pub fn from_selection<T>(
        label: impl Into<String>,
        selection: &Selection<&T>,
        region: impl Fn(&T) -> &str,
        unit: Unit,
    ) -> Self {
        Self {
            label: label.into(),
            region: region(selection.winner).to_string(),
            value: selection.value,
            unit,
            ties: selection
                .ties
                .iter()
                .map(|t| region(*t).to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    Records {
        rows: Vec<LongRecord>,
    },
    AverageChanges {
        rows: Vec<AverageChange>,
    },
    Leaders {
        rows: Vec<Leader>,
    },
    EquivalentSalaries {
        reference: String,
        base_amount: f64,
        rows: Vec<EquivalentSalary>,
    },
    RealWages {
        rows: Vec<RealWage>,
        leaders: Vec<Leader>,
    },
    AnnualChanges {
        rows: Vec<AnnualChange>,
    },
    Summary {
        label: String,
        stats: Option<DescriptiveStats>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: String,
    pub body: SectionBody,
}

impl Section {
    pub fn new(title: impl Into<String>, body: SectionBody) -> Self {
        Self {
            title: title.into(),
            body,
        }
    }
}

/// Everything the program prints, in order.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: ReportConfig,
    pub sections: Vec<Section>,
}
