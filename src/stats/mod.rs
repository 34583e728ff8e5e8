//! Stats module - CPI derivations and descriptive statistics

mod calculator;

pub use calculator::{
    AnnualChange, AverageChange, DescriptiveStats, EquivalentSalary, Granularity, RealWage,
    Selection, StatsCalculator,
};
