//! Statistics Calculator Module
//! Month-to-month change, salary scaling, real wages, annual change and
//! cross-region descriptive statistics over the combined CPI table.

use crate::data::{CombinedTable, LongRecord, Period, WageRecord};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("No '{item}' record for region '{region}' at {period}")]
    MissingKey {
        region: String,
        item: String,
        period: Period,
    },
    #[error("Multiple '{item}' records for region '{region}' at {period}")]
    DuplicateKey {
        region: String,
        item: String,
        period: Period,
    },
    #[error("Reference region '{region}' has no CPI value for '{item}' at {period}")]
    UndefinedReference {
        region: String,
        item: String,
        period: Period,
    },
}

/// How month-to-month change series are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// One series per region with every item interleaved. Mixes unrelated
    /// series; only meaningful when a region holds a single item.
    Region,
    /// One series per (region, item).
    RegionItem,
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::RegionItem
    }
}

/// One observation with its change from the previous month of its group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePoint {
    pub region: String,
    pub item: String,
    pub period: Period,
    pub cpi: Option<f64>,
    /// Percent change from the previous point; `None` for the first point or
    /// when either value is missing or the previous value is zero.
    pub change: Option<f64>,
}

/// Mean month-to-month change of one group, rounded to 1 decimal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageChange {
    pub region: String,
    /// `None` when grouped by region only.
    pub item: Option<String>,
    pub average: Option<f64>,
    /// Number of defined changes averaged.
    pub changes: usize,
}

/// Winner of an arg-max / arg-min plus every row tied with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<T> {
    pub winner: T,
    pub value: f64,
    pub ties: Vec<T>,
}

/// A region's CPI for one (item, month).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotEntry {
    pub region: String,
    pub cpi: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalentSalary {
    pub region: String,
    pub cpi: Option<f64>,
    pub equivalent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealWage {
    pub region: String,
    pub nominal: f64,
    pub cpi: Option<f64>,
    pub real: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualChange {
    pub region: String,
    pub start_cpi: Option<f64>,
    pub end_cpi: Option<f64>,
    pub change: Option<f64>,
}

/// Descriptive statistics for a set of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

/// Round to `decimals` places, ties to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// `(current - previous) / previous * 100`, undefined for a zero or missing base.
pub fn percent_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(prev), Some(cur)) if prev != 0.0 => Some((cur - prev) / prev * 100.0),
        _ => None,
    }
}

/// `numerator / denominator`, undefined for a zero or missing denominator.
fn ratio(numerator: f64, denominator: Option<f64>) -> Option<f64> {
    denominator.filter(|d| *d != 0.0).map(|d| numerator / d)
}

/// Handles the derivations over the combined table.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Month-to-month change for every record, grouped per `granularity`.
    ///
    /// Groups come out in first-seen order; points within a group in
    /// chronological order.
    pub fn month_to_month_changes(
        records: &[LongRecord],
        granularity: Granularity,
    ) -> Vec<ChangePoint> {
        let mut order: Vec<(String, Option<String>)> = Vec::new();
        let mut groups: HashMap<(String, Option<String>), Vec<&LongRecord>> = HashMap::new();

        for record in records {
            let key = match granularity {
                Granularity::Region => (record.region.clone(), None),
                Granularity::RegionItem => (record.region.clone(), Some(record.item.clone())),
            };
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(record);
        }

        let mut points = Vec::with_capacity(records.len());
        for key in order {
            let Some(mut group) = groups.remove(&key) else {
                continue;
            };
            // Stable: ties on period keep table order.
            group.sort_by_key(|r| r.period);

            let mut previous: Option<Option<f64>> = None;
            for record in group {
                let change = previous.and_then(|prev| percent_change(prev, record.cpi));
                points.push(ChangePoint {
                    region: record.region.clone(),
                    item: record.item.clone(),
                    period: record.period,
                    cpi: record.cpi,
                    change,
                });
                previous = Some(record.cpi);
            }
        }

        points
    }

    /// Average month-to-month change per group, rounded to 1 decimal.
    pub fn average_changes(
        records: &[LongRecord],
        granularity: Granularity,
    ) -> Vec<AverageChange> {
        if granularity == Granularity::Region {
            warn!("averaging month-to-month change across all items of a region");
        }

        let points = Self::month_to_month_changes(records, granularity);

        let mut order: Vec<(String, Option<String>)> = Vec::new();
        let mut changes: HashMap<(String, Option<String>), Vec<f64>> = HashMap::new();
        for point in &points {
            let key = match granularity {
                Granularity::Region => (point.region.clone(), None),
                Granularity::RegionItem => (point.region.clone(), Some(point.item.clone())),
            };
            let entry = changes.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Vec::new()
            });
            if let Some(change) = point.change {
                entry.push(change);
            }
        }

        order
            .into_iter()
            .map(|key| {
                let values = changes.remove(&key).unwrap_or_default();
                let average = if values.is_empty() {
                    None
                } else {
                    Some(round_to(values.iter().mean(), 1))
                };
                let (region, item) = key;
                debug!(%region, ?item, ?average, "average month-to-month change");
                AverageChange {
                    region,
                    item,
                    average,
                    changes: values.len(),
                }
            })
            .collect()
    }

    /// Arg-max over `rows` in their given order. Rows with no metric are skipped.
    /// The first maximum wins; later rows with the same value are listed as ties.
    pub fn select_max<'a, T, F>(rows: &'a [T], metric: F) -> Option<Selection<&'a T>>
    where
        F: Fn(&T) -> Option<f64>,
    {
        Self::select_by(rows, metric, |candidate, best| candidate > best)
    }

    /// Arg-min counterpart of [`Self::select_max`].
    pub fn select_min<'a, T, F>(rows: &'a [T], metric: F) -> Option<Selection<&'a T>>
    where
        F: Fn(&T) -> Option<f64>,
    {
        Self::select_by(rows, metric, |candidate, best| candidate < best)
    }

    fn select_by<'a, T, F, B>(rows: &'a [T], metric: F, better: B) -> Option<Selection<&'a T>>
    where
        F: Fn(&T) -> Option<f64>,
        B: Fn(f64, f64) -> bool,
    {
        let mut selection: Option<Selection<&'a T>> = None;
        for row in rows {
            let Some(value) = metric(row) else {
                continue;
            };
            match selection.as_mut() {
                None => {
                    selection = Some(Selection {
                        winner: row,
                        value,
                        ties: Vec::new(),
                    })
                }
                Some(current) if better(value, current.value) => {
                    *current = Selection {
                        winner: row,
                        value,
                        ties: Vec::new(),
                    };
                }
                Some(current) if value == current.value => current.ties.push(row),
                Some(_) => {}
            }
        }

        if let Some(s) = &selection {
            if !s.ties.is_empty() {
                warn!(
                    value = s.value,
                    tied = s.ties.len(),
                    "selection has ties; first in region order wins"
                );
            }
        }
        selection
    }

    /// Best average change of each item across regions, items in first-seen order.
    pub fn best_change_by_item(
        averages: &[AverageChange],
    ) -> Vec<(String, Selection<&AverageChange>)> {
        let mut items: Vec<&str> = Vec::new();
        for avg in averages {
            if let Some(item) = avg.item.as_deref() {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }

        items
            .into_iter()
            .filter_map(|item| {
                let selection = Self::select_by(
                    averages,
                    |a| {
                        if a.item.as_deref() == Some(item) {
                            a.average
                        } else {
                            None
                        }
                    },
                    |candidate, best| candidate > best,
                )?;
                Some((item.to_string(), selection))
            })
            .collect()
    }

    /// Each region's CPI for (item, period), in region load order.
    ///
    /// Regions without a matching record are absent; a region with more than
    /// one matching record is an error.
    pub fn cpi_snapshot(
        table: &CombinedTable,
        item: &str,
        period: Period,
    ) -> Result<Vec<SnapshotEntry>, StatsError> {
        let mut snapshot: Vec<SnapshotEntry> = Vec::new();
        for record in table
            .records()
            .iter()
            .filter(|r| r.item == item && r.period == period)
        {
            if snapshot.iter().any(|e| e.region == record.region) {
                return Err(StatsError::DuplicateKey {
                    region: record.region.clone(),
                    item: item.to_string(),
                    period,
                });
            }
            snapshot.push(SnapshotEntry {
                region: record.region.clone(),
                cpi: record.cpi,
            });
        }
        Ok(snapshot)
    }

    /// Salary in every region with the purchasing power of `base_amount` in
    /// `reference`: `base_amount * CPI[region] / CPI[reference]`, 2 decimals.
    pub fn equivalent_salaries(
        table: &CombinedTable,
        reference: &str,
        item: &str,
        period: Period,
        base_amount: f64,
    ) -> Result<Vec<EquivalentSalary>, StatsError> {
        let snapshot = Self::cpi_snapshot(table, item, period)?;
        let reference_cpi = snapshot
            .iter()
            .find(|e| e.region == reference)
            .ok_or_else(|| StatsError::MissingKey {
                region: reference.to_string(),
                item: item.to_string(),
                period,
            })?
            .cpi
            .ok_or_else(|| StatsError::UndefinedReference {
                region: reference.to_string(),
                item: item.to_string(),
                period,
            })?;

        if reference_cpi == 0.0 {
            warn!(reference, "reference CPI is zero; equivalent salaries undefined");
        }

        Ok(snapshot
            .into_iter()
            .map(|entry| {
                let equivalent = entry
                    .cpi
                    .and_then(|cpi| ratio(base_amount * cpi, Some(reference_cpi)))
                    .map(|v| round_to(v, 2));
                EquivalentSalary {
                    region: entry.region,
                    cpi: entry.cpi,
                    equivalent,
                }
            })
            .collect())
    }

    /// Inner join of wages with a CPI snapshot on region:
    /// `real = nominal / CPI * 100`, 2 decimals. Output follows snapshot order.
    pub fn real_wages(wages: &[WageRecord], snapshot: &[SnapshotEntry]) -> Vec<RealWage> {
        let by_region: HashMap<&str, f64> = wages
            .iter()
            .map(|w| (w.region.as_str(), w.minimum_wage))
            .collect();

        for wage in wages {
            if !snapshot.iter().any(|e| e.region == wage.region) {
                debug!(region = %wage.region, "no CPI snapshot; dropped from real wages");
            }
        }

        snapshot
            .iter()
            .filter_map(|entry| {
                let nominal = *by_region.get(entry.region.as_str())?;
                let real = ratio(nominal, entry.cpi).map(|v| round_to(v * 100.0, 2));
                Some(RealWage {
                    region: entry.region.clone(),
                    nominal,
                    cpi: entry.cpi,
                    real,
                })
            })
            .collect()
    }

    /// Percent change of `item` from `start` to `end` per region, 1 decimal.
    /// Regions missing either endpoint are excluded.
    pub fn annual_changes(
        table: &CombinedTable,
        item: &str,
        start: Period,
        end: Period,
    ) -> Result<Vec<AnnualChange>, StatsError> {
        let start_snapshot = Self::cpi_snapshot(table, item, start)?;
        let end_snapshot = Self::cpi_snapshot(table, item, end)?;

        Ok(start_snapshot
            .into_iter()
            .filter_map(|first| {
                let last = end_snapshot.iter().find(|e| e.region == first.region)?;
                let change = percent_change(first.cpi, last.cpi).map(|v| round_to(v, 1));
                Some(AnnualChange {
                    region: first.region,
                    start_cpi: first.cpi,
                    end_cpi: last.cpi,
                    change,
                })
            })
            .collect())
    }

    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> Option<DescriptiveStats> {
        let n = values.len();
        if n == 0 {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        let std = if n > 1 { values.iter().std_dev() } else { 0.0 };

        Some(DescriptiveStats {
            count: n,
            mean: values.iter().mean(),
            median,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        })
    }

    /// Descriptive statistics of the defined CPI values in a snapshot.
    pub fn snapshot_stats(snapshot: &[SnapshotEntry]) -> Option<DescriptiveStats> {
        let values: Vec<f64> = snapshot.iter().filter_map(|e| e.cpi).collect();
        Self::compute_descriptive_stats(&values)
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }
}
