//! Report pipeline: load -> reshape -> derive -> report sections.

use crate::config::{InputConfig, ReportConfig};
use crate::data::{CombinedTable, DataLoader, LongRecord, WageRecord};
use crate::report::{Leader, Report, Section, SectionBody, Unit};
use crate::stats::{Granularity, StatsCalculator};
use anyhow::{Context, Result};
use tracing::info;

/// Load every input table and build the combined long table.
pub fn load(inputs: &InputConfig) -> Result<(CombinedTable, Vec<WageRecord>)> {
    let tables = DataLoader::load_all(&inputs.tables).context("loading CPI tables")?;
    let combined = CombinedTable::concat(&tables).context("combining CPI tables")?;
    let wages = DataLoader::load_wages(&inputs.wages).context("loading minimum wages")?;
    info!(
        records = combined.len(),
        regions = combined.regions().len(),
        wages = wages.len(),
        "inputs loaded"
    );

    if let Some(path) = &inputs.export_long {
        combined
            .write_csv(path)
            .with_context(|| format!("exporting long table to {}", path.display()))?;
    }

    Ok((combined, wages))
}

/// Derive every report section from loaded data.
pub fn build_report(
    combined: &CombinedTable,
    wages: &[WageRecord],
    config: &ReportConfig,
) -> Result<Report> {
    let mut sections = Vec::new();

    let sample: Vec<LongRecord> = combined
        .sample(&config.sample_region, config.sample_period, &config.sample_items)
        .into_iter()
        .cloned()
        .collect();
    sections.push(Section::new(
        format!(
            "Combined table excerpt ({}, {})",
            config.sample_region, config.sample_period
        ),
        SectionBody::Records { rows: sample },
    ));

    sections.push(Section::new(
        format!("First {} rows of the combined table", config.head_rows),
        SectionBody::Records {
            rows: combined.head(config.head_rows).to_vec(),
        },
    ));

    sections.extend(change_sections(combined, config));
    sections.extend(salary_sections(combined, config)?);
    sections.push(wage_section(combined, wages, config)?);
    sections.extend(annual_sections(combined, config)?);

    info!(sections = sections.len(), "report built");
    Ok(Report {
        config: config.clone(),
        sections,
    })
}

fn change_sections(combined: &CombinedTable, config: &ReportConfig) -> Vec<Section> {
    let records = combined.filter_items(&config.change_items);
    let averages = StatsCalculator::average_changes(&records, config.granularity);

    let leaders: Vec<Leader> = match config.granularity {
        Granularity::RegionItem => StatsCalculator::best_change_by_item(&averages)
            .iter()
            .map(|(item, selection)| {
                Leader::from_selection(
                    format!("Highest average change in {item}"),
                    selection,
                    |a| a.region.as_str(),
                    Unit::Percent,
                )
            })
            .collect(),
        Granularity::Region => StatsCalculator::select_max(&averages, |a| a.average)
            .map(|selection| {
                Leader::from_selection(
                    "Highest average change (all items mixed)",
                    &selection,
                    |a| a.region.as_str(),
                    Unit::Percent,
                )
            })
            .into_iter()
            .collect(),
    };

    vec![
        Section::new(
            "Average month-to-month change (%)",
            SectionBody::AverageChanges { rows: averages },
        ),
        Section::new(
            "Region with the highest average change",
            SectionBody::Leaders { rows: leaders },
        ),
    ]
}

fn salary_sections(combined: &CombinedTable, config: &ReportConfig) -> Result<Vec<Section>> {
    let salaries = StatsCalculator::equivalent_salaries(
        combined,
        &config.reference_region,
        &config.snapshot_item,
        config.snapshot_period,
        config.base_amount,
    )
    .context("computing equivalent salaries")?;

    let snapshot =
        StatsCalculator::cpi_snapshot(combined, &config.snapshot_item, config.snapshot_period)
            .context("building CPI snapshot")?;

    Ok(vec![
        Section::new(
            format!(
                "Equivalent salary to ${:.0} in {} ({})",
                config.base_amount, config.reference_region, config.snapshot_period
            ),
            SectionBody::EquivalentSalaries {
                reference: config.reference_region.clone(),
                base_amount: config.base_amount,
                rows: salaries,
            },
        ),
        Section::new(
            format!("Cross-region CPI summary ({})", config.snapshot_period),
            SectionBody::Summary {
                label: format!("{} CPI across regions", config.snapshot_item),
                stats: StatsCalculator::snapshot_stats(&snapshot),
            },
        ),
    ])
}

fn wage_section(
    combined: &CombinedTable,
    wages: &[WageRecord],
    config: &ReportConfig,
) -> Result<Section> {
    // Region load order is the tie-break order; wages outside it keep file order.
    let mut ordered = wages.to_vec();
    ordered.sort_by_key(|w| {
        combined
            .regions()
            .iter()
            .position(|r| *r == w.region)
            .unwrap_or(usize::MAX)
    });

    let snapshot =
        StatsCalculator::cpi_snapshot(combined, &config.snapshot_item, config.snapshot_period)
            .context("building CPI snapshot for real wages")?;
    let real = StatsCalculator::real_wages(&ordered, &snapshot);

    let mut leaders = Vec::new();
    if let Some(s) = StatsCalculator::select_max(&ordered, |w| Some(w.minimum_wage)) {
        leaders.push(Leader::from_selection(
            "Highest nominal minimum wage",
            &s,
            |w| w.region.as_str(),
            Unit::Currency,
        ));
    }
    if let Some(s) = StatsCalculator::select_min(&ordered, |w| Some(w.minimum_wage)) {
        leaders.push(Leader::from_selection(
            "Lowest nominal minimum wage",
            &s,
            |w| w.region.as_str(),
            Unit::Currency,
        ));
    }
    if let Some(s) = StatsCalculator::select_max(&real, |r| r.real) {
        leaders.push(Leader::from_selection(
            format!("Highest real minimum wage ({})", config.snapshot_period),
            &s,
            |r| r.region.as_str(),
            Unit::Currency,
        ));
    }
    if let Some(s) = StatsCalculator::select_min(&real, |r| r.real) {
        leaders.push(Leader::from_selection(
            format!("Lowest real minimum wage ({})", config.snapshot_period),
            &s,
            |r| r.region.as_str(),
            Unit::Currency,
        ));
    }

    Ok(Section::new(
        "Minimum wage analysis",
        SectionBody::RealWages {
            rows: real,
            leaders,
        },
    ))
}

fn annual_sections(combined: &CombinedTable, config: &ReportConfig) -> Result<Vec<Section>> {
    let changes = StatsCalculator::annual_changes(
        combined,
        &config.annual_item,
        config.annual_start,
        config.annual_end,
    )
    .context("computing annual change")?;

    let leaders: Vec<Leader> = StatsCalculator::select_max(&changes, |c| c.change)
        .map(|s| {
            Leader::from_selection(
                format!("Highest inflation in {}", config.annual_item),
                &s,
                |c| c.region.as_str(),
                Unit::Percent,
            )
        })
        .into_iter()
        .collect();

    Ok(vec![
        Section::new(
            format!(
                "Annual change in CPI for {} ({} to {})",
                config.annual_item, config.annual_start, config.annual_end
            ),
            SectionBody::AnnualChanges { rows: changes },
        ),
        Section::new(
            format!("Region with the highest inflation in {}", config.annual_item),
            SectionBody::Leaders { rows: leaders },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Period, TableSource, WideTable};
    use crate::report::ReportRenderer;
    use std::fs;
    use tempfile::TempDir;

    fn period(label: &str) -> Period {
        label.parse().unwrap()
    }

    fn wide(region: &str, base: f64) -> WideTable {
        WideTable {
            region: region.to_string(),
            items: vec![
                "All-items".into(),
                "Food".into(),
                "Shelter".into(),
                "Services".into(),
            ],
            periods: vec![period("24-Jan"), period("24-Feb"), period("24-Dec")],
            values: vec![
                vec![Some(base), Some(base + 1.0), Some(base + 3.0)],
                vec![Some(base + 20.0), Some(base + 22.0), Some(base + 25.0)],
                vec![Some(base + 10.0), Some(base + 10.0), Some(base + 12.0)],
                vec![Some(base + 5.0), Some(base + 6.0), Some(base + 9.0)],
            ],
        }
    }

    fn config() -> ReportConfig {
        ReportConfig {
            sample_region: "ON".into(),
            ..ReportConfig::default()
        }
    }

    #[test]
    fn test_build_report_sections() {
        let combined = CombinedTable::concat(&[wide("ON", 150.0), wide("BC", 165.0)]).unwrap();
        let wages = vec![
            WageRecord {
                region: "ON".into(),
                minimum_wage: 17.2,
            },
            WageRecord {
                region: "BC".into(),
                minimum_wage: 17.4,
            },
            WageRecord {
                region: "NU".into(),
                minimum_wage: 19.0,
            },
        ];

        let report = build_report(&combined, &wages, &config()).unwrap();
        assert_eq!(report.sections.len(), 9);

        match &report.sections[0].body {
            SectionBody::Records { rows } => assert_eq!(rows.len(), 3),
            other => panic!("unexpected body: {other:?}"),
        }
        match &report.sections[1].body {
            SectionBody::Records { rows } => assert_eq!(rows.len(), 12),
            other => panic!("unexpected body: {other:?}"),
        }
        match &report.sections[4].body {
            SectionBody::EquivalentSalaries { rows, .. } => {
                assert_eq!(rows[0].equivalent, Some(100000.0));
            }
            other => panic!("unexpected body: {other:?}"),
        }
        match &report.sections[6].body {
            SectionBody::RealWages { rows, leaders } => {
                assert!(rows.iter().all(|r| r.region != "NU"));
                assert_eq!(leaders.len(), 4);
                assert_eq!(leaders[0].region, "NU");
                assert_eq!(leaders[1].region, "ON");
            }
            other => panic!("unexpected body: {other:?}"),
        }
        match &report.sections[7].body {
            SectionBody::AnnualChanges { rows } => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].change, Some(2.6));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_text_report_with_mixed_granularity() {
        let combined = CombinedTable::concat(&[wide("ON", 150.0), wide("BC", 165.0)]).unwrap();
        let wages = vec![
            WageRecord {
                region: "ON".into(),
                minimum_wage: 17.2,
            },
            WageRecord {
                region: "BC".into(),
                minimum_wage: 17.4,
            },
        ];
        let config = ReportConfig {
            granularity: Granularity::Region,
            ..config()
        };

        let report = build_report(&combined, &wages, &config).unwrap();
        match &report.sections[3].body {
            SectionBody::Leaders { rows } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].label, "Highest average change (all items mixed)");
            }
            other => panic!("unexpected body: {other:?}"),
        }

        let mut buf = Vec::new();
        ReportRenderer::render_text(&report, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        let titles = [
            "Combined table excerpt (ON, 24-Jan)",
            "First 12 rows of the combined table",
            "Average month-to-month change (%)",
            "Region with the highest average change",
            "Equivalent salary to $100000 in ON (24-Dec)",
            "Cross-region CPI summary (24-Dec)",
            "Minimum wage analysis",
            "Annual change in CPI for Services (24-Jan to 24-Dec)",
            "Region with the highest inflation in Services",
        ];
        let mut cursor = 0;
        for title in titles {
            let found = out[cursor..]
                .find(title)
                .unwrap_or_else(|| panic!("missing or out of order: {title}"));
            cursor += found + title.len();
        }
        assert_eq!(out.matches("Highest average change (all items mixed):").count(), 1);
        assert!(out.contains("(all items)"));
    }

    #[test]
    fn test_missing_reference_is_fatal() {
        let combined = CombinedTable::concat(&[wide("BC", 165.0)]).unwrap();
        let err = build_report(&combined, &[], &config()).unwrap_err();
        assert!(format!("{err:#}").contains("equivalent salaries"));
    }

    #[test]
    fn test_load_from_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("ON.CPI.1810000401.csv"),
            "Item,24-Jan,24-Dec\nAll-items,150.0,155.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("MinimumWages.csv"),
            "Region,MinimumWage\nON,17.2\n",
        )
        .unwrap();
        let export = dir.path().join("long.csv");

        let inputs = InputConfig {
            tables: vec![TableSource::new("ON", dir.path().join("ON.CPI.1810000401.csv"))],
            wages: dir.path().join("MinimumWages.csv"),
            export_long: Some(export.clone()),
        };
        let (combined, wages) = load(&inputs).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(wages.len(), 1);
        assert!(export.exists());
    }

    #[test]
    fn test_load_reports_missing_table() {
        let dir = TempDir::new().unwrap();
        let inputs = InputConfig::from_data_dir(dir.path());
        let err = load(&inputs).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("loading CPI tables"));
        assert!(message.contains("[Canada]"));
    }
}
