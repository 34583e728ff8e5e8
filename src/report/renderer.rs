//! Report Renderer
//! ASCII tables via `tabled`, or JSON. No derivation happens here.

use super::{Leader, Report, Section, SectionBody, Unit};
use crate::data::RegionDirectory;
use crate::stats::DescriptiveStats;
use std::io::{self, Write};
use tabled::{Table, Tabled};

const RULE_WIDTH: usize = 60;
const UNDEFINED: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn format_percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}%"))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

pub fn format_currency(value: Option<f64>) -> String {
    value
        .map(|v| format!("${v:.2}"))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

pub fn format_index(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(|| UNDEFINED.to_string())
}

fn format_unit(value: f64, unit: Unit) -> String {
    match unit {
        Unit::Percent => format_percent(Some(value)),
        Unit::Currency => format_currency(Some(value)),
    }
}

fn region_name(code: &str) -> String {
    RegionDirectory::display_name(code).to_string()
}

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Month")]
    month: String,
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "CPI")]
    cpi: String,
}

#[derive(Tabled)]
struct AverageRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Avg Month-to-Month Change")]
    average: String,
}

#[derive(Tabled)]
struct SalaryRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "CPI")]
    cpi: String,
    #[tabled(rename = "Equivalent Salary")]
    equivalent: String,
}

#[derive(Tabled)]
struct WageRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Minimum Wage")]
    nominal: String,
    #[tabled(rename = "CPI")]
    cpi: String,
    #[tabled(rename = "Real Wage")]
    real: String,
}

#[derive(Tabled)]
struct AnnualRow {
    #[tabled(rename = "Region")]
    region: String,
    #[tabled(rename = "Start CPI")]
    start: String,
    #[tabled(rename = "End CPI")]
    end: String,
    #[tabled(rename = "Annual Change")]
    change: String,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Statistic")]
    name: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn write_table<T: Tabled>(rows: Vec<T>, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "{}", Table::new(rows))
}

pub struct ReportRenderer;

impl ReportRenderer {
    pub fn render(report: &Report, format: OutputFormat, out: &mut dyn Write) -> io::Result<()> {
        match format {
            OutputFormat::Text => Self::render_text(report, out),
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, report)?;
                writeln!(out)
            }
        }
    }

    pub fn render_text(report: &Report, out: &mut dyn Write) -> io::Result<()> {
        for section in &report.sections {
            writeln!(out)?;
            Self::render_section(section, out)?;
        }
        Ok(())
    }

    fn render_section(section: &Section, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "{}", section.title)?;
        writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

        match &section.body {
            SectionBody::Records { rows } => {
                let rows = rows
                    .iter()
                    .map(|r| RecordRow {
                        item: r.item.clone(),
                        month: r.period.to_string(),
                        region: region_name(&r.region),
                        cpi: format_index(r.cpi),
                    })
                    .collect();
                write_table::<RecordRow>(rows, out)?;
            }
            SectionBody::AverageChanges { rows } => {
                let rows = rows
                    .iter()
                    .map(|r| AverageRow {
                        region: region_name(&r.region),
                        item: r.item.clone().unwrap_or_else(|| "(all items)".to_string()),
                        average: format_percent(r.average),
                    })
                    .collect();
                write_table::<AverageRow>(rows, out)?;
            }
            SectionBody::Leaders { rows } => Self::render_leaders(rows, out)?,
            SectionBody::EquivalentSalaries {
                reference,
                base_amount,
                rows,
            } => {
                writeln!(
                    out,
                    "Reference: {} at {}",
                    region_name(reference),
                    format_currency(Some(*base_amount))
                )?;
                let rows = rows
                    .iter()
                    .map(|r| SalaryRow {
                        region: region_name(&r.region),
                        cpi: format_index(r.cpi),
                        equivalent: format_currency(r.equivalent),
                    })
                    .collect();
                write_table::<SalaryRow>(rows, out)?;
            }
            SectionBody::RealWages { rows, leaders } => {
                let rows = rows
                    .iter()
                    .map(|r| WageRow {
                        region: region_name(&r.region),
                        nominal: format_currency(Some(r.nominal)),
                        cpi: format_index(r.cpi),
                        real: format_currency(r.real),
                    })
                    .collect();
                write_table::<WageRow>(rows, out)?;
                writeln!(out)?;
                Self::render_leaders(leaders, out)?;
            }
            SectionBody::AnnualChanges { rows } => {
                let rows = rows
                    .iter()
                    .map(|r| AnnualRow {
                        region: region_name(&r.region),
                        start: format_index(r.start_cpi),
                        end: format_index(r.end_cpi),
                        change: format_percent(r.change),
                    })
                    .collect();
                write_table::<AnnualRow>(rows, out)?;
            }
            SectionBody::Summary { label, stats } => {
                writeln!(out, "{label}")?;
                match stats {
                    Some(stats) => Self::render_stats(stats, out)?,
                    None => writeln!(out, "    no defined values")?,
                }
            }
        }
        Ok(())
    }

    fn render_leaders(leaders: &[Leader], out: &mut dyn Write) -> io::Result<()> {
        if leaders.is_empty() {
            return writeln!(out, "    no defined values");
        }
        for leader in leaders {
            writeln!(out, "{}:", leader.label)?;
            writeln!(out, "    Region: {}", region_name(&leader.region))?;
            writeln!(out, "    Value: {}", format_unit(leader.value, leader.unit))?;
            if !leader.ties.is_empty() {
                let tied: Vec<String> = leader.ties.iter().map(|t| region_name(t)).collect();
                writeln!(out, "    Tied with: {} (first in region order shown)", tied.join(", "))?;
            }
        }
        Ok(())
    }

    fn render_stats(stats: &DescriptiveStats, out: &mut dyn Write) -> io::Result<()> {
        let mut rows = vec![StatRow {
            name: "Regions",
            value: stats.count.to_string(),
        }];
        for (name, value) in [
            ("Mean", stats.mean),
            ("Median", stats.median),
            ("Std Dev", stats.std),
            ("Min", stats.min),
            ("Max", stats.max),
            ("P05", stats.p05),
            ("P95", stats.p95),
        ] {
            rows.push(StatRow {
                name,
                value: format!("{value:.2}"),
            });
        }
        write_table(rows, out)
    }
}
