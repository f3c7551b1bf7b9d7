//! Cost-related CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use fleet_lib::roi::calculate_roi;
use fleet_lib::savings::SavingsAdvisor;
use fleet_lib::trend::{analyze_trend, cost_report};
use fleet_lib::{AllocationRecord, CostRecord, WorkloadSample};
use std::path::Path;
use tabled::Tabled;

use super::load_json;
use crate::output::{
    color_priority, color_trend, format_currency, format_months, format_percent, print_heading,
    print_json, print_table, OutputFormat,
};
use crate::{FleetArgs, WorkloadArgs};

/// Row for cost by resource type table
#[derive(Tabled)]
struct ResourceCostRow {
    #[tabled(rename = "Resource Type")]
    resource_type: String,
    #[tabled(rename = "Cost")]
    cost: String,
}

/// Row for savings suggestions table
#[derive(Tabled)]
struct SavingsRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Savings")]
    savings: String,
    #[tabled(rename = "Action")]
    action: String,
}

/// Analyze the cost trend of a record file
pub fn trend(path: &Path, format: OutputFormat) -> Result<()> {
    let records: Vec<CostRecord> = load_json(path)?;
    let analysis = analyze_trend(&records);

    match format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => {
            print_heading("Cost Trend");
            println!("Trend:                  {}", color_trend(analysis.trend));
            println!("Days Analyzed:          {}", analysis.days_analyzed);
            println!(
                "Total Cost:             {}",
                format_currency(analysis.total_cost)
            );
            println!(
                "Average Daily:          {}",
                format_currency(analysis.avg_daily_cost)
            );
            println!(
                "Projected Monthly:      {}",
                format_currency(analysis.projected_monthly_cost).bold()
            );
        }
    }

    Ok(())
}

/// Summarize a period of cost and allocation records
pub fn report(
    costs_path: &Path,
    allocations_path: Option<&Path>,
    start: &str,
    end: &str,
    format: OutputFormat,
) -> Result<()> {
    let start = parse_bound(start, false)?;
    let end = parse_bound(end, true)?;

    let costs: Vec<CostRecord> = load_json(costs_path)?;
    let allocations: Vec<AllocationRecord> = match allocations_path {
        Some(path) => load_json(path)?,
        None => Vec::new(),
    };

    let report = cost_report(start, end, &costs, &allocations);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_heading("Cost Report");
            println!(
                "Period:                 {} to {} ({} days)",
                report.period.start_date.format("%Y-%m-%d"),
                report.period.end_date.format("%Y-%m-%d"),
                report.period.days
            );
            println!();

            println!("{}", "Costs".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Total:                  {}",
                format_currency(report.costs.total)
            );
            println!(
                "Average Daily:          {}",
                format_currency(report.costs.average_daily)
            );
            println!(
                "Projected Monthly:      {}",
                format_currency(report.costs.projected_monthly).bold()
            );
            println!();

            if !report.costs.by_resource_type.is_empty() {
                let rows: Vec<ResourceCostRow> = report
                    .costs
                    .by_resource_type
                    .iter()
                    .map(|(resource_type, cost)| ResourceCostRow {
                        resource_type: resource_type.clone(),
                        cost: format_currency(*cost),
                    })
                    .collect();
                print_table(&rows);
                println!();
            }

            println!("{}", "Allocation Changes".bold());
            println!("{}", "-".repeat(50));
            println!("Total:                  {}", report.allocations.total_changes);
            println!(
                "Average per Day:        {:.2}",
                report.allocations.average_per_day
            );
        }
    }

    Ok(())
}

/// Suggest cost savings for a fleet
pub fn savings(
    fleet: &FleetArgs,
    workload: &WorkloadArgs,
    predicted_cpu: Option<f64>,
    predicted_memory: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let metrics = workload.sample();
    let predicted = WorkloadSample::new(
        predicted_cpu.unwrap_or(metrics.cpu_usage),
        predicted_memory.unwrap_or(metrics.memory_usage),
        metrics.network_usage,
    );

    let suggestions = SavingsAdvisor::default().recommend(&fleet.allocation(), &metrics, &predicted);

    match format {
        OutputFormat::Json => print_json(&suggestions)?,
        OutputFormat::Table => {
            let rows: Vec<SavingsRow> = suggestions
                .iter()
                .map(|s| SavingsRow {
                    kind: s.kind.to_string(),
                    priority: color_priority(s.priority),
                    savings: s.potential_savings.to_string(),
                    action: s.action.clone(),
                })
                .collect();
            print_heading("Savings Opportunities");
            print_table(&rows);
        }
    }

    Ok(())
}

/// Return on investment of moving from `baseline` to `optimized` monthly cost
pub fn roi(
    baseline: f64,
    optimized: f64,
    implementation_cost: f64,
    format: OutputFormat,
) -> Result<()> {
    let analysis = calculate_roi(baseline, optimized, implementation_cost);

    match format {
        OutputFormat::Json => print_json(&analysis)?,
        OutputFormat::Table => {
            print_heading("Return on Investment");
            println!(
                "Monthly Savings:        {}",
                format_currency(analysis.monthly_savings).green()
            );
            println!(
                "Annual Savings:         {}",
                format_currency(analysis.annual_savings).green()
            );
            println!(
                "Savings:                {}",
                format_percent(analysis.savings_percent)
            );
            println!(
                "Payback:                {}",
                format_months(analysis.payback_months)
            );
            println!(
                "{}                    {}",
                "ROI:".bold(),
                format_percent(analysis.roi_percent).bold()
            );
        }
    }

    Ok(())
}

/// Parse a report bound; a bare end date covers the whole day
fn parse_bound(value: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or RFC 3339", value))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .with_context(|| format!("Invalid date '{}'", value))
}
