//! Cost trend analysis and period reports

use crate::models::{AllocationRecord, CostRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Number of most recent daily buckets compared against the rest
pub const TREND_WINDOW_DAYS: usize = 7;

/// Recent-to-older ratio at or above which costs are increasing
pub const INCREASING_RATIO: f64 = 1.10;

/// Recent-to-older ratio at or below which costs are decreasing
pub const DECREASING_RATIO: f64 = 0.90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: Trend,
    pub avg_daily_cost: f64,
    pub total_cost: f64,
    pub projected_monthly_cost: f64,
    pub days_analyzed: usize,
}

/// Sum costs per UTC calendar date, oldest first
pub fn daily_totals(records: &[CostRecord]) -> Vec<(NaiveDate, f64)> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        *totals.entry(record.timestamp.date_naive()).or_insert(0.0) += record.cost;
    }
    totals.into_iter().collect()
}

/// Classify the cost trend of a record sequence
///
/// Needs at least seven daily buckets; the mean of the last seven days is
/// compared with the mean of all earlier days. With exactly seven buckets
/// there is nothing earlier to compare against and the trend is stable.
pub fn analyze_trend(records: &[CostRecord]) -> TrendAnalysis {
    if records.is_empty() {
        return TrendAnalysis {
            trend: Trend::Stable,
            avg_daily_cost: 0.0,
            total_cost: 0.0,
            projected_monthly_cost: 0.0,
            days_analyzed: 0,
        };
    }

    let costs: Vec<f64> = daily_totals(records).into_iter().map(|(_, c)| c).collect();
    let total_cost: f64 = costs.iter().sum();
    let avg_daily_cost = total_cost / costs.len() as f64;

    let trend = if costs.len() < TREND_WINDOW_DAYS {
        Trend::InsufficientData
    } else {
        let (older, recent) = costs.split_at(costs.len() - TREND_WINDOW_DAYS);
        let recent_avg = mean(recent);
        let older_avg = if older.is_empty() {
            recent_avg
        } else {
            mean(older)
        };
        classify(recent_avg, older_avg)
    };

    TrendAnalysis {
        trend,
        avg_daily_cost,
        total_cost,
        projected_monthly_cost: avg_daily_cost * 30.0,
        days_analyzed: costs.len(),
    }
}

fn classify(recent_avg: f64, older_avg: f64) -> Trend {
    if older_avg > 0.0 {
        let ratio = recent_avg / older_avg;
        if ratio >= INCREASING_RATIO {
            Trend::Increasing
        } else if ratio <= DECREASING_RATIO {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    } else if recent_avg > older_avg {
        Trend::Increasing
    } else if recent_avg < older_avg {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportCosts {
    pub total: f64,
    pub average_daily: f64,
    pub projected_monthly: f64,
    pub by_resource_type: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAllocations {
    pub total_changes: usize,
    pub average_per_day: f64,
}

/// Cost and allocation summary over a closed time range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub period: ReportPeriod,
    pub costs: ReportCosts,
    pub allocations: ReportAllocations,
    pub generated_at: DateTime<Utc>,
}

/// Summarize costs and allocation changes between `start` and `end` inclusive
pub fn cost_report(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cost_records: &[CostRecord],
    allocations: &[AllocationRecord],
) -> CostReport {
    let in_range = |ts: &DateTime<Utc>| start <= *ts && *ts <= end;

    let mut by_resource_type: HashMap<String, f64> = HashMap::new();
    let mut total = 0.0;
    for record in cost_records.iter().filter(|r| in_range(&r.timestamp)) {
        total += record.cost;
        let key = if record.resource_type.is_empty() {
            "unknown"
        } else {
            record.resource_type.as_str()
        };
        *by_resource_type.entry(key.to_string()).or_insert(0.0) += record.cost;
    }

    let days = (end.date_naive() - start.date_naive()).num_days() + 1;
    let per_day = |value: f64| if days > 0 { value / days as f64 } else { 0.0 };

    let total_changes = allocations
        .iter()
        .filter(|a| in_range(&a.executed_at))
        .count();
    let average_daily = per_day(total);

    CostReport {
        period: ReportPeriod {
            start_date: start,
            end_date: end,
            days,
        },
        costs: ReportCosts {
            total,
            average_daily,
            projected_monthly: average_daily * 30.0,
            by_resource_type: by_resource_type.into_iter().collect(),
        },
        allocations: ReportAllocations {
            total_changes,
            average_per_day: per_day(total_changes as f64),
        },
        generated_at: Utc::now(),
    }
}
