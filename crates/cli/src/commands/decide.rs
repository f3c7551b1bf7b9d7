//! Decision commands: recommend, estimate, score and the tier catalog

use anyhow::Result;
use colored::Colorize;
use fleet_lib::{
    BudgetSearch, CostEstimator, OptimizationScorer, Recommendation, RecommendationEngine,
    TierCatalog,
};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_action, color_score, format_currency, format_percent, print_heading, print_json,
    print_table, print_warning, OutputFormat,
};
use crate::{FleetArgs, WorkloadArgs};

/// Row for the tier catalog table
#[derive(Tabled)]
struct TierRow {
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Capacity")]
    capacity: u32,
    #[tabled(rename = "Hourly")]
    hourly: String,
    #[tabled(rename = "Monthly")]
    monthly: String,
}

#[derive(Serialize)]
struct ScoreBreakdown {
    cost_score: f64,
    performance_score: f64,
    optimization_score: f64,
}

/// Recommend a scaling action, optionally within a monthly budget
pub fn recommend(
    fleet: &FleetArgs,
    workload: &WorkloadArgs,
    budget: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let current = fleet.allocation();
    let predicted = workload.sample();

    let recommendation = match budget {
        Some(budget) => BudgetSearch::default().optimize_for_budget(&predicted, &current, budget),
        None => Some(RecommendationEngine::default().recommend(&predicted, &current)),
    };

    match format {
        OutputFormat::Json => print_json(&recommendation)?,
        OutputFormat::Table => match &recommendation {
            Some(rec) => print_recommendation(rec),
            None => print_warning(&format!(
                "No configuration fits the monthly budget of {}",
                format_currency(budget.unwrap_or_default())
            )),
        },
    }

    Ok(())
}

fn print_recommendation(rec: &Recommendation) {
    print_heading("Recommendation");
    println!("Action:                 {}", color_action(&rec.action));
    println!(
        "Current:                {} x {}",
        rec.current_instances, rec.current_instance_type
    );
    println!(
        "Recommended:            {} x {}",
        rec.recommended_instances.to_string().bold(),
        rec.recommended_instance_type.to_string().bold()
    );
    println!("Predicted CPU:          {}", format_percent(rec.predicted_cpu));
    println!("Predicted Memory:       {}", format_percent(rec.predicted_memory));
    if let Some(score) = rec.performance_score {
        println!("Performance Score:      {}", color_score(score));
    }
    println!();

    println!("{}", "Estimated Cost".bold());
    println!("{}", "-".repeat(50));
    println!(
        "Hourly:                 {}",
        format_currency(rec.estimated_cost.hourly)
    );
    println!(
        "Daily:                  {}",
        format_currency(rec.estimated_cost.daily)
    );
    println!(
        "Monthly:                {}",
        format_currency(rec.estimated_cost.monthly).green()
    );
    println!();
    println!("{}", rec.reason.dimmed());
}

/// Estimate the running cost of a fleet
pub fn estimate(fleet: &FleetArgs, format: OutputFormat) -> Result<()> {
    let allocation = fleet.allocation();
    let cost = CostEstimator::default().estimate(allocation.instance_count, &allocation.instance_type);

    match format {
        OutputFormat::Json => print_json(&cost)?,
        OutputFormat::Table => {
            print_heading(&format!(
                "Cost of {} x {}",
                allocation.instance_count, allocation.instance_type
            ));
            println!("Hourly:                 {}", format_currency(cost.hourly));
            println!("Daily:                  {}", format_currency(cost.daily));
            println!(
                "Monthly:                {}",
                format_currency(cost.monthly).green()
            );
        }
    }

    Ok(())
}

/// Score a fleet against observed utilization
pub fn score(fleet: &FleetArgs, workload: &WorkloadArgs, format: OutputFormat) -> Result<()> {
    let scorer = OptimizationScorer::default();
    let allocation = fleet.allocation();
    let metrics = workload.sample();

    let breakdown = ScoreBreakdown {
        cost_score: scorer.cost_score(&allocation),
        performance_score: scorer.performance_score(&metrics),
        optimization_score: scorer.score(&allocation, &metrics),
    };

    match format {
        OutputFormat::Json => print_json(&breakdown)?,
        OutputFormat::Table => {
            print_heading("Optimization Score");
            println!("Cost Score:             {:.1}", breakdown.cost_score);
            println!("Performance Score:      {:.1}", breakdown.performance_score);
            println!(
                "{}         {}",
                "Overall:".bold(),
                color_score(breakdown.optimization_score)
            );
        }
    }

    Ok(())
}

/// List the built-in tier catalog
pub fn tiers(format: OutputFormat) -> Result<()> {
    let catalog = TierCatalog::builtin();
    let estimator = CostEstimator::new(catalog.clone());

    let rows: Vec<TierRow> = catalog
        .tiers()
        .iter()
        .map(|t| TierRow {
            tier: t.id.to_string(),
            family: t.family.clone(),
            capacity: t.capacity,
            hourly: format_currency(t.hourly_price),
            monthly: format_currency(estimator.estimate(1, &t.id).monthly),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(catalog.tiers())?,
        OutputFormat::Table => print_table(&rows),
    }

    Ok(())
}
