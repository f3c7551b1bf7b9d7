//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use fleet_lib::savings::Priority;
use fleet_lib::trend::Trend;
use fleet_lib::ScaleAction;
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading with an underline
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64) -> String {
    format!("${:.2}", amount)
}

/// Format a percentage with one decimal
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Format a payback period, which may be infinite
pub fn format_months(months: f64) -> String {
    if months.is_finite() {
        format!("{:.1} months", months)
    } else {
        "never".to_string()
    }
}

pub fn color_action(action: &ScaleAction) -> String {
    let name = action.as_str();
    match action {
        ScaleAction::ScaleUp => name.red().to_string(),
        ScaleAction::ScaleDown => name.green().to_string(),
        ScaleAction::Optimize => name.blue().to_string(),
        ScaleAction::Maintain => name.to_string(),
        ScaleAction::Unknown(_) => name.yellow().to_string(),
    }
}

pub fn color_trend(trend: Trend) -> String {
    let name = trend.to_string();
    match trend {
        Trend::Increasing => name.red().to_string(),
        Trend::Decreasing => name.green().to_string(),
        Trend::Stable => name.to_string(),
        Trend::InsufficientData => name.yellow().to_string(),
    }
}

pub fn color_priority(priority: Priority) -> String {
    let name = priority.to_string();
    match priority {
        Priority::High => name.red().bold().to_string(),
        Priority::Medium => name.yellow().to_string(),
        Priority::Low => name.to_string(),
    }
}

/// Color an optimization score based on value
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.1}", score);
    if score >= 75.0 {
        formatted.green().to_string()
    } else if score >= 50.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
