//! Fleet Optimizer CLI
//!
//! Runs the decision engine and the cost reports offline, from flags and
//! JSON record files.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{costs, decide};
use std::path::PathBuf;

/// Fleet Optimizer CLI
#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about = "CLI for the Fleet Optimizer decision engine", long_about = None)]
pub struct Cli {
    /// Output format (falls back to the config file, then table)
    #[arg(long, short, env = "FLEETCTL_FORMAT")]
    pub format: Option<output::OutputFormat>,

    /// Path to the config file (defaults to ~/.config/fleetctl/config.json)
    #[arg(long, env = "FLEETCTL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Current fleet shape
#[derive(Args, Debug, Clone)]
pub struct FleetArgs {
    /// Number of running instances
    #[arg(long, default_value_t = 1)]
    pub instances: u32,

    /// Instance tier, e.g. t2.micro
    #[arg(long, default_value = "t2.micro")]
    pub tier: String,
}

/// Utilization percentages
#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub cpu: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub memory: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub network: f64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Recommend a scaling action for a predicted workload
    Recommend {
        #[command(flatten)]
        fleet: FleetArgs,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Monthly budget in USD; searches for a configuration within it
        #[arg(long)]
        budget: Option<f64>,
    },

    /// Estimate the cost of a fleet
    Estimate {
        #[command(flatten)]
        fleet: FleetArgs,
    },

    /// Score a fleet against observed utilization
    Score {
        #[command(flatten)]
        fleet: FleetArgs,

        #[command(flatten)]
        workload: WorkloadArgs,
    },

    /// List the tier catalog
    Tiers,

    /// Analyze the cost trend of recorded costs
    Trend {
        /// JSON file with an array of cost records
        #[arg(long)]
        costs: PathBuf,
    },

    /// Summarize costs and allocation changes over a period
    Report {
        /// JSON file with an array of cost records
        #[arg(long)]
        costs: PathBuf,

        /// JSON file with an array of allocation records
        #[arg(long)]
        allocations: Option<PathBuf>,

        /// Start date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        start: String,

        /// End date (YYYY-MM-DD or RFC 3339), inclusive
        #[arg(long)]
        end: String,
    },

    /// Suggest cost savings
    Savings {
        #[command(flatten)]
        fleet: FleetArgs,

        #[command(flatten)]
        workload: WorkloadArgs,

        /// Predicted CPU percentage (defaults to the observed value)
        #[arg(long)]
        predicted_cpu: Option<f64>,

        /// Predicted memory percentage (defaults to the observed value)
        #[arg(long)]
        predicted_memory: Option<f64>,
    },

    /// Compute the return on investment of an optimization
    Roi {
        /// Monthly cost before the optimization
        #[arg(long)]
        baseline: f64,

        /// Monthly cost after the optimization
        #[arg(long)]
        optimized: f64,

        /// One-off cost of implementing the optimization
        #[arg(long, default_value_t = 0.0)]
        implementation_cost: f64,
    },

    /// Show or change CLI defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Set default values
    Set {
        /// Default monthly budget
        #[arg(long)]
        budget: Option<f64>,

        /// Default output format
        #[arg(long)]
        default_format: Option<output::OutputFormat>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::Config::default_path()?,
    };
    let cfg = config::Config::load(&config_path)?;
    let format = cli.format.or(cfg.default_format).unwrap_or_default();

    match cli.command {
        Commands::Recommend {
            fleet,
            workload,
            budget,
        } => {
            decide::recommend(&fleet, &workload, budget.or(cfg.default_budget), format)?;
        }
        Commands::Estimate { fleet } => {
            decide::estimate(&fleet, format)?;
        }
        Commands::Score { fleet, workload } => {
            decide::score(&fleet, &workload, format)?;
        }
        Commands::Tiers => {
            decide::tiers(format)?;
        }
        Commands::Trend { costs: path } => {
            costs::trend(&path, format)?;
        }
        Commands::Report {
            costs: cost_path,
            allocations,
            start,
            end,
        } => {
            costs::report(&cost_path, allocations.as_deref(), &start, &end, format)?;
        }
        Commands::Savings {
            fleet,
            workload,
            predicted_cpu,
            predicted_memory,
        } => {
            costs::savings(&fleet, &workload, predicted_cpu, predicted_memory, format)?;
        }
        Commands::Roi {
            baseline,
            optimized,
            implementation_cost,
        } => {
            costs::roi(baseline, optimized, implementation_cost, format)?;
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => {
                output::print_info(&format!("Config file: {}", config_path.display()));
                output::print_json(&cfg)?;
            }
            ConfigCommands::Set {
                budget,
                default_format,
            } => {
                let mut updated = cfg;
                if let Some(budget) = budget {
                    updated.default_budget = Some(budget);
                }
                if let Some(f) = default_format {
                    updated.default_format = Some(f);
                }
                updated.save(&config_path)?;
                output::print_success(&format!("Saved {}", config_path.display()));
            }
        },
    }

    Ok(())
}
