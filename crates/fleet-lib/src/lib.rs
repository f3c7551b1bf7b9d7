//! Fleet sizing library
//!
//! This crate provides the core functionality for:
//! - Tier catalog and cost estimation
//! - Rule-based and budget-constrained scaling recommendations
//! - Execution dispatch over pluggable fleet backends
//! - Optimization scoring, cost trends, savings advice and ROI
//! - Utilization sampling, forecasting and the control loop
//! - Health checks and observability

pub mod budget;
pub mod catalog;
pub mod config;
pub mod control;
pub mod cost;
pub mod engine;
pub mod error;
pub mod executor;
pub mod forecast;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod roi;
pub mod sampler;
pub mod savings;
pub mod scoring;
pub mod trend;

pub use budget::BudgetSearch;
pub use catalog::{TierCatalog, TierId};
pub use config::EngineConfig;
pub use control::{ControlConfig, ControlLoop, TickOutcome};
pub use cost::CostEstimator;
pub use engine::{RecommendationEngine, Thresholds};
pub use error::FleetError;
pub use executor::{ExecutionDispatcher, FleetExecutor, InMemoryFleet};
pub use health::{
    ComponentHealth, ComponentStatus, ExecutionFailure, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use history::{DecisionLog, FleetStatus};
pub use models::*;
pub use observability::{FleetMetrics, StructuredLogger};
pub use scoring::{OptimizationScorer, ScoringWeights};
