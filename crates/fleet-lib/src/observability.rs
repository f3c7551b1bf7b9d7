//! Observability for the fleet optimizer
//!
//! Provides:
//! - Prometheus metrics (tick latency, decisions by action, fleet size, cost, score)
//! - Structured JSON logging with tracing

use crate::models::{ExecutionResult, Recommendation};
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_int_counter,
    register_int_gauge, CounterVec, Gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for control-loop tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<FleetMetricsInner> = OnceLock::new();

struct FleetMetricsInner {
    tick_latency_seconds: Histogram,
    recommendations: CounterVec,
    execution_failures: IntCounter,
    budget_infeasible: IntCounter,
    sampler_errors: IntCounter,
    fleet_instances: IntGauge,
    optimization_score: Gauge,
    projected_monthly_cost: Gauge,
}

impl FleetMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "fleet_optimizer_tick_latency_seconds",
                "Time spent running one control-loop tick",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            recommendations: register_counter_vec!(
                "fleet_optimizer_recommendations_total",
                "Recommendations generated, by action",
                &["action"]
            )
            .expect("Failed to register recommendations_total"),

            execution_failures: register_int_counter!(
                "fleet_optimizer_execution_failures_total",
                "Recommendations the fleet backend failed to apply"
            )
            .expect("Failed to register execution_failures_total"),

            budget_infeasible: register_int_counter!(
                "fleet_optimizer_budget_infeasible_total",
                "Ticks where no configuration fit the monthly budget"
            )
            .expect("Failed to register budget_infeasible_total"),

            sampler_errors: register_int_counter!(
                "fleet_optimizer_sampler_errors_total",
                "Failed utilization samples"
            )
            .expect("Failed to register sampler_errors_total"),

            fleet_instances: register_int_gauge!(
                "fleet_optimizer_fleet_instances",
                "Instances in the fleet after the last tick"
            )
            .expect("Failed to register fleet_instances"),

            optimization_score: register_gauge!(
                "fleet_optimizer_optimization_score",
                "Optimization score of the fleet after the last tick"
            )
            .expect("Failed to register optimization_score"),

            projected_monthly_cost: register_gauge!(
                "fleet_optimizer_projected_monthly_cost_usd",
                "Monthly cost of the fleet after the last tick"
            )
            .expect("Failed to register projected_monthly_cost_usd"),
        }
    }
}

/// Handle to the process-wide fleet metrics
///
/// Clones share the same underlying collectors.
#[derive(Clone)]
pub struct FleetMetrics {
    _private: (),
}

impl Default for FleetMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &FleetMetricsInner {
        GLOBAL_METRICS.get_or_init(FleetMetricsInner::new)
    }

    pub fn observe_tick_latency(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
    }

    pub fn inc_recommendation(&self, action: &str) {
        self.inner()
            .recommendations
            .with_label_values(&[action])
            .inc();
    }

    pub fn inc_execution_failures(&self) {
        self.inner().execution_failures.inc();
    }

    pub fn inc_budget_infeasible(&self) {
        self.inner().budget_infeasible.inc();
    }

    pub fn inc_sampler_errors(&self) {
        self.inner().sampler_errors.inc();
    }

    /// Record the fleet shape and its evaluation after a tick
    pub fn set_fleet_state(&self, instances: u32, score: f64, monthly_cost: f64) {
        self.inner().fleet_instances.set(i64::from(instances));
        self.inner().optimization_score.set(score);
        self.inner().projected_monthly_cost.set(monthly_cost);
    }
}

/// Structured logger for fleet events
///
/// Every record carries an `event` field and the fleet name.
#[derive(Clone)]
pub struct StructuredLogger {
    fleet_name: String,
}

impl StructuredLogger {
    pub fn new(fleet_name: impl Into<String>) -> Self {
        Self {
            fleet_name: fleet_name.into(),
        }
    }

    pub fn log_recommendation(&self, rec: &Recommendation) {
        info!(
            event = "recommendation_generated",
            fleet = %self.fleet_name,
            action = %rec.action,
            current_instances = rec.current_instances,
            recommended_instances = rec.recommended_instances,
            current_instance_type = %rec.current_instance_type,
            recommended_instance_type = %rec.recommended_instance_type,
            predicted_cpu = rec.predicted_cpu,
            predicted_memory = rec.predicted_memory,
            monthly_cost = rec.estimated_cost.monthly,
            reason = %rec.reason,
            "Generated scaling recommendation"
        );
    }

    pub fn log_execution(&self, rec: &Recommendation, result: &ExecutionResult) {
        if result.success {
            info!(
                event = "allocation_executed",
                fleet = %self.fleet_name,
                action = %result.action,
                target_instances = rec.recommended_instances,
                target_instance_type = %rec.recommended_instance_type,
                new_instances = result.detail.new_instances.len(),
                terminated_instances = result.detail.terminated_instances.len(),
                message = %result.message,
                "Allocation applied"
            );
        } else {
            warn!(
                event = "allocation_executed",
                fleet = %self.fleet_name,
                action = %result.action,
                target_instances = rec.recommended_instances,
                target_instance_type = %rec.recommended_instance_type,
                success = false,
                message = %result.message,
                "Allocation failed"
            );
        }
    }

    pub fn log_budget_infeasible(&self, budget_monthly: f64, unconstrained_monthly: f64) {
        warn!(
            event = "budget_infeasible",
            fleet = %self.fleet_name,
            budget_monthly = budget_monthly,
            unconstrained_monthly = unconstrained_monthly,
            "No configuration fits the monthly budget, keeping current allocation"
        );
    }

    pub fn log_startup(&self, version: &str, dry_run: bool) {
        info!(
            event = "agent_started",
            fleet = %self.fleet_name,
            agent_version = %version,
            dry_run = dry_run,
            "Fleet agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            fleet = %self.fleet_name,
            reason = %reason,
            "Fleet agent shutting down"
        );
    }
}
