//! Control loop
//!
//! Owns the only path to the fleet executor. A single task samples the
//! host, forecasts, decides and dispatches once per tick, then hands the
//! outcome to the decision log over a channel. Ticks never overlap: a tick
//! that comes due while another is still running is skipped.

use crate::budget::BudgetSearch;
use crate::catalog::TierCatalog;
use crate::config::EngineConfig;
use crate::executor::{ExecutionDispatcher, FleetExecutor};
use crate::forecast::{select_workload, Forecaster};
use crate::health::{components, HealthRegistry};
use crate::models::{
    Allocation, AllocationRecord, ExecutionResult, Recommendation, ScaleAction, WorkloadSample,
};
use crate::observability::{FleetMetrics, StructuredLogger};
use crate::sampler::MetricsSampler;
use crate::scoring::OptimizationScorer;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default decision interval (10 minutes)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(600);

/// Default sampling interval (1 minute)
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct ControlConfig {
    pub tick_interval: Duration,
    pub sample_interval: Duration,
    /// Maximum samples kept for forecasting
    pub history_size: usize,
    /// Channel buffer size for tick outcomes
    pub buffer_size: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            history_size: 1440, // 24 hours of minute samples
            buffer_size: 64,
        }
    }
}

/// Everything one tick decided and did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub recommendation: Recommendation,
    pub result: ExecutionResult,
    /// Fleet shape reported by the executor after dispatch
    pub allocation: Allocation,
    pub hourly_cost: f64,
    pub score: f64,
    /// Workload the decision was based on
    pub workload: WorkloadSample,
    pub executed_at: DateTime<Utc>,
}

impl TickOutcome {
    pub fn allocation_record(&self) -> AllocationRecord {
        AllocationRecord {
            recommendation: self.recommendation.clone(),
            result: self.result.clone(),
            executed_at: self.executed_at,
        }
    }
}

pub struct ControlLoop {
    sampler: Arc<dyn MetricsSampler>,
    forecaster: Arc<dyn Forecaster>,
    search: BudgetSearch,
    budget_monthly: Option<f64>,
    dispatcher: ExecutionDispatcher,
    scorer: OptimizationScorer,
    config: ControlConfig,
    history: Vec<WorkloadSample>,
    outcome_tx: mpsc::Sender<TickOutcome>,
    metrics: FleetMetrics,
    logger: StructuredLogger,
    health: HealthRegistry,
    dry_run: bool,
}

impl ControlLoop {
    pub fn new(
        sampler: Arc<dyn MetricsSampler>,
        forecaster: Arc<dyn Forecaster>,
        executor: Arc<dyn FleetExecutor>,
        engine_config: &EngineConfig,
        catalog: Arc<TierCatalog>,
        config: ControlConfig,
    ) -> (Self, mpsc::Receiver<TickOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(config.buffer_size.max(1));

        let control = Self {
            sampler,
            forecaster,
            search: engine_config.budget_search(catalog.clone()),
            budget_monthly: engine_config.budget_monthly,
            dispatcher: ExecutionDispatcher::new(executor, catalog.clone()),
            scorer: engine_config.scorer(catalog),
            config,
            history: Vec::new(),
            outcome_tx,
            metrics: FleetMetrics::new(),
            logger: StructuredLogger::new("fleet"),
            health: HealthRegistry::new(),
            dry_run: false,
        };

        (control, outcome_rx)
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    /// Decide and log every tick without touching the fleet
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn history(&self) -> &[WorkloadSample] {
        &self.history
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            tick_interval_secs = self.config.tick_interval.as_secs(),
            sample_interval_secs = self.config.sample_interval.as_secs(),
            budget_monthly = ?self.budget_monthly,
            forecaster = self.forecaster.name(),
            "Starting control loop"
        );

        let mut sample_ticker = interval(self.config.sample_interval);
        sample_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut decision_ticker = interval(self.config.tick_interval);
        decision_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = decision_ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "Control loop tick failed");
                    }
                }
                _ = sample_ticker.tick() => {
                    self.sample_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down control loop");
                    break;
                }
            }
        }
    }

    /// Take one live sample and append it to the forecasting history
    pub async fn sample_once(&mut self) -> Option<WorkloadSample> {
        match self.sampler.sample().await {
            Ok(sample) => {
                self.history.push(sample);
                if self.history.len() > self.config.history_size {
                    let excess = self.history.len() - self.config.history_size;
                    self.history.drain(0..excess);
                }
                self.health.set_healthy(components::SAMPLER).await;
                Some(sample)
            }
            Err(e) => {
                warn!(error = %e, "Failed to sample utilization");
                self.metrics.inc_sampler_errors();
                self.health
                    .set_degraded(components::SAMPLER, format!("{e:#}"))
                    .await;
                None
            }
        }
    }

    /// Run one full decision cycle
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let start = Instant::now();

        let latest = self.sample_once().await;
        let forecast = self.forecaster.forecast(&self.history);
        if forecast.is_some() {
            self.health.set_healthy(components::FORECASTER).await;
        } else {
            debug!(
                samples = self.history.len(),
                forecaster = self.forecaster.name(),
                "No forecast available, falling back to live sample"
            );
        }
        let workload = select_workload(forecast, latest);

        let executor = self.dispatcher.executor().clone();
        let current = match executor.current_allocation().await {
            Ok(a) => a,
            Err(e) => {
                self.health
                    .set_unhealthy(components::EXECUTOR, format!("{e:#}"))
                    .await;
                return Err(e).context("Failed to read current allocation");
            }
        };

        let recommendation = self.decide(&workload, &current);
        self.health.set_healthy(components::ENGINE).await;
        self.metrics.inc_recommendation(recommendation.action.as_str());
        self.logger.log_recommendation(&recommendation);

        let result = if self.dry_run {
            ExecutionResult::succeeded(recommendation.action.clone(), "Dry run: no changes applied")
        } else {
            self.dispatcher.execute(&recommendation).await
        };
        self.logger.log_execution(&recommendation, &result);
        if !result.success {
            self.metrics.inc_execution_failures();
        }
        let executed_at = Utc::now();
        self.health.record_tick(executed_at, &result).await;

        let allocation = executor.current_allocation().await.unwrap_or(current);
        let cost = self
            .search
            .engine()
            .estimator()
            .estimate(allocation.instance_count, &allocation.instance_type);
        let score = self
            .scorer
            .score(&allocation, &latest.unwrap_or(workload));
        self.metrics
            .set_fleet_state(allocation.instance_count, score, cost.monthly);

        let outcome = TickOutcome {
            recommendation,
            result,
            allocation,
            hourly_cost: cost.hourly,
            score,
            workload,
            executed_at,
        };

        if self.outcome_tx.send(outcome.clone()).await.is_err() {
            warn!("Decision log receiver dropped, outcome not recorded");
        }

        self.metrics
            .observe_tick_latency(start.elapsed().as_secs_f64());
        Ok(outcome)
    }

    fn decide(&self, workload: &WorkloadSample, current: &Allocation) -> Recommendation {
        let Some(budget) = self.budget_monthly else {
            return self.search.engine().recommend(workload, current);
        };

        match self.search.optimize_for_budget(workload, current, budget) {
            Some(rec) => rec,
            None => {
                let unconstrained = self.search.engine().recommend(workload, current);
                self.metrics.inc_budget_infeasible();
                self.logger
                    .log_budget_infeasible(budget, unconstrained.estimated_cost.monthly);
                self.hold(workload, current, budget)
            }
        }
    }

    /// Maintain recommendation used when nothing fits the budget
    fn hold(&self, workload: &WorkloadSample, current: &Allocation, budget: f64) -> Recommendation {
        let workload = workload.sanitized();
        Recommendation {
            timestamp: Utc::now(),
            action: ScaleAction::Maintain,
            current_instances: current.instance_count,
            recommended_instances: current.instance_count,
            current_instance_type: current.instance_type.clone(),
            recommended_instance_type: current.instance_type.clone(),
            reason: format!(
                "No configuration fits the monthly budget of ${budget:.2}, keeping current allocation"
            ),
            predicted_cpu: workload.cpu_usage,
            predicted_memory: workload.memory_usage,
            estimated_cost: self
                .search
                .engine()
                .estimator()
                .estimate(current.instance_count, &current.instance_type),
            performance_score: None,
        }
    }
}
