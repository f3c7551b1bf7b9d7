//! Fleet Agent - fleet sizing control loop
//!
//! Samples host utilization, forecasts the workload, and applies one
//! scaling decision per tick to the fleet it manages.

use anyhow::Result;
use fleet_lib::{
    forecast::TrendForecaster,
    health::HealthRegistry,
    history::{DecisionLog, DEFAULT_CAPACITY},
    observability::{FleetMetrics, StructuredLogger},
    sampler::ProcSampler,
    ControlLoop, InMemoryFleet, TierCatalog,
};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fleet-agent");

    let config = config::AgentConfig::load()?;
    info!(
        fleet = %config.fleet_name,
        tier = %config.initial_tier,
        instances = config.initial_instances,
        budget_monthly = ?config.engine.budget_monthly,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = FleetMetrics::new();
    let logger = StructuredLogger::new(&config.fleet_name);
    logger.log_startup(AGENT_VERSION, config.dry_run);

    let fleet = Arc::new(InMemoryFleet::new(
        config.fleet_name.clone(),
        config.initial_instances,
        config.initial_tier.clone(),
    ));

    let control_config = config.control();
    let (control, mut outcomes) = ControlLoop::new(
        Arc::new(ProcSampler::new()),
        Arc::new(TrendForecaster::default()),
        fleet,
        &config.engine,
        TierCatalog::builtin(),
        control_config.clone(),
    );
    let control = control
        .with_logger(logger.clone())
        .with_health(health_registry.clone())
        .with_dry_run(config.dry_run);

    let decisions = Arc::new(RwLock::new(DecisionLog::new(
        DEFAULT_CAPACITY,
        control_config.tick_interval,
    )));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let control_handle = tokio::spawn(control.run(shutdown_tx.subscribe()));

    // Persist tick outcomes as they arrive
    let log = decisions.clone();
    let recorder_handle = tokio::spawn(async move {
        while let Some(outcome) = outcomes.recv().await {
            log.write().await.record(outcome);
        }
    });

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics,
        decisions,
    ));
    health_registry.set_ready(true).await;

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    health_registry.set_ready(false).await;

    let _ = shutdown_tx.send(());
    if let Err(e) = control_handle.await {
        warn!(error = %e, "Control loop task failed");
    }
    // the recorder drains once the loop drops its sender
    if let Err(e) = recorder_handle.await {
        warn!(error = %e, "Decision recorder task failed");
    }
    api_handle.abort();

    info!("Shutting down");
    Ok(())
}
