//! Control loop health
//!
//! Tracks each stage of the decision pipeline plus the outcome of recent
//! ticks. The agent serves this on `/healthz` and `/readyz`.

use crate::models::{ExecutionResult, ScaleAction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Consecutive failed dispatches before the executor is reported unhealthy
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Ordered from best to worst so the overall status is the maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        *self != ComponentStatus::Unhealthy
    }
}

/// Pipeline stages reported on
pub mod components {
    pub const SAMPLER: &str = "sampler";
    pub const FORECASTER: &str = "forecaster";
    pub const ENGINE: &str = "engine";
    pub const EXECUTOR: &str = "executor";

    pub const ALL: [&str; 4] = [SAMPLER, FORECASTER, ENGINE, EXECUTOR];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component last reported
    pub updated_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            updated_at: Utc::now(),
        }
    }
}

/// The most recent dispatch that did not succeed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub at: DateTime<Utc>,
    pub action: ScaleAction,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_failure: Option<ExecutionFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    accepting: bool,
    last_tick_at: Option<DateTime<Utc>>,
    consecutive_failures: u32,
    last_failure: Option<ExecutionFailure>,
}

/// Shared health state, cheap to clone
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
    failure_threshold: u32,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::with_failure_threshold(DEFAULT_FAILURE_THRESHOLD)
    }

    pub fn with_failure_threshold(failure_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(HealthState::default())),
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Report every pipeline stage as healthy until told otherwise
    pub async fn register_all(&self) {
        let mut state = self.state.write().await;
        for name in components::ALL {
            state
                .components
                .insert(name.to_string(), ComponentHealth::new(ComponentStatus::Healthy, None));
        }
    }

    async fn set(&self, name: &str, status: ComponentStatus, message: Option<String>) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::new(status, message));
    }

    pub async fn set_healthy(&self, name: &str) {
        self.set(name, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.set(name, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// Whether the agent is accepting traffic; cleared on shutdown
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.accepting = ready;
    }

    /// Record a finished tick and the dispatch result it produced
    ///
    /// A failed dispatch degrades the executor; `failure_threshold` failures
    /// in a row make it unhealthy. Any success resets the streak.
    pub async fn record_tick(&self, at: DateTime<Utc>, result: &ExecutionResult) {
        let mut state = self.state.write().await;
        state.last_tick_at = Some(at);

        let executor = if result.success {
            state.consecutive_failures = 0;
            ComponentHealth::new(ComponentStatus::Healthy, None)
        } else {
            state.consecutive_failures += 1;
            state.last_failure = Some(ExecutionFailure {
                at,
                action: result.action.clone(),
                message: result.message.clone(),
            });

            let status = if state.consecutive_failures >= self.failure_threshold {
                warn!(
                    failures = state.consecutive_failures,
                    "Executor failed repeatedly, marking unhealthy"
                );
                ComponentStatus::Unhealthy
            } else {
                ComponentStatus::Degraded
            };
            ComponentHealth::new(status, Some(result.message.clone()))
        };
        state
            .components
            .insert(components::EXECUTOR.to_string(), executor);
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);

        HealthResponse {
            status,
            components: state.components.clone(),
            last_tick_at: state.last_tick_at,
            consecutive_failures: state.consecutive_failures,
            last_failure: state.last_failure.clone(),
        }
    }

    /// Ready once accepting and a tick has completed, while nothing is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;

        let reason = if !state.accepting {
            Some("Agent is not accepting traffic".to_string())
        } else if state.last_tick_at.is_none() {
            Some("No control loop tick has completed yet".to_string())
        } else {
            state
                .components
                .iter()
                .find(|(_, c)| c.status == ComponentStatus::Unhealthy)
                .map(|(name, c)| match &c.message {
                    Some(message) => format!("{name} unhealthy: {message}"),
                    None => format!("{name} unhealthy"),
                })
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason,
        }
    }
}
