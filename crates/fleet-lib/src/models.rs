//! Core data models for the fleet optimizer

use crate::catalog::TierId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Utilization of the fleet, each metric a percentage in [0, 100]
///
/// Produced by the forecaster or the metrics sampler. Missing fields
/// deserialize to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub network_usage: f64,
}

impl WorkloadSample {
    pub fn new(cpu_usage: f64, memory_usage: f64, network_usage: f64) -> Self {
        Self {
            cpu_usage,
            memory_usage,
            network_usage,
        }
    }

    /// Replace non-finite values with zero
    pub fn sanitized(&self) -> Self {
        fn finite_or_zero(v: f64) -> f64 {
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }

        Self {
            cpu_usage: finite_or_zero(self.cpu_usage),
            memory_usage: finite_or_zero(self.memory_usage),
            network_usage: finite_or_zero(self.network_usage),
        }
    }
}

/// Current shape of the fleet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Allocation {
    pub instance_count: u32,
    pub instance_type: TierId,
}

impl Allocation {
    pub fn new(instance_count: u32, instance_type: impl Into<TierId>) -> Self {
        Self {
            instance_count,
            instance_type: instance_type.into(),
        }
    }
}

/// Cost of running a configuration, in USD
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
}

impl CostEstimate {
    /// Derive daily (24h) and monthly (30d) figures from an hourly cost
    pub fn from_hourly(hourly: f64) -> Self {
        let daily = hourly * 24.0;
        Self {
            hourly,
            daily,
            monthly: daily * 30.0,
        }
    }
}

/// Scaling action carried by a recommendation
///
/// Names outside the known set deserialize into `Unknown` so a
/// recommendation received from elsewhere can still reach the dispatcher,
/// which rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleAction {
    Maintain,
    ScaleUp,
    ScaleDown,
    Optimize,
    #[serde(untagged)]
    Unknown(String),
}

impl ScaleAction {
    pub fn as_str(&self) -> &str {
        match self {
            ScaleAction::Maintain => "maintain",
            ScaleAction::ScaleUp => "scale_up",
            ScaleAction::ScaleDown => "scale_down",
            ScaleAction::Optimize => "optimize",
            ScaleAction::Unknown(name) => name,
        }
    }
}

impl fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single scaling decision produced once per control-loop tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub timestamp: DateTime<Utc>,
    pub action: ScaleAction,
    pub current_instances: u32,
    pub recommended_instances: u32,
    pub current_instance_type: TierId,
    pub recommended_instance_type: TierId,
    pub reason: String,
    pub predicted_cpu: f64,
    pub predicted_memory: f64,
    pub estimated_cost: CostEstimate,
    /// Capacity-fit score, only set by the budget search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_score: Option<f64>,
}

impl Recommendation {
    /// Allocation the fleet would have after applying this recommendation
    pub fn target(&self) -> Allocation {
        Allocation {
            instance_count: self.recommended_instances,
            instance_type: self.recommended_instance_type.clone(),
        }
    }

    pub fn changes_fleet(&self) -> bool {
        self.recommended_instances != self.current_instances
            || self.recommended_instance_type != self.current_instance_type
    }
}

/// Backend-specific detail attached to an execution result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_instances: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub terminated_instances: Vec<String>,
}

/// Outcome of dispatching a recommendation to the fleet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub message: String,
    pub action: ScaleAction,
    #[serde(flatten)]
    pub detail: ExecutionDetail,
}

impl ExecutionResult {
    pub fn succeeded(action: ScaleAction, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            action,
            detail: ExecutionDetail::default(),
        }
    }

    pub fn failed(action: ScaleAction, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            action,
            detail: ExecutionDetail::default(),
        }
    }

    pub fn with_detail(mut self, detail: ExecutionDetail) -> Self {
        self.detail = detail;
        self
    }
}

/// A billed cost entry supplied by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub resource_type: String,
}

/// A recommendation together with the result of executing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub recommendation: Recommendation,
    pub result: ExecutionResult,
    pub executed_at: DateTime<Utc>,
}
