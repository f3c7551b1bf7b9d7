//! Scale-direction decision engine
//!
//! Turns a predicted workload and the current allocation into a single
//! recommendation. Rules are evaluated in a fixed order and the first
//! match wins:
//!
//! 1. CPU or memory above its high threshold: add one instance, and step
//!    the tier up as well when either metric exceeds the vertical trigger.
//! 2. CPU and memory both below their low thresholds: remove one instance,
//!    or, at a single instance, step the tier down when possible.
//! 3. Otherwise maintain the current allocation.

use crate::catalog::TierCatalog;
use crate::cost::CostEstimator;
use crate::models::{Allocation, Recommendation, ScaleAction, WorkloadSample};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Utilization above which a single step of vertical scaling is added
pub const VERTICAL_SCALE_TRIGGER: f64 = 90.0;

/// Utilization thresholds, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_high: f64,
    pub cpu_low: f64,
    pub memory_high: f64,
    pub memory_low: f64,
    pub vertical_trigger: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_high: 80.0,
            cpu_low: 30.0,
            memory_high: 85.0,
            memory_low: 35.0,
            vertical_trigger: VERTICAL_SCALE_TRIGGER,
        }
    }
}

/// Rule-based recommendation engine
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    thresholds: Thresholds,
    catalog: Arc<TierCatalog>,
    estimator: CostEstimator,
}

impl RecommendationEngine {
    pub fn new(thresholds: Thresholds, catalog: Arc<TierCatalog>) -> Self {
        Self {
            thresholds,
            estimator: CostEstimator::new(catalog.clone()),
            catalog,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn catalog(&self) -> &Arc<TierCatalog> {
        &self.catalog
    }

    pub fn estimator(&self) -> &CostEstimator {
        &self.estimator
    }

    /// Decide the action and target configuration for one tick
    pub fn recommend(&self, predicted: &WorkloadSample, current: &Allocation) -> Recommendation {
        let predicted = predicted.sanitized();
        let cpu = predicted.cpu_usage;
        let memory = predicted.memory_usage;
        let t = &self.thresholds;

        let mut action = ScaleAction::Maintain;
        let mut instances = current.instance_count;
        let mut tier = current.instance_type.clone();
        let mut reason = format!("Resources within normal range: CPU={cpu}%, Memory={memory}%");

        if cpu > t.cpu_high || memory > t.memory_high {
            action = ScaleAction::ScaleUp;
            instances = current.instance_count.saturating_add(1);
            reason = format!("High resource usage predicted: CPU={cpu}%, Memory={memory}%");

            if cpu > t.vertical_trigger || memory > t.vertical_trigger {
                tier = self.catalog.step_up(&current.instance_type);
                reason.push_str(" - Vertical scaling recommended");
            }
        } else if cpu < t.cpu_low && memory < t.memory_low {
            if current.instance_count > 1 {
                action = ScaleAction::ScaleDown;
                instances = current.instance_count - 1;
                reason = format!("Low resource usage predicted: CPU={cpu}%, Memory={memory}%");
            } else {
                let smaller = self.catalog.step_down(&current.instance_type);
                if smaller != current.instance_type {
                    action = ScaleAction::ScaleDown;
                    tier = smaller;
                    reason = format!(
                        "Vertical scaling down recommended: CPU={cpu}%, Memory={memory}%"
                    );
                } else {
                    reason = format!(
                        "Low resource usage predicted but fleet is already at its smallest size: CPU={cpu}%, Memory={memory}%"
                    );
                }
            }
        }

        let estimated_cost = self.estimator.estimate(instances, &tier);

        debug!(
            action = %action,
            cpu = cpu,
            memory = memory,
            current_instances = current.instance_count,
            recommended_instances = instances,
            recommended_tier = %tier,
            monthly_cost = estimated_cost.monthly,
            "Recommendation computed"
        );

        Recommendation {
            timestamp: chrono::Utc::now(),
            action,
            current_instances: current.instance_count,
            recommended_instances: instances,
            current_instance_type: current.instance_type.clone(),
            recommended_instance_type: tier,
            reason,
            predicted_cpu: cpu,
            predicted_memory: memory,
            estimated_cost,
            performance_score: None,
        }
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(Thresholds::default(), TierCatalog::builtin())
    }
}
