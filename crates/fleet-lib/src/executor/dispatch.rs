//! Maps a finalized recommendation onto a fleet operation

use super::FleetExecutor;
use crate::catalog::TierCatalog;
use crate::models::{ExecutionResult, Recommendation, ScaleAction};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// The fleet operation a recommendation resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Noop,
    ScaleUp,
    ScaleDown,
}

/// Routes recommendations to a [`FleetExecutor`]
///
/// Holds no retry logic; backend results are returned unchanged. Callers
/// must not run two dispatches against the same fleet concurrently.
#[derive(Clone)]
pub struct ExecutionDispatcher {
    executor: Arc<dyn FleetExecutor>,
    catalog: Arc<TierCatalog>,
}

impl ExecutionDispatcher {
    pub fn new(executor: Arc<dyn FleetExecutor>, catalog: Arc<TierCatalog>) -> Self {
        Self { executor, catalog }
    }

    pub fn executor(&self) -> &Arc<dyn FleetExecutor> {
        &self.executor
    }

    pub async fn execute(&self, recommendation: &Recommendation) -> ExecutionResult {
        let operation = match &recommendation.action {
            ScaleAction::Maintain => Operation::Noop,
            ScaleAction::ScaleUp => Operation::ScaleUp,
            ScaleAction::ScaleDown => Operation::ScaleDown,
            ScaleAction::Optimize => self.resolve_optimize(recommendation),
            ScaleAction::Unknown(name) => {
                warn!(action = %name, "Refusing to dispatch unknown action");
                return ExecutionResult::failed(
                    recommendation.action.clone(),
                    format!("Unknown action: {name}"),
                );
            }
        };

        let target = recommendation.recommended_instances;
        let tier = &recommendation.recommended_instance_type;
        debug!(action = %recommendation.action, ?operation, target = target, tier = %tier, "Dispatching");

        let result = match operation {
            Operation::Noop => {
                ExecutionResult::succeeded(recommendation.action.clone(), "No changes needed")
            }
            Operation::ScaleUp => self.executor.scale_up(target, tier).await,
            Operation::ScaleDown => self.executor.scale_down(target, tier).await,
        };

        if !result.success {
            warn!(action = %result.action, message = %result.message, "Fleet operation failed");
        }
        result
    }

    /// Direction of a budget-search move relative to the current allocation
    fn resolve_optimize(&self, rec: &Recommendation) -> Operation {
        match rec.recommended_instances.cmp(&rec.current_instances) {
            Ordering::Greater => Operation::ScaleUp,
            Ordering::Less => Operation::ScaleDown,
            Ordering::Equal if rec.recommended_instance_type == rec.current_instance_type => {
                Operation::Noop
            }
            Ordering::Equal => {
                let current = self.catalog.capacity(&rec.current_instance_type);
                let target = self.catalog.capacity(&rec.recommended_instance_type);
                if target > current {
                    Operation::ScaleUp
                } else {
                    Operation::ScaleDown
                }
            }
        }
    }
}
