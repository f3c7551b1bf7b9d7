//! Decision engine configuration

use crate::budget::{BudgetSearch, DEFAULT_CANDIDATE_TIERS};
use crate::catalog::{TierCatalog, TierId};
use crate::cost::CostEstimator;
use crate::engine::{RecommendationEngine, Thresholds};
use crate::error::FleetError;
use crate::scoring::{OptimizationScorer, ScoringWeights, MAX_REASONABLE_HOURLY_COST};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Tunables shared by the engine, budget search and scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub weights: ScoringWeights,
    /// Monthly budget in USD; no budget search when unset
    pub budget_monthly: Option<f64>,
    pub candidate_tiers: Vec<TierId>,
    pub max_reasonable_hourly_cost: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            weights: ScoringWeights::default(),
            budget_monthly: None,
            candidate_tiers: DEFAULT_CANDIDATE_TIERS.iter().map(|t| TierId::from(*t)).collect(),
            max_reasonable_hourly_cost: MAX_REASONABLE_HOURLY_COST,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), FleetError> {
        let t = &self.thresholds;
        if t.cpu_low >= t.cpu_high {
            return Err(FleetError::InvalidConfig(format!(
                "cpu_low ({}) must be below cpu_high ({})",
                t.cpu_low, t.cpu_high
            )));
        }
        if t.memory_low >= t.memory_high {
            return Err(FleetError::InvalidConfig(format!(
                "memory_low ({}) must be below memory_high ({})",
                t.memory_low, t.memory_high
            )));
        }
        if self.weights.cost < 0.0 || self.weights.performance < 0.0 {
            return Err(FleetError::InvalidConfig(
                "scoring weights must not be negative".to_string(),
            ));
        }
        if let Some(budget) = self.budget_monthly {
            if !budget.is_finite() || budget < 0.0 {
                return Err(FleetError::InvalidConfig(format!(
                    "budget_monthly must be a non-negative number, got {budget}"
                )));
            }
        }
        if self.candidate_tiers.is_empty() {
            return Err(FleetError::InvalidConfig(
                "candidate_tiers must not be empty".to_string(),
            ));
        }
        if self.max_reasonable_hourly_cost <= 0.0 {
            return Err(FleetError::InvalidConfig(
                "max_reasonable_hourly_cost must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn engine(&self, catalog: Arc<TierCatalog>) -> RecommendationEngine {
        RecommendationEngine::new(self.thresholds, catalog)
    }

    pub fn budget_search(&self, catalog: Arc<TierCatalog>) -> BudgetSearch {
        BudgetSearch::new(self.engine(catalog)).with_candidate_tiers(self.candidate_tiers.clone())
    }

    pub fn scorer(&self, catalog: Arc<TierCatalog>) -> OptimizationScorer {
        OptimizationScorer::new(self.weights, CostEstimator::new(catalog))
            .with_max_hourly_cost(self.max_reasonable_hourly_cost)
    }
}
