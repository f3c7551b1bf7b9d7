//! Optimization score: cost efficiency blended with utilization fitness

use crate::cost::CostEstimator;
use crate::models::{Allocation, WorkloadSample};
use serde::{Deserialize, Serialize};

/// Hourly fleet cost at which the cost score reaches zero
pub const MAX_REASONABLE_HOURLY_COST: f64 = 5.0;

/// Utilization band that scores a full 100
pub const OPTIMAL_BAND: (f64, f64) = (60.0, 80.0);

/// Relative weight of the cost and performance components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub cost: f64,
    pub performance: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            cost: 0.5,
            performance: 0.5,
        }
    }
}

/// Utilization-fitness curve for a single metric
///
/// Inside the optimal band the score is 100. Below it the score drops by
/// 2 per percentage point, above it by 3, so over-utilization is penalized
/// harder. Clamped to [0, 100].
pub fn utilization_fitness(value: f64) -> f64 {
    let (low, high) = OPTIMAL_BAND;
    let score = if value < low {
        100.0 - (low - value) * 2.0
    } else if value > high {
        100.0 - (value - high) * 3.0
    } else {
        100.0
    };
    score.clamp(0.0, 100.0)
}

/// Scores an allocation against observed utilization
#[derive(Debug, Clone)]
pub struct OptimizationScorer {
    weights: ScoringWeights,
    max_hourly_cost: f64,
    estimator: CostEstimator,
}

impl OptimizationScorer {
    pub fn new(weights: ScoringWeights, estimator: CostEstimator) -> Self {
        Self {
            weights,
            max_hourly_cost: MAX_REASONABLE_HOURLY_COST,
            estimator,
        }
    }

    pub fn with_max_hourly_cost(mut self, max_hourly_cost: f64) -> Self {
        self.max_hourly_cost = max_hourly_cost;
        self
    }

    /// Cheaper fleets score higher; zero at or beyond the reasonable maximum
    pub fn cost_score(&self, allocation: &Allocation) -> f64 {
        if self.max_hourly_cost <= 0.0 {
            return 0.0;
        }
        let hourly = self
            .estimator
            .estimate(allocation.instance_count, &allocation.instance_type)
            .hourly;
        (100.0 - (hourly / self.max_hourly_cost) * 100.0).clamp(0.0, 100.0)
    }

    /// Average utilization fitness of CPU and memory
    pub fn performance_score(&self, metrics: &WorkloadSample) -> f64 {
        let metrics = metrics.sanitized();
        let cpu = utilization_fitness(metrics.cpu_usage);
        let memory = utilization_fitness(metrics.memory_usage);
        ((cpu + memory) / 2.0).clamp(0.0, 100.0)
    }

    /// Weighted optimization score in [0, 100]
    pub fn score(&self, allocation: &Allocation, metrics: &WorkloadSample) -> f64 {
        let total = self.weights.cost * self.cost_score(allocation)
            + self.weights.performance * self.performance_score(metrics);
        if total.is_finite() {
            total.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

impl Default for OptimizationScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default(), CostEstimator::default())
    }
}
