//! Budget-constrained configuration search
//!
//! When the engine's recommendation costs more than the monthly budget,
//! enumerate a bounded grid of (tier, count) pairs and keep the one whose
//! capacity best fits the predicted load without exceeding the budget.

use crate::catalog::TierId;
use crate::engine::RecommendationEngine;
use crate::models::{Allocation, Recommendation, ScaleAction, WorkloadSample};
use tracing::{debug, info};

/// Largest instance count considered by the search
pub const MAX_SEARCH_INSTANCES: u32 = 5;

/// Tiers searched by default, in iteration order
pub const DEFAULT_CANDIDATE_TIERS: [&str; 4] = ["t2.micro", "t2.small", "t2.medium", "t2.large"];

/// Score how well `capacity * count` load units fit a CPU prediction
///
/// Over-provisioning loses 10 points per unit of slack; under-provisioning
/// starts from 50 and loses 20 points per missing unit. Never negative.
pub fn performance_score(capacity: u32, count: u32, predicted_cpu: f64) -> f64 {
    let total_capacity = f64::from(capacity) * f64::from(count);
    let load = predicted_cpu / 10.0;

    let score = if total_capacity >= load {
        100.0 - (total_capacity - load).abs() * 10.0
    } else {
        50.0 - (load - total_capacity) * 20.0
    };

    score.max(0.0)
}

/// Searches for the best configuration within a monthly budget
#[derive(Debug, Clone)]
pub struct BudgetSearch {
    engine: RecommendationEngine,
    candidate_tiers: Vec<TierId>,
    max_instances: u32,
}

impl BudgetSearch {
    pub fn new(engine: RecommendationEngine) -> Self {
        Self {
            engine,
            candidate_tiers: DEFAULT_CANDIDATE_TIERS.iter().map(|t| TierId::from(*t)).collect(),
            max_instances: MAX_SEARCH_INSTANCES,
        }
    }

    pub fn with_candidate_tiers(mut self, tiers: Vec<TierId>) -> Self {
        self.candidate_tiers = tiers;
        self
    }

    pub fn engine(&self) -> &RecommendationEngine {
        &self.engine
    }

    /// Recommend within `budget_monthly`, or `None` when no configuration fits
    ///
    /// The unconstrained recommendation is returned unchanged when it already
    /// fits the budget.
    pub fn optimize_for_budget(
        &self,
        predicted: &WorkloadSample,
        current: &Allocation,
        budget_monthly: f64,
    ) -> Option<Recommendation> {
        let base = self.engine.recommend(predicted, current);
        if base.estimated_cost.monthly <= budget_monthly {
            return Some(base);
        }

        info!(
            estimated_monthly = base.estimated_cost.monthly,
            budget_monthly = budget_monthly,
            "Recommendation exceeds budget, searching for alternative"
        );

        let predicted = predicted.sanitized();
        let catalog = self.engine.catalog();
        let estimator = self.engine.estimator();

        let mut best: Option<(TierId, u32, f64)> = None;
        for tier in &self.candidate_tiers {
            let capacity = catalog.capacity(tier);
            for count in 1..=self.max_instances {
                let cost = estimator.estimate(count, tier);
                if cost.monthly > budget_monthly {
                    continue;
                }

                let score = performance_score(capacity, count, predicted.cpu_usage);
                if best.as_ref().map_or(true, |(_, _, s)| score > *s) {
                    best = Some((tier.clone(), count, score));
                }
            }
        }

        let (tier, count, score) = best?;
        let estimated_cost = estimator.estimate(count, &tier);

        debug!(
            tier = %tier,
            count = count,
            score = score,
            monthly_cost = estimated_cost.monthly,
            "Budget-optimal configuration found"
        );

        Some(Recommendation {
            timestamp: chrono::Utc::now(),
            action: ScaleAction::Optimize,
            current_instances: current.instance_count,
            recommended_instances: count,
            current_instance_type: current.instance_type.clone(),
            recommended_instance_type: tier,
            reason: format!("Budget-optimized configuration (score: {score:.1})"),
            predicted_cpu: predicted.cpu_usage,
            predicted_memory: predicted.memory_usage,
            estimated_cost,
            performance_score: Some(score),
        })
    }
}

impl Default for BudgetSearch {
    fn default() -> Self {
        Self::new(RecommendationEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_performance_score_exact_fit() {
        assert_eq!(performance_score(2, 2, 40.0), 100.0);
    }

    #[test]
    fn test_performance_score_over_provisioned() {
        // capacity 8, load 5 -> 100 - 30
        assert_eq!(performance_score(8, 1, 50.0), 70.0);
    }

    #[test]
    fn test_performance_score_under_provisioned() {
        // capacity 1, load 2 -> 50 - 20
        assert_eq!(performance_score(1, 1, 20.0), 30.0);
    }

    #[test]
    fn test_performance_score_floor() {
        assert_eq!(performance_score(1, 1, 100.0), 0.0);
        assert_eq!(performance_score(16, 5, 0.0), 0.0);
    }

    #[test]
    fn test_within_budget_returns_base_recommendation() {
        let search = BudgetSearch::default();
        let rec = search
            .optimize_for_budget(
                &WorkloadSample::new(60.0, 60.0, 0.0),
                &Allocation::new(2, "t2.small"),
                1_000.0,
            )
            .unwrap();
        assert_eq!(rec.action, ScaleAction::Maintain);
        assert!(rec.performance_score.is_none());
    }

    #[test]
    fn test_over_budget_searches_grid() {
        let search = BudgetSearch::default();
        // 4 x t2.large costs ~267/month; the scale-up recommendation costs more
        let rec = search
            .optimize_for_budget(
                &WorkloadSample::new(85.0, 50.0, 0.0),
                &Allocation::new(4, "t2.large"),
                50.0,
            )
            .unwrap();

        assert_eq!(rec.action, ScaleAction::Optimize);
        assert!(rec.estimated_cost.monthly <= 50.0);
        assert!(rec.reason.contains("score"));
        assert_eq!(rec.current_instances, 4);
        assert_eq!(rec.current_instance_type, TierId::from("t2.large"));
    }

    #[test]
    fn test_search_prefers_best_fit_and_first_seen_on_ties() {
        let search = BudgetSearch::default();
        // load 4.0: t2.micro x4 fits exactly and is seen before t2.small x2 and t2.medium x1
        let rec = search
            .optimize_for_budget(
                &WorkloadSample::new(40.0, 90.0, 0.0),
                &Allocation::new(5, "t2.large"),
                100.0,
            )
            .unwrap();

        assert_eq!(rec.recommended_instance_type, TierId::from("t2.micro"));
        assert_eq!(rec.recommended_instances, 4);
        assert_eq!(rec.performance_score, Some(100.0));
    }

    #[test]
    fn test_infeasible_budget_returns_none() {
        let search = BudgetSearch::default();
        let rec = search.optimize_for_budget(
            &WorkloadSample::new(95.0, 95.0, 0.0),
            &Allocation::new(3, "t2.large"),
            1.0,
        );
        assert!(rec.is_none());
    }

    #[test]
    fn test_result_never_exceeds_budget() {
        let search = BudgetSearch::default();
        for budget in [5.0, 9.0, 17.0, 33.5, 70.0, 140.0] {
            for cpu in [0.0, 25.0, 50.0, 90.0, 100.0] {
                let result = search.optimize_for_budget(
                    &WorkloadSample::new(cpu, 95.0, 0.0),
                    &Allocation::new(5, "t2.xlarge"),
                    budget,
                );
                if let Some(rec) = result {
                    assert!(rec.estimated_cost.monthly <= budget);
                }
            }
        }
    }
}
