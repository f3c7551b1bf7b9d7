//! Cost estimation for (tier, count) configurations

use crate::catalog::{TierCatalog, TierId};
use crate::models::CostEstimate;
use std::sync::Arc;

/// Converts a configuration into hourly, daily and monthly cost
#[derive(Debug, Clone)]
pub struct CostEstimator {
    catalog: Arc<TierCatalog>,
}

impl CostEstimator {
    pub fn new(catalog: Arc<TierCatalog>) -> Self {
        Self { catalog }
    }

    /// Estimate the cost of running `count` instances of `tier`
    ///
    /// Unknown tiers are priced as the cheapest tier in the catalog.
    pub fn estimate(&self, count: u32, tier: &TierId) -> CostEstimate {
        CostEstimate::from_hourly(self.catalog.hourly_price(tier) * f64::from(count))
    }

    pub fn catalog(&self) -> &Arc<TierCatalog> {
        &self.catalog
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(TierCatalog::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_known_tier() {
        let estimator = CostEstimator::default();
        let cost = estimator.estimate(2, &"t2.small".into());
        assert!((cost.hourly - 0.046).abs() < 1e-12);
        assert!((cost.daily - 1.104).abs() < 1e-9);
        assert!((cost.monthly - 33.12).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_daily_hourly_relationship() {
        let estimator = CostEstimator::default();
        for spec in estimator.catalog().tiers() {
            for count in 0..8 {
                let cost = estimator.estimate(count, &spec.id);
                assert_eq!(cost.monthly, cost.daily * 30.0);
                assert_eq!(cost.monthly, cost.hourly * 24.0 * 30.0);
            }
        }
    }

    #[test]
    fn test_monotonic_in_count() {
        let estimator = CostEstimator::default();
        let tier = TierId::from("t3.large");
        let mut previous = estimator.estimate(0, &tier);
        assert_eq!(previous.monthly, 0.0);
        for count in 1..20 {
            let cost = estimator.estimate(count, &tier);
            assert!(cost.monthly >= previous.monthly);
            previous = cost;
        }
    }

    #[test]
    fn test_unknown_tier_uses_cheapest_price() {
        let estimator = CostEstimator::default();
        let cost = estimator.estimate(1, &"c6g.metal".into());
        assert_eq!(cost.hourly, 0.0104);
    }
}
