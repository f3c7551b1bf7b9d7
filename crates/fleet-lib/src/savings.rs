//! Heuristic cost-saving suggestions

use crate::catalog::TierCatalog;
use crate::models::{Allocation, WorkloadSample};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavingsKind {
    Downsize,
    Schedule,
    InstanceType,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for SavingsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SavingsKind::Downsize => "downsize",
            SavingsKind::Schedule => "schedule",
            SavingsKind::InstanceType => "instance_type",
            SavingsKind::Reserved => "reserved",
        })
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

/// Estimated saving as a percentage range of the current bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsRange {
    pub min_percent: u8,
    pub max_percent: u8,
}

impl fmt::Display for SavingsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}%", self.min_percent, self.max_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsRecommendation {
    pub kind: SavingsKind,
    pub priority: Priority,
    pub description: String,
    pub potential_savings: SavingsRange,
    pub action: String,
}

/// Produces savings suggestions from utilization, allocation and forecast
#[derive(Debug, Clone)]
pub struct SavingsAdvisor {
    catalog: Arc<TierCatalog>,
}

impl SavingsAdvisor {
    pub fn new(catalog: Arc<TierCatalog>) -> Self {
        Self { catalog }
    }

    /// Evaluate every rule; the reserved-instance suggestion is emitted only
    /// when nothing else applies, so the result is never empty
    pub fn recommend(
        &self,
        current: &Allocation,
        metrics: &WorkloadSample,
        predicted: &WorkloadSample,
    ) -> Vec<SavingsRecommendation> {
        let metrics = metrics.sanitized();
        let predicted = predicted.sanitized();
        let mut out = Vec::new();

        if metrics.cpu_usage < 30.0 && metrics.memory_usage < 30.0 {
            out.push(SavingsRecommendation {
                kind: SavingsKind::Downsize,
                priority: Priority::High,
                description: "Resources are significantly under-utilized".to_string(),
                potential_savings: SavingsRange {
                    min_percent: 30,
                    max_percent: 40,
                },
                action: "Consider downsizing instance type or reducing instance count"
                    .to_string(),
            });
        }

        if metrics.cpu_usage < 40.0 && predicted.cpu_usage < 40.0 {
            out.push(SavingsRecommendation {
                kind: SavingsKind::Schedule,
                priority: Priority::Medium,
                description: "Consistent low usage detected".to_string(),
                potential_savings: SavingsRange {
                    min_percent: 20,
                    max_percent: 30,
                },
                action: "Consider implementing scheduled scaling or spot instances".to_string(),
            });
        }

        let tier = &current.instance_type;
        if self.catalog.is_burstable_economy(tier) {
            let family = tier.family();
            let action = match self.catalog.family(family).and_then(|f| f.successor.as_deref()) {
                Some(successor) => format!(
                    "Consider {} instances for better price-performance ratio",
                    successor.to_uppercase()
                ),
                None => "Consider a newer instance family for better price-performance ratio"
                    .to_string(),
            };
            out.push(SavingsRecommendation {
                kind: SavingsKind::InstanceType,
                priority: Priority::Low,
                description: format!("{} instances detected", family.to_uppercase()),
                potential_savings: SavingsRange {
                    min_percent: 10,
                    max_percent: 20,
                },
                action,
            });
        }

        if out.is_empty() {
            out.push(SavingsRecommendation {
                kind: SavingsKind::Reserved,
                priority: Priority::Low,
                description: "Stable workload detected".to_string(),
                potential_savings: SavingsRange {
                    min_percent: 30,
                    max_percent: 50,
                },
                action: "Consider reserved instances for long-term cost savings".to_string(),
            });
        }

        out
    }
}

impl Default for SavingsAdvisor {
    fn default() -> Self {
        Self::new(TierCatalog::builtin())
    }
}
