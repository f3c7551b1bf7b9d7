//! In-memory decision log
//!
//! Consumes tick outcomes from the control loop and keeps a bounded FIFO
//! of outcomes and the cost records derived from them. The oldest entries
//! are evicted first once the capacity is reached.

use crate::control::TickOutcome;
use crate::models::{AllocationRecord, CostRecord, ExecutionResult, Recommendation};
use crate::trend::{analyze_trend, TrendAnalysis};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Default number of entries retained
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Snapshot of the fleet as seen by the decision log
#[derive(Debug, Clone, Serialize)]
pub struct FleetStatus {
    pub decisions: usize,
    pub latest_recommendation: Option<Recommendation>,
    pub latest_result: Option<ExecutionResult>,
    pub optimization_score: Option<f64>,
    pub cost_trend: TrendAnalysis,
}

#[derive(Debug)]
pub struct DecisionLog {
    outcomes: VecDeque<TickOutcome>,
    costs: VecDeque<CostRecord>,
    capacity: usize,
    tick_hours: f64,
}

impl DecisionLog {
    /// `tick_interval` converts each outcome's hourly cost into the cost of one tick
    pub fn new(capacity: usize, tick_interval: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            outcomes: VecDeque::with_capacity(capacity.min(1024)),
            costs: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            tick_hours: tick_interval.as_secs_f64() / 3600.0,
        }
    }

    pub fn record(&mut self, outcome: TickOutcome) {
        self.costs.push_back(CostRecord {
            timestamp: outcome.executed_at,
            cost: outcome.hourly_cost * self.tick_hours,
            resource_type: outcome.allocation.instance_type.to_string(),
        });
        self.outcomes.push_back(outcome);

        while self.outcomes.len() > self.capacity {
            self.outcomes.pop_front();
        }
        while self.costs.len() > self.capacity {
            self.costs.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn latest(&self) -> Option<&TickOutcome> {
        self.outcomes.back()
    }

    /// Up to `n` outcomes, newest first
    pub fn recent(&self, n: usize) -> Vec<&TickOutcome> {
        self.outcomes.iter().rev().take(n).collect()
    }

    /// Cost records in chronological order
    pub fn cost_records(&self) -> Vec<CostRecord> {
        self.costs.iter().cloned().collect()
    }

    /// Allocation records in chronological order
    pub fn allocation_records(&self) -> Vec<AllocationRecord> {
        self.outcomes.iter().map(TickOutcome::allocation_record).collect()
    }

    pub fn status(&self) -> FleetStatus {
        let latest = self.latest();
        FleetStatus {
            decisions: self.outcomes.len(),
            latest_recommendation: latest.map(|o| o.recommendation.clone()),
            latest_result: latest.map(|o| o.result.clone()),
            optimization_score: latest.map(|o| o.score),
            cost_trend: analyze_trend(&self.cost_records()),
        }
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, crate::control::DEFAULT_TICK_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Allocation, ScaleAction, WorkloadSample};
    use crate::trend::Trend;
    use chrono::{TimeZone, Utc};

    fn outcome(minute: u32, hourly_cost: f64) -> TickOutcome {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap();
        let recommendation = Recommendation {
            timestamp: ts,
            action: ScaleAction::Maintain,
            current_instances: 2,
            recommended_instances: 2,
            current_instance_type: "t3.small".into(),
            recommended_instance_type: "t3.small".into(),
            reason: format!("tick {minute}"),
            predicted_cpu: 50.0,
            predicted_memory: 50.0,
            estimated_cost: Default::default(),
            performance_score: None,
        };
        TickOutcome {
            recommendation,
            result: ExecutionResult::succeeded(ScaleAction::Maintain, "No changes needed"),
            allocation: Allocation::new(2, "t3.small"),
            hourly_cost,
            score: 70.0,
            workload: WorkloadSample::new(50.0, 50.0, 0.0),
            executed_at: ts,
        }
    }

    #[test]
    fn test_empty_log_status() {
        let log = DecisionLog::default();
        let status = log.status();
        assert_eq!(status.decisions, 0);
        assert!(status.latest_recommendation.is_none());
        assert_eq!(status.cost_trend.trend, Trend::Stable);
    }

    #[test]
    fn test_cost_record_per_tick() {
        let mut log = DecisionLog::new(10, Duration::from_secs(1800));
        log.record(outcome(0, 0.0416));

        let costs = log.cost_records();
        assert_eq!(costs.len(), 1);
        assert!((costs[0].cost - 0.0208).abs() < 1e-12);
        assert_eq!(costs[0].resource_type, "t3.small");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = DecisionLog::new(3, Duration::from_secs(600));
        for minute in 0..5 {
            log.record(outcome(minute, 0.1));
        }

        assert_eq!(log.len(), 3);
        assert_eq!(log.cost_records().len(), 3);
        let records = log.allocation_records();
        assert_eq!(records[0].recommendation.reason, "tick 2");
        assert_eq!(log.latest().unwrap().recommendation.reason, "tick 4");
    }

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = DecisionLog::new(10, Duration::from_secs(600));
        for minute in 0..4 {
            log.record(outcome(minute, 0.1));
        }

        let recent: Vec<_> = log
            .recent(2)
            .iter()
            .map(|o| o.recommendation.reason.clone())
            .collect();
        assert_eq!(recent, vec!["tick 3", "tick 2"]);
        assert_eq!(log.recent(50).len(), 4);
    }

    #[test]
    fn test_status_reports_latest() {
        let mut log = DecisionLog::new(10, Duration::from_secs(600));
        log.record(outcome(0, 0.1));
        log.record(outcome(10, 0.1));

        let status = log.status();
        assert_eq!(status.decisions, 2);
        assert_eq!(status.optimization_score, Some(70.0));
        assert_eq!(status.cost_trend.trend, Trend::InsufficientData);
        assert_eq!(status.cost_trend.days_analyzed, 1);
    }
}
