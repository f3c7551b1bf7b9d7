//! In-process fleet backend

use super::FleetExecutor;
use crate::catalog::TierId;
use crate::error::FleetError;
use crate::models::{Allocation, ExecutionDetail, ExecutionResult, ScaleAction};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

/// A running instance tracked by [`InMemoryFleet`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetInstance {
    pub instance_id: String,
    pub instance_type: TierId,
    pub launched_at: DateTime<Utc>,
}

/// Fleet backend that keeps its instances in memory
pub struct InMemoryFleet {
    name: String,
    /// Tier the fleet runs, reported even when no instance is running
    tier: RwLock<TierId>,
    instances: RwLock<Vec<FleetInstance>>,
    /// Instances with termination protection
    protected: RwLock<HashSet<String>>,
    next_id: AtomicU64,
}

impl InMemoryFleet {
    /// Create a fleet named `name` with `count` running instances of `tier`
    pub fn new(name: impl Into<String>, count: u32, tier: impl Into<TierId>) -> Self {
        let name = name.into();
        let tier = tier.into();
        let now = Utc::now();
        let instances = (1..=u64::from(count))
            .map(|n| FleetInstance {
                instance_id: format!("{name}-{n}"),
                instance_type: tier.clone(),
                launched_at: now,
            })
            .collect();

        Self {
            name,
            tier: RwLock::new(tier),
            instances: RwLock::new(instances),
            protected: RwLock::new(HashSet::new()),
            next_id: AtomicU64::new(u64::from(count) + 1),
        }
    }

    pub async fn instances(&self) -> Vec<FleetInstance> {
        self.instances.read().await.clone()
    }

    /// Refuse to terminate `instance_id` until the fleet is dropped
    pub async fn protect(&self, instance_id: impl Into<String>) {
        self.protected.write().await.insert(instance_id.into());
    }

    fn next_instance_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.name, n)
    }

    /// Re-type every instance to `tier`, returning how many changed
    async fn resize(&self, tier: &TierId) -> usize {
        *self.tier.write().await = tier.clone();
        let mut instances = self.instances.write().await;
        let mut changed = 0;
        for instance in instances.iter_mut().filter(|i| &i.instance_type != tier) {
            instance.instance_type = tier.clone();
            changed += 1;
        }
        changed
    }
}

#[async_trait]
impl FleetExecutor for InMemoryFleet {
    async fn scale_up(&self, target_instances: u32, tier: &TierId) -> ExecutionResult {
        let current_count = self.instances.read().await.len() as u32;
        let mut detail = ExecutionDetail {
            current_count: Some(current_count),
            target_count: Some(target_instances),
            ..Default::default()
        };

        if target_instances <= current_count {
            let resized = self.resize(tier).await;
            let message = if resized > 0 {
                format!("Resized {resized} instances to {tier}")
            } else {
                "Already at or above target instance count".to_string()
            };
            return ExecutionResult::succeeded(ScaleAction::ScaleUp, message).with_detail(detail);
        }

        let to_launch = target_instances - current_count;
        match self.launch_instances(tier, to_launch).await {
            Ok(ids) => {
                // Existing instances move to the new tier along with the new ones
                self.resize(tier).await;
                detail.new_instances = ids;
                ExecutionResult::succeeded(
                    ScaleAction::ScaleUp,
                    format!("Launched {to_launch} new instances"),
                )
                .with_detail(detail)
            }
            Err(e) => ExecutionResult::failed(ScaleAction::ScaleUp, e.to_string()).with_detail(detail),
        }
    }

    async fn scale_down(&self, target_instances: u32, tier: &TierId) -> ExecutionResult {
        let mut candidates = self.instances.read().await.clone();
        let current_count = candidates.len() as u32;
        let mut detail = ExecutionDetail {
            current_count: Some(current_count),
            target_count: Some(target_instances),
            ..Default::default()
        };

        if target_instances >= current_count {
            let resized = self.resize(tier).await;
            let message = if resized > 0 {
                format!("Resized {resized} instances to {tier}")
            } else {
                "Already at or below target instance count".to_string()
            };
            return ExecutionResult::succeeded(ScaleAction::ScaleDown, message).with_detail(detail);
        }

        candidates.sort_by_key(|i| i.launched_at);
        let to_terminate = (current_count - target_instances) as usize;

        let mut terminated = Vec::with_capacity(to_terminate);
        let mut errors = Vec::new();
        for instance in candidates.into_iter().take(to_terminate) {
            match self.terminate_instance(&instance.instance_id).await {
                Ok(()) => terminated.push(instance.instance_id),
                Err(e) => errors.push(e.to_string()),
            }
        }

        let count = terminated.len();
        detail.terminated_instances = terminated;
        if count < to_terminate {
            // leave the tier alone when the fleet did not reach its target size
            return ExecutionResult::failed(
                ScaleAction::ScaleDown,
                format!(
                    "Terminated {count} of {to_terminate} instances: {}",
                    errors.join("; ")
                ),
            )
            .with_detail(detail);
        }

        self.resize(tier).await;
        ExecutionResult::succeeded(ScaleAction::ScaleDown, format!("Terminated {count} instances"))
            .with_detail(detail)
    }

    async fn current_allocation(&self) -> Result<Allocation> {
        let instances = self.instances.read().await;
        let instance_type = match instances.first() {
            Some(instance) => instance.instance_type.clone(),
            None => self.tier.read().await.clone(),
        };
        Ok(Allocation {
            instance_count: instances.len() as u32,
            instance_type,
        })
    }

    async fn launch_instances(&self, tier: &TierId, count: u32) -> Result<Vec<String>> {
        let now = Utc::now();
        let new: Vec<FleetInstance> = (0..count)
            .map(|_| FleetInstance {
                instance_id: self.next_instance_id(),
                instance_type: tier.clone(),
                launched_at: now,
            })
            .collect();
        let ids: Vec<String> = new.iter().map(|i| i.instance_id.clone()).collect();

        self.instances.write().await.extend(new);
        info!(fleet = %self.name, count = count, tier = %tier, ?ids, "Launched instances");
        Ok(ids)
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<()> {
        if self.protected.read().await.contains(instance_id) {
            return Err(FleetError::Backend(format!(
                "instance {instance_id} has termination protection"
            ))
            .into());
        }

        let mut instances = self.instances.write().await;
        let before = instances.len();
        instances.retain(|i| i.instance_id != instance_id);
        if instances.len() == before {
            return Err(FleetError::InstanceNotFound(instance_id.to_string()).into());
        }

        info!(fleet = %self.name, instance_id = %instance_id, "Terminated instance");
        Ok(())
    }
}
