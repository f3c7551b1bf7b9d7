//! Fleet execution backends and the recommendation dispatcher
//!
//! The decision engine only depends on the [`FleetExecutor`] trait; each
//! provider backend implements it. [`InMemoryFleet`] models a provider in
//! process and backs the agent's dry-run mode and the tests.

mod dispatch;
mod memory;

pub use dispatch::ExecutionDispatcher;
pub use memory::{FleetInstance, InMemoryFleet};

use crate::catalog::TierId;
use crate::models::{Allocation, ExecutionResult};
use anyhow::Result;

pub use async_trait::async_trait;

/// Capability set shared by every fleet backend
///
/// Scale operations report backend failures through
/// `ExecutionResult::success`; `Err` is reserved for calls whose outcome is
/// unknown.
#[async_trait]
pub trait FleetExecutor: Send + Sync {
    /// Grow the fleet to `target_instances`, launching new instances of `tier`
    async fn scale_up(&self, target_instances: u32, tier: &TierId) -> ExecutionResult;

    /// Shrink the fleet to `target_instances`, terminating the oldest instances first
    async fn scale_down(&self, target_instances: u32, tier: &TierId) -> ExecutionResult;

    /// Report the fleet's current shape
    async fn current_allocation(&self) -> Result<Allocation>;

    /// Launch `count` instances of `tier`, returning their ids
    async fn launch_instances(&self, tier: &TierId, count: u32) -> Result<Vec<String>>;

    /// Terminate a single instance
    async fn terminate_instance(&self, instance_id: &str) -> Result<()>;
}
