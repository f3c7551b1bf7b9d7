//! Subcommand implementations

pub mod costs;
pub mod decide;

use anyhow::{Context, Result};
use fleet_lib::{Allocation, WorkloadSample};
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::{FleetArgs, WorkloadArgs};

/// Read a JSON document from a file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

impl FleetArgs {
    pub fn allocation(&self) -> Allocation {
        Allocation::new(self.instances, self.tier.as_str())
    }
}

impl WorkloadArgs {
    pub fn sample(&self) -> WorkloadSample {
        WorkloadSample::new(self.cpu, self.memory, self.network)
    }
}
