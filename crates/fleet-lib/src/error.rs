//! Error types for the fleet boundary
//!
//! Decision functions never fail; these errors only surface from the
//! collaborators at the edges (sampling, fleet backends, configuration).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FleetError {
    /// The fleet backend has no instance with this id
    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    /// A sampler source could not be parsed
    #[error("malformed {source_name}: {detail}")]
    MalformedSource { source_name: String, detail: String },

    /// The fleet backend rejected or failed an operation
    #[error("fleet backend error: {0}")]
    Backend(String),

    /// Configuration values are out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FleetError {
    pub fn malformed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedSource {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}
