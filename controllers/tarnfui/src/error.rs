//! Controller-specific error types.
//!
//! This module defines error types specific to the Tarnfui controller
//! that are not covered by upstream library errors.

use thiserror::Error;
use kube::Error as KubeError;
use workload_client::WorkloadError;

/// Errors that can occur in the Tarnfui controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Workload API error
    #[error("Workload error: {0}")]
    Workload(#[from] WorkloadError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),

    /// Metrics registry or server failure
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Socket or signal handler setup failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<prometheus::Error> for ControllerError {
    fn from(e: prometheus::Error) -> Self {
        ControllerError::Metrics(e.to_string())
    }
}
