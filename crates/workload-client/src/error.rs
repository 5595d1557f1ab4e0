//! Workload client errors

use thiserror::Error;

/// Errors that can occur when talking to the Kubernetes API about workloads
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// Kubernetes API or transport error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Resource not found (deleted, or never existed)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API answered with something we could not use
    #[error("Workload API error: {0}")]
    Api(String),

    /// Workload kind name not supported by this client
    #[error("Unsupported workload kind: {0}")]
    UnsupportedKind(String),
}

impl WorkloadError {
    /// Whether this error means the object is gone.
    pub fn is_not_found(&self) -> bool {
        match self {
            WorkloadError::NotFound(_) => true,
            WorkloadError::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}
