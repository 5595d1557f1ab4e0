//! WorkloadClient trait for mocking
//!
//! This trait abstracts the Kubernetes API operations the controller needs so
//! reconciliation logic can be unit tested against an in-memory mock.

use crate::error::WorkloadError;
use crate::models::*;

/// Trait for workload API client operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Implementations must be safe for concurrent use.
#[async_trait::async_trait]
pub trait WorkloadClientTrait: Send + Sync {
    /// Lists one page of workloads of `kind`, in `namespace` or cluster-wide.
    async fn list_page(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, WorkloadError>;

    /// Reads a single workload. Missing objects yield `WorkloadError::NotFound`.
    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, WorkloadError>;

    /// Sets `spec.replicas`.
    async fn patch_scale(&self, kind: WorkloadKind, namespace: &str, name: &str, replicas: i32) -> Result<(), WorkloadError>;

    /// Writes (`Some`) or removes (`None`) a single annotation.
    async fn patch_annotation(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), WorkloadError>;

    /// Publishes a Normal event regarding `workload`.
    async fn emit_event(&self, workload: &Workload, reason: &str, message: &str) -> Result<(), WorkloadError>;
}
