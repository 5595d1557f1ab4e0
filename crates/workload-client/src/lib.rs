//! Kubernetes Workload Client
//!
//! A small client for the handful of Kubernetes API operations the Tarnfui
//! controller needs on scalable workloads: paged listing, single reads,
//! replica patches, annotation patches and lifecycle events.
//!
//! # Example
//!
//! ```no_run
//! use workload_client::{KubeWorkloadClient, WorkloadClientTrait, WorkloadKind};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let kube_client = kube::Client::try_default().await?;
//! let client = KubeWorkloadClient::new(kube_client, Some("tarnfui-0".to_string()));
//!
//! // First page of Deployments across all namespaces
//! let page = client.list_page(WorkloadKind::Deployment, None, 100, None).await?;
//! for workload in &page.items {
//!     println!("{} has {} replicas", workload, workload.replicas);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Paged listing**: `limit`/`continue` so callers never hold the whole cluster
//! - **Merge patches**: replica counts and single annotations
//! - **Events**: `events.k8s.io/v1` events through the kube-runtime recorder
//! - **Mocking**: in-memory `MockWorkloadClient` behind the `test-util` feature

pub mod client;
pub mod error;
mod kinds;
pub mod models;
#[path = "trait.rs"]
pub mod workload_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeWorkloadClient;
pub use error::WorkloadError;
pub use models::*;
pub use workload_trait::WorkloadClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockCall, MockOperation, MockWorkloadClient, RecordedEvent};
