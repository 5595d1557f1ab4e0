//! Workload data models
//!
//! A kind-agnostic view of the scalable workload objects the controller
//! manages. Conversion from the typed `k8s-openapi` objects lives in the
//! private `kinds` module.

use crate::error::WorkloadError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Supported workload kinds.
///
/// The derived ordering is the canonical processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl WorkloadKind {
    /// Every supported kind, in canonical order.
    pub const ALL: [WorkloadKind; 2] = [WorkloadKind::Deployment, WorkloadKind::StatefulSet];

    /// Kubernetes `kind` string
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
        }
    }

    /// Kubernetes `apiVersion` string
    pub fn api_version(&self) -> &'static str {
        "apps/v1"
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = WorkloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deployment" | "deployments" | "deploy" => Ok(WorkloadKind::Deployment),
            "statefulset" | "statefulsets" | "sts" => Ok(WorkloadKind::StatefulSet),
            other => Err(WorkloadError::UnsupportedKind(other.to_string())),
        }
    }
}

/// Raw view of one workload object as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub uid: Option<String>,
    /// `spec.replicas`, 0 when unset
    pub replicas: i32,
    pub annotations: BTreeMap<String, String>,
}

impl Workload {
    /// Creates a workload view with no uid and no annotations.
    pub fn new(
        kind: WorkloadKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
        replicas: i32,
    ) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
            uid: None,
            replicas,
            annotations: BTreeMap::new(),
        }
    }

    /// Builder-style annotation setter
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Reads a single annotation.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

impl fmt::Display for Workload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// One page of a paged list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadPage {
    pub items: Vec<Workload>,
    /// Token for the next page; `None` on the last page
    pub continue_token: Option<String>,
}
