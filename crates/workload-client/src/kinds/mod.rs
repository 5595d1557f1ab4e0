//! Typed workload kinds.
//!
//! Each supported kind maps a `k8s-openapi` type onto the kind-agnostic
//! [`Workload`] view. Adding a kind means one file here plus a `WorkloadKind`
//! variant.

mod deployment;
mod statefulset;

use crate::models::{Workload, WorkloadKind};
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// A namespaced workload with a replica count.
pub(crate) trait ScalableWorkload:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: WorkloadKind;

    fn replicas(&self) -> Option<i32>;
}

/// Converts a typed object into the kind-agnostic view.
pub(crate) fn to_workload<K: ScalableWorkload>(obj: &K) -> Workload {
    let meta = obj.meta();
    Workload {
        kind: K::KIND,
        namespace: meta.namespace.clone().unwrap_or_default(),
        name: meta.name.clone().unwrap_or_default(),
        uid: meta.uid.clone(),
        replicas: obj.replicas().unwrap_or(0),
        annotations: meta.annotations.clone().unwrap_or_default(),
    }
}
