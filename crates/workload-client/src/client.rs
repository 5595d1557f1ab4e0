//! Kubernetes workload API client
//!
//! Implements [`WorkloadClientTrait`] on top of a `kube::Client`, dispatching
//! each call to the typed API for the requested [`WorkloadKind`].

use crate::error::WorkloadError;
use crate::kinds::{to_workload, ScalableWorkload};
use crate::models::*;
use crate::workload_trait::WorkloadClientTrait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::ObjectReference;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use kube_runtime::events::{Event, EventType, Recorder, Reporter};
use tracing::debug;

/// Name reported as `reportingController` on emitted events.
pub const REPORTING_CONTROLLER: &str = "tarnfui";

/// Kubernetes-backed workload client
pub struct KubeWorkloadClient {
    client: Client,
    recorder: Recorder,
}

impl std::fmt::Debug for KubeWorkloadClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeWorkloadClient").finish_non_exhaustive()
    }
}

impl KubeWorkloadClient {
    /// Create a new workload client
    ///
    /// # Arguments
    /// * `client` - Kubernetes client (in-cluster or kubeconfig)
    /// * `reporting_instance` - Instance name put on events, usually the pod name
    pub fn new(client: Client, reporting_instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: REPORTING_CONTROLLER.to_string(),
            instance: reporting_instance,
        };
        let recorder = Recorder::new(client.clone(), reporter);
        Self { client, recorder }
    }

    fn namespaced_api<K: ScalableWorkload>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn scoped_api<K: ScalableWorkload>(&self, namespace: Option<&str>) -> Api<K> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn list_typed<K: ScalableWorkload>(
        &self,
        namespace: Option<&str>,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, WorkloadError> {
        let mut params = ListParams::default().limit(limit);
        if let Some(token) = continue_token {
            params = params.continue_token(token);
        }

        let list = self.scoped_api::<K>(namespace).list(&params).await?;
        let continue_token = list.metadata.continue_.filter(|token| !token.is_empty());
        debug!(
            kind = %K::KIND,
            count = list.items.len(),
            more = continue_token.is_some(),
            "Listed workload page"
        );

        Ok(WorkloadPage {
            items: list.items.iter().map(to_workload).collect(),
            continue_token,
        })
    }

    async fn get_typed<K: ScalableWorkload>(&self, namespace: &str, name: &str) -> Result<Workload, WorkloadError> {
        match self.namespaced_api::<K>(namespace).get(name).await {
            Ok(obj) => Ok(to_workload(&obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Err(WorkloadError::NotFound(format!("{} {}/{}", K::KIND, namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn merge_patch<K: ScalableWorkload>(
        &self,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<(), WorkloadError> {
        match self
            .namespaced_api::<K>(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                Err(WorkloadError::NotFound(format!("{} {}/{}", K::KIND, namespace, name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn merge_patch_kind(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        patch: serde_json::Value,
    ) -> Result<(), WorkloadError> {
        match kind {
            WorkloadKind::Deployment => self.merge_patch::<Deployment>(namespace, name, patch).await,
            WorkloadKind::StatefulSet => self.merge_patch::<StatefulSet>(namespace, name, patch).await,
        }
    }
}

/// Builds the JSON merge patch for `spec.replicas`.
pub fn scale_patch(replicas: i32) -> serde_json::Value {
    serde_json::json!({ "spec": { "replicas": replicas } })
}

/// Builds the JSON merge patch for one annotation; `None` deletes the key.
pub fn annotation_patch(key: &str, value: Option<&str>) -> serde_json::Value {
    serde_json::json!({ "metadata": { "annotations": { key: value } } })
}

fn object_reference(workload: &Workload) -> ObjectReference {
    ObjectReference {
        api_version: Some(workload.kind.api_version().to_string()),
        kind: Some(workload.kind.as_str().to_string()),
        name: Some(workload.name.clone()),
        namespace: Some(workload.namespace.clone()),
        uid: workload.uid.clone(),
        ..Default::default()
    }
}

#[async_trait::async_trait]
impl WorkloadClientTrait for KubeWorkloadClient {
    async fn list_page(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, WorkloadError> {
        match kind {
            WorkloadKind::Deployment => self.list_typed::<Deployment>(namespace, limit, continue_token).await,
            WorkloadKind::StatefulSet => self.list_typed::<StatefulSet>(namespace, limit, continue_token).await,
        }
    }

    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, WorkloadError> {
        match kind {
            WorkloadKind::Deployment => self.get_typed::<Deployment>(namespace, name).await,
            WorkloadKind::StatefulSet => self.get_typed::<StatefulSet>(namespace, name).await,
        }
    }

    async fn patch_scale(&self, kind: WorkloadKind, namespace: &str, name: &str, replicas: i32) -> Result<(), WorkloadError> {
        debug!(%kind, namespace, name, replicas, "Patching replicas");
        self.merge_patch_kind(kind, namespace, name, scale_patch(replicas)).await
    }

    async fn patch_annotation(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), WorkloadError> {
        debug!(%kind, namespace, name, key, ?value, "Patching annotation");
        self.merge_patch_kind(kind, namespace, name, annotation_patch(key, value)).await
    }

    async fn emit_event(&self, workload: &Workload, reason: &str, message: &str) -> Result<(), WorkloadError> {
        let event = Event {
            type_: EventType::Normal,
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: reason.to_string(),
            secondary: None,
        };
        self.recorder.publish(&event, &object_reference(workload)).await?;
        debug!(%workload, reason, "Published event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_patch_shape() {
        assert_eq!(scale_patch(0), serde_json::json!({ "spec": { "replicas": 0 } }));
    }

    #[test]
    fn test_annotation_patch_write_and_clear() {
        assert_eq!(
            annotation_patch("tarnfui.io/original-state", Some("3")),
            serde_json::json!({ "metadata": { "annotations": { "tarnfui.io/original-state": "3" } } })
        );
        assert_eq!(
            annotation_patch("tarnfui.io/original-state", None),
            serde_json::json!({ "metadata": { "annotations": { "tarnfui.io/original-state": null } } })
        );
    }

    #[test]
    fn test_object_reference_carries_identity() {
        let mut workload = Workload::new(WorkloadKind::StatefulSet, "db", "postgres", 1);
        workload.uid = Some("abc".to_string());
        let reference = object_reference(&workload);
        assert_eq!(reference.api_version.as_deref(), Some("apps/v1"));
        assert_eq!(reference.kind.as_deref(), Some("StatefulSet"));
        assert_eq!(reference.name.as_deref(), Some("postgres"));
        assert_eq!(reference.namespace.as_deref(), Some("db"));
        assert_eq!(reference.uid.as_deref(), Some("abc"));
    }
}
