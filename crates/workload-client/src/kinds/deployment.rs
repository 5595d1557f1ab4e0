use super::ScalableWorkload;
use crate::models::WorkloadKind;
use k8s_openapi::api::apps::v1::Deployment;

impl ScalableWorkload for Deployment {
    const KIND: WorkloadKind = WorkloadKind::Deployment;

    fn replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|spec| spec.replicas)
    }
}
