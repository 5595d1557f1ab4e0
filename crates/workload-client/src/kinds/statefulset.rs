use super::ScalableWorkload;
use crate::models::WorkloadKind;
use k8s_openapi::api::apps::v1::StatefulSet;

impl ScalableWorkload for StatefulSet {
    const KIND: WorkloadKind = WorkloadKind::StatefulSet;

    fn replicas(&self) -> Option<i32> {
        self.spec.as_ref().and_then(|spec| spec.replicas)
    }
}
