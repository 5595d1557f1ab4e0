//! StatefulSet adapter.
//!
//! StatefulSets scale their pods down in reverse ordinal order and back up in
//! order; the controller only touches `spec.replicas` and leaves that ordering
//! to the StatefulSet controller.

use super::WorkloadAdapter;
use std::sync::Arc;
use workload_client::{WorkloadClientTrait, WorkloadKind};

/// Suspends and resumes `apps/v1` StatefulSets.
pub struct StatefulSetAdapter {
    client: Arc<dyn WorkloadClientTrait>,
    page_size: u32,
}

impl StatefulSetAdapter {
    pub fn new(client: Arc<dyn WorkloadClientTrait>, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

#[async_trait::async_trait]
impl WorkloadAdapter for StatefulSetAdapter {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::StatefulSet
    }

    fn client(&self) -> &dyn WorkloadClientTrait {
        self.client.as_ref()
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }
}
