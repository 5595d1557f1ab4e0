//! Deployment adapter.

use super::WorkloadAdapter;
use std::sync::Arc;
use workload_client::{WorkloadClientTrait, WorkloadKind};

/// Suspends and resumes `apps/v1` Deployments.
pub struct DeploymentAdapter {
    client: Arc<dyn WorkloadClientTrait>,
    page_size: u32,
}

impl DeploymentAdapter {
    pub fn new(client: Arc<dyn WorkloadClientTrait>, page_size: u32) -> Self {
        Self { client, page_size }
    }
}

#[async_trait::async_trait]
impl WorkloadAdapter for DeploymentAdapter {
    fn kind(&self) -> WorkloadKind {
        WorkloadKind::Deployment
    }

    fn client(&self) -> &dyn WorkloadClientTrait {
        self.client.as_ref()
    }

    fn page_size(&self) -> u32 {
        self.page_size
    }
}
