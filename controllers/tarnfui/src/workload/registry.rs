//! Maps enabled workload kinds to their adapters.

use super::{DeploymentAdapter, StatefulSetAdapter, WorkloadAdapter};
use std::collections::BTreeSet;
use std::sync::Arc;
use workload_client::{WorkloadClientTrait, WorkloadKind};

/// Adapters for the enabled kinds, in canonical kind order.
pub struct WorkloadRegistry {
    adapters: Vec<Box<dyn WorkloadAdapter>>,
}

impl WorkloadRegistry {
    /// Builds one adapter per distinct kind. Duplicates are ignored.
    pub fn new(kinds: &[WorkloadKind], client: Arc<dyn WorkloadClientTrait>, page_size: u32) -> Self {
        let kinds: BTreeSet<WorkloadKind> = kinds.iter().copied().collect();
        let adapters = kinds
            .into_iter()
            .map(|kind| -> Box<dyn WorkloadAdapter> {
                match kind {
                    WorkloadKind::Deployment => Box::new(DeploymentAdapter::new(client.clone(), page_size)),
                    WorkloadKind::StatefulSet => Box::new(StatefulSetAdapter::new(client.clone(), page_size)),
                }
            })
            .collect();
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Box<dyn WorkloadAdapter>] {
        &self.adapters
    }

    pub fn kinds(&self) -> Vec<WorkloadKind> {
        self.adapters.iter().map(|a| a.kind()).collect()
    }
}

impl std::fmt::Debug for WorkloadRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadRegistry").field("kinds", &self.kinds()).finish()
    }
}
