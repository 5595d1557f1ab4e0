//! Test utilities for unit testing adapters, the reconciler and the scheduler
//!
//! This module provides helpers for creating test workloads and wiring them
//! to a [`MockWorkloadClient`].

#[cfg(test)]
use crate::scheduler::Clock;
#[cfg(test)]
use crate::workload::{ManagedResource, WorkloadRegistry, SAVED_SCALE_ANNOTATION};
#[cfg(test)]
use chrono::{DateTime, Utc};
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use workload_client::{MockWorkloadClient, Workload, WorkloadClientTrait, WorkloadKind};

/// Helper to create a running workload
#[cfg(test)]
pub fn running(kind: WorkloadKind, namespace: &str, name: &str, replicas: i32) -> Workload {
    Workload::new(kind, namespace, name, replicas)
}

/// Helper to create a workload this controller suspended, remembering `saved` replicas
#[cfg(test)]
pub fn suspended(kind: WorkloadKind, namespace: &str, name: &str, saved: u32) -> Workload {
    Workload::new(kind, namespace, name, 0).with_annotation(SAVED_SCALE_ANNOTATION, saved.to_string())
}

/// Helper to create a mock client seeded with workloads
#[cfg(test)]
pub fn mock_with(workloads: Vec<Workload>) -> MockWorkloadClient {
    let mock = MockWorkloadClient::new();
    for workload in workloads {
        mock.add_workload(workload);
    }
    mock
}

/// Helper to build a registry for every kind on top of a mock
#[cfg(test)]
pub fn registry_for(mock: &MockWorkloadClient, page_size: u32) -> WorkloadRegistry {
    let client: Arc<dyn WorkloadClientTrait> = Arc::new(mock.clone());
    WorkloadRegistry::new(&WorkloadKind::ALL, client, page_size)
}

/// Helper to read the stored state of a workload back as a managed resource
#[cfg(test)]
pub fn stored(mock: &MockWorkloadClient, kind: WorkloadKind, namespace: &str, name: &str) -> ManagedResource {
    let workload = mock
        .workload(kind, namespace, name)
        .unwrap_or_else(|| panic!("{} {}/{} not in mock", kind, namespace, name));
    ManagedResource::from_workload(workload)
}

/// Clock frozen at a settable instant
#[cfg(test)]
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
