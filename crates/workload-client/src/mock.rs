//! Mock WorkloadClient for unit testing
//!
//! Stores workloads in memory, in insertion order, and records every mutating
//! call so tests can assert on both the end state and the order of API calls.
//! Individual operations can be made to fail for a given resource.

use crate::error::WorkloadError;
use crate::models::*;
use crate::workload_trait::WorkloadClientTrait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    Get,
    PatchScale,
    PatchAnnotation,
    EmitEvent,
}

/// A mutating call observed by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    PatchScale {
        kind: WorkloadKind,
        namespace: String,
        name: String,
        replicas: i32,
    },
    PatchAnnotation {
        kind: WorkloadKind,
        namespace: String,
        name: String,
        key: String,
        value: Option<String>,
    },
}

/// An event published through the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub reason: String,
    pub message: String,
}

type FailureKey = (MockOperation, WorkloadKind, String, String);

/// Mock WorkloadClient for testing
#[derive(Debug, Clone, Default)]
pub struct MockWorkloadClient {
    workloads: Arc<Mutex<Vec<Workload>>>,
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    failures: Arc<Mutex<HashSet<FailureKey>>>,
    list_failures: Arc<Mutex<HashSet<WorkloadKind>>>,
    list_calls: Arc<Mutex<usize>>,
}

impl MockWorkloadClient {
    /// Create an empty mock client
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a workload in the mock store (for test setup)
    pub fn add_workload(&self, workload: Workload) {
        let mut workloads = self.workloads.lock().unwrap();
        match workloads
            .iter_mut()
            .find(|w| w.kind == workload.kind && w.namespace == workload.namespace && w.name == workload.name)
        {
            Some(existing) => *existing = workload,
            None => workloads.push(workload),
        }
    }

    /// Remove a workload, simulating deletion mid-pass
    pub fn remove_workload(&self, kind: WorkloadKind, namespace: &str, name: &str) {
        self.workloads
            .lock()
            .unwrap()
            .retain(|w| !(w.kind == kind && w.namespace == namespace && w.name == name));
    }

    /// Current stored state of a workload
    pub fn workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Option<Workload> {
        self.workloads
            .lock()
            .unwrap()
            .iter()
            .find(|w| w.kind == kind && w.namespace == namespace && w.name == name)
            .cloned()
    }

    /// Make `operation` fail for one resource
    pub fn fail_on(&self, operation: MockOperation, kind: WorkloadKind, namespace: &str, name: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((operation, kind, namespace.to_string(), name.to_string()));
    }

    /// Make every list call for `kind` fail
    pub fn fail_list(&self, kind: WorkloadKind) {
        self.list_failures.lock().unwrap().insert(kind);
    }

    /// Clear all injected failures
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
        self.list_failures.lock().unwrap().clear();
    }

    /// Events published so far
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Mutating calls observed so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of `list_page` calls served
    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    fn check_failure(
        &self,
        operation: MockOperation,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
    ) -> Result<(), WorkloadError> {
        let key = (operation, kind, namespace.to_string(), name.to_string());
        if self.failures.lock().unwrap().contains(&key) {
            return Err(WorkloadError::Api(format!(
                "injected {:?} failure for {} {}/{}",
                operation, kind, namespace, name
            )));
        }
        Ok(())
    }

    fn update<F>(&self, kind: WorkloadKind, namespace: &str, name: &str, f: F) -> Result<(), WorkloadError>
    where
        F: FnOnce(&mut Workload),
    {
        let mut workloads = self.workloads.lock().unwrap();
        let workload = workloads
            .iter_mut()
            .find(|w| w.kind == kind && w.namespace == namespace && w.name == name)
            .ok_or_else(|| WorkloadError::NotFound(format!("{} {}/{}", kind, namespace, name)))?;
        f(workload);
        Ok(())
    }
}

#[async_trait::async_trait]
impl WorkloadClientTrait for MockWorkloadClient {
    async fn list_page(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<WorkloadPage, WorkloadError> {
        *self.list_calls.lock().unwrap() += 1;
        if self.list_failures.lock().unwrap().contains(&kind) {
            return Err(WorkloadError::Api(format!("injected list failure for {}", kind)));
        }

        let offset = match continue_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| WorkloadError::Api(format!("invalid continue token: {}", token)))?,
            None => 0,
        };
        let limit = limit.max(1) as usize;

        let matching: Vec<Workload> = self
            .workloads
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.kind == kind && namespace.is_none_or(|ns| w.namespace == ns))
            .cloned()
            .collect();

        let items: Vec<Workload> = matching.iter().skip(offset).take(limit).cloned().collect();
        let next = offset + items.len();
        let continue_token = (next < matching.len()).then(|| next.to_string());

        Ok(WorkloadPage { items, continue_token })
    }

    async fn get(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, WorkloadError> {
        self.check_failure(MockOperation::Get, kind, namespace, name)?;
        self.workload(kind, namespace, name)
            .ok_or_else(|| WorkloadError::NotFound(format!("{} {}/{}", kind, namespace, name)))
    }

    async fn patch_scale(&self, kind: WorkloadKind, namespace: &str, name: &str, replicas: i32) -> Result<(), WorkloadError> {
        self.check_failure(MockOperation::PatchScale, kind, namespace, name)?;
        self.update(kind, namespace, name, |w| w.replicas = replicas)?;
        self.calls.lock().unwrap().push(MockCall::PatchScale {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            replicas,
        });
        Ok(())
    }

    async fn patch_annotation(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        name: &str,
        key: &str,
        value: Option<&str>,
    ) -> Result<(), WorkloadError> {
        self.check_failure(MockOperation::PatchAnnotation, kind, namespace, name)?;
        self.update(kind, namespace, name, |w| match value {
            Some(v) => {
                w.annotations.insert(key.to_string(), v.to_string());
            }
            None => {
                w.annotations.remove(key);
            }
        })?;
        self.calls.lock().unwrap().push(MockCall::PatchAnnotation {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
            value: value.map(str::to_string),
        });
        Ok(())
    }

    async fn emit_event(&self, workload: &Workload, reason: &str, message: &str) -> Result<(), WorkloadError> {
        self.check_failure(MockOperation::EmitEvent, workload.kind, &workload.namespace, &workload.name)?;
        self.events.lock().unwrap().push(RecordedEvent {
            kind: workload.kind,
            namespace: workload.namespace.clone(),
            name: workload.name.clone(),
            reason: reason.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
