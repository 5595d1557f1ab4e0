//! Reconciliation logic.
//!
//! One call to [`Reconciler::suspend_all`] or [`Reconciler::resume_all`] is a
//! full pass over every in-scope workload of every enabled kind. Kinds are
//! processed in canonical order; within a kind, workloads are handled in list
//! order (or up to `concurrency` at a time). A failure on one workload, or a
//! failed list for one kind, is logged and counted but never stops the pass.

use crate::metrics::{ControllerMetrics, Outcome};
use crate::workload::{Transition, WorkloadAdapter, WorkloadRegistry};
use futures::StreamExt;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};
use workload_client::WorkloadKind;

/// Counts of what happened during one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub suspended: usize,
    pub resumed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PassSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn total(&self) -> usize {
        self.suspended + self.resumed + self.skipped + self.failed
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "suspended={} resumed={} skipped={} failed={}",
            self.suspended, self.resumed, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Suspend,
    Resume,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Suspend => write!(f, "suspend"),
            Action::Resume => write!(f, "resume"),
        }
    }
}

/// Shared accumulator; workloads may complete concurrently.
#[derive(Default)]
struct PassCounters {
    suspended: AtomicUsize,
    resumed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl PassCounters {
    fn add(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Suspended => &self.suspended,
            Outcome::Resumed => &self.resumed,
            Outcome::Skipped => &self.skipped,
            Outcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PassSummary {
        PassSummary {
            suspended: self.suspended.load(Ordering::Relaxed),
            resumed: self.resumed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Applies suspend or resume to every managed workload in scope.
pub struct Reconciler {
    registry: WorkloadRegistry,
    namespace: Option<String>,
    concurrency: usize,
    metrics: Option<Arc<ControllerMetrics>>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("namespace", &self.namespace)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// `namespace` of `None` means cluster-wide. `concurrency` is clamped to 1.
    pub fn new(registry: WorkloadRegistry, namespace: Option<String>, concurrency: usize) -> Self {
        Self {
            registry,
            namespace,
            concurrency: concurrency.max(1),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ControllerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn kinds(&self) -> Vec<WorkloadKind> {
        self.registry.kinds()
    }

    /// Scales every running workload in scope to zero, saving its scale.
    pub async fn suspend_all(&self) -> PassSummary {
        self.apply(Action::Suspend).await
    }

    /// Restores every workload this controller suspended.
    pub async fn resume_all(&self) -> PassSummary {
        self.apply(Action::Resume).await
    }

    async fn apply(&self, action: Action) -> PassSummary {
        let counters = PassCounters::default();
        for adapter in self.registry.adapters() {
            self.apply_kind(adapter.as_ref(), action, &counters).await;
        }

        let summary = counters.snapshot();
        info!(%action, %summary, total = summary.total(), "Pass finished");
        summary
    }

    async fn apply_kind(&self, adapter: &dyn WorkloadAdapter, action: Action, counters: &PassCounters) {
        let kind = adapter.kind();
        debug!(%kind, %action, "Processing kind");

        adapter
            .list(self.namespace.as_deref())
            .for_each_concurrent(self.concurrency, |item| async move {
                let resource = match item {
                    Ok(resource) => resource,
                    Err(e) => {
                        error!(%kind, "Failed to list workloads: {}", e);
                        self.record(counters, kind, Outcome::Failed);
                        return;
                    }
                };

                let result = match action {
                    Action::Suspend => adapter.suspend(&resource).await,
                    Action::Resume => adapter.resume(&resource).await,
                };
                let outcome = match result {
                    Ok(Transition::Suspended { .. }) => Outcome::Suspended,
                    Ok(Transition::Resumed { .. }) => Outcome::Resumed,
                    Ok(Transition::Skipped(_)) => Outcome::Skipped,
                    Err(e) => {
                        error!(%resource, "Failed to {}: {}", action, e);
                        Outcome::Failed
                    }
                };
                self.record(counters, kind, outcome);
            })
            .await;
    }

    fn record(&self, counters: &PassCounters, kind: WorkloadKind, outcome: Outcome) {
        counters.add(outcome);
        if let Some(metrics) = &self.metrics {
            metrics.record_workload(kind, outcome);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_with, registry_for, running, stored, suspended};
    use crate::workload::SAVED_SCALE_ANNOTATION;
    use workload_client::{MockCall, MockOperation, MockWorkloadClient};

    const NS: &str = "shop";

    fn reconciler(mock: &MockWorkloadClient, concurrency: usize) -> Reconciler {
        Reconciler::new(registry_for(mock, 2), None, concurrency)
    }

    #[tokio::test]
    async fn test_suspend_all_counts_outcomes() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, NS, "web", 3),
            running(WorkloadKind::Deployment, NS, "batch", 0),
            running(WorkloadKind::StatefulSet, NS, "db", 1),
        ]);

        let summary = reconciler(&mock, 1).suspend_all().await;
        assert_eq!(
            summary,
            PassSummary {
                suspended: 2,
                skipped: 1,
                ..Default::default()
            }
        );
        assert_eq!(stored(&mock, WorkloadKind::StatefulSet, NS, "db").saved_scale, Some(1));
        // Scaled down by its owner: no marker written
        assert!(stored(&mock, WorkloadKind::Deployment, NS, "batch").marker().is_none());
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, NS, "first", 3),
            running(WorkloadKind::Deployment, NS, "second", 3),
            running(WorkloadKind::Deployment, NS, "third", 3),
        ]);
        mock.fail_on(MockOperation::PatchScale, WorkloadKind::Deployment, NS, "second");

        let summary = reconciler(&mock, 1).suspend_all().await;
        assert_eq!(summary.suspended, 2);
        assert_eq!(summary.failed, 1);
        assert!(summary.has_failures());

        for name in ["first", "third"] {
            let resource = stored(&mock, WorkloadKind::Deployment, NS, name);
            assert_eq!(resource.current_scale, 0);
            assert_eq!(resource.saved_scale, Some(3));
        }
        assert_eq!(stored(&mock, WorkloadKind::Deployment, NS, "second").current_scale, 3);
    }

    #[tokio::test]
    async fn test_failed_workload_is_retried_next_pass() {
        let mock = mock_with(vec![running(WorkloadKind::Deployment, NS, "web", 2)]);
        mock.fail_on(MockOperation::PatchScale, WorkloadKind::Deployment, NS, "web");
        let reconciler = reconciler(&mock, 1);

        assert_eq!(reconciler.suspend_all().await.failed, 1);
        mock.clear_failures();
        assert_eq!(reconciler.suspend_all().await.suspended, 1);
        assert_eq!(stored(&mock, WorkloadKind::Deployment, NS, "web").saved_scale, Some(2));
    }

    #[tokio::test]
    async fn test_list_failure_does_not_block_other_kinds() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, NS, "web", 1),
            running(WorkloadKind::StatefulSet, NS, "db", 2),
        ]);
        mock.fail_list(WorkloadKind::Deployment);

        let summary = reconciler(&mock, 1).suspend_all().await;
        assert_eq!(
            summary,
            PassSummary {
                suspended: 1,
                failed: 1,
                ..Default::default()
            }
        );
        assert_eq!(stored(&mock, WorkloadKind::StatefulSet, NS, "db").current_scale, 0);
        assert_eq!(stored(&mock, WorkloadKind::Deployment, NS, "web").current_scale, 1);
    }

    #[tokio::test]
    async fn test_resume_all_skips_workloads_it_does_not_own() {
        let mock = mock_with(vec![
            suspended(WorkloadKind::Deployment, NS, "web", 3),
            running(WorkloadKind::Deployment, NS, "parked", 0),
            running(WorkloadKind::StatefulSet, NS, "db", 1),
        ]);

        let summary = reconciler(&mock, 1).resume_all().await;
        assert_eq!(
            summary,
            PassSummary {
                resumed: 1,
                skipped: 2,
                ..Default::default()
            }
        );
        assert_eq!(stored(&mock, WorkloadKind::Deployment, NS, "parked").current_scale, 0);
        let web = mock.workload(WorkloadKind::Deployment, NS, "web").unwrap();
        assert_eq!(web.replicas, 3);
        assert!(web.annotation(SAVED_SCALE_ANNOTATION).is_none());
    }

    #[tokio::test]
    async fn test_sequential_pass_follows_list_order() {
        let mock = mock_with(vec![
            running(WorkloadKind::StatefulSet, NS, "db", 1),
            running(WorkloadKind::Deployment, NS, "zeta", 1),
            running(WorkloadKind::Deployment, NS, "alpha", 1),
        ]);

        reconciler(&mock, 1).suspend_all().await;

        let scaled: Vec<String> = mock
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::PatchScale { name, .. } => Some(name),
                _ => None,
            })
            .collect();
        // Deployments first, each kind in list order
        assert_eq!(scaled, vec!["zeta", "alpha", "db"]);
    }

    #[tokio::test]
    async fn test_concurrent_pass_reaches_same_state() {
        let workloads = (0..9)
            .map(|i| running(WorkloadKind::Deployment, NS, &format!("web-{}", i), i + 1))
            .collect();
        let mock = mock_with(workloads);

        let summary = reconciler(&mock, 4).suspend_all().await;
        assert_eq!(summary.suspended, 9);
        assert_eq!(summary.total(), 9);

        for i in 0..9u32 {
            let resource = stored(&mock, WorkloadKind::Deployment, NS, &format!("web-{}", i));
            assert_eq!(resource.current_scale, 0);
            assert_eq!(resource.saved_scale, Some(i + 1));
        }
    }

    #[tokio::test]
    async fn test_namespace_scope_limits_pass() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, NS, "web", 1),
            running(WorkloadKind::Deployment, "kube-system", "dns", 2),
        ]);
        let reconciler = Reconciler::new(registry_for(&mock, 10), Some(NS.to_string()), 1);

        assert_eq!(reconciler.suspend_all().await.suspended, 1);
        assert_eq!(stored(&mock, WorkloadKind::Deployment, "kube-system", "dns").current_scale, 2);
    }

    #[tokio::test]
    async fn test_outcomes_recorded_in_metrics() {
        let mock = mock_with(vec![running(WorkloadKind::Deployment, NS, "web", 1)]);
        let metrics = Arc::new(ControllerMetrics::new().unwrap());
        let reconciler = reconciler(&mock, 1).with_metrics(metrics.clone());

        reconciler.suspend_all().await;
        let body = String::from_utf8(metrics.encode().unwrap()).unwrap();
        assert!(body.contains(r#"tarnfui_workloads_total{kind="Deployment",outcome="suspended"} 1"#));
    }

    #[tokio::test]
    async fn test_empty_cluster_pass() {
        let mock = MockWorkloadClient::new();
        let summary = reconciler(&mock, 1).resume_all().await;
        assert_eq!(summary, PassSummary::default());
        assert_eq!(mock.list_calls(), 2);
    }
}
