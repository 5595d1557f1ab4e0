//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the workload
//! client, adapter registry, reconciler and scheduler together and runs them
//! either for a single pass or until the process is told to stop.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::{self, ControllerMetrics};
use crate::reconciler::{PassSummary, Reconciler};
use crate::scheduler::{Clock, Scheduler, SystemClock};
use crate::workload::WorkloadRegistry;
use kube::Client;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use workload_client::{KubeWorkloadClient, WorkloadClientTrait};

/// Main controller for scale-to-zero scheduling.
pub struct Controller {
    config: ControllerConfig,
    scheduler: Scheduler,
    metrics: Arc<ControllerMetrics>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a new controller instance backed by the cluster from the
    /// ambient kubeconfig or in-cluster service account.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Tarnfui Controller");

        let kube_client = Client::try_default().await?;
        let client: Arc<dyn WorkloadClientTrait> =
            Arc::new(KubeWorkloadClient::new(kube_client, config.reporting_instance.clone()));

        Self::with_client(config, client, Arc::new(SystemClock))
    }

    /// Creates a controller on top of an existing workload client.
    pub fn with_client(
        config: ControllerConfig,
        client: Arc<dyn WorkloadClientTrait>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ControllerError> {
        let metrics = Arc::new(ControllerMetrics::new()?);

        let registry = WorkloadRegistry::new(&config.schedule.enabled_kinds, client, config.page_size);
        let reconciler = Reconciler::new(registry, config.schedule.namespace.clone(), config.pass_concurrency)
            .with_metrics(metrics.clone());
        let scheduler = Scheduler::new(config.schedule.clone(), reconciler, clock).with_metrics(metrics.clone());

        Ok(Self {
            config,
            scheduler,
            metrics,
        })
    }

    /// Runs exactly one pass. Fails if any workload operation failed.
    pub async fn run_once(&self) -> Result<PassSummary, ControllerError> {
        let summary = self.scheduler.reconcile_once().await;
        info!(%summary, "Single reconciliation pass complete");
        if summary.has_failures() {
            return Err(ControllerError::Reconciliation(format!(
                "{} workload operation(s) failed",
                summary.failed
            )));
        }
        Ok(summary)
    }

    /// Runs passes until SIGINT or SIGTERM. An in-flight pass always finishes
    /// before the controller stops.
    pub async fn run_forever(&self) -> Result<(), ControllerError> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let signals = ShutdownSignals::install()?;

        let server = self.config.metrics_addr.map(|addr| {
            let metrics = self.metrics.clone();
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                if let Err(e) = metrics::serve(addr, metrics, shutdown).await {
                    error!("Metrics server failed: {}", e);
                }
            })
        });

        let signal_task = tokio::spawn(async move {
            signals.recv().await;
            let _ = shutdown_tx.send(true);
        });

        self.scheduler.run_forever(shutdown_rx).await;

        signal_task.abort();
        if let Some(server) = server {
            if let Err(e) = server.await {
                warn!("Metrics server task ended abnormally: {}", e);
            }
        }
        info!("Tarnfui Controller stopped");
        Ok(())
    }

    /// Runs in the mode selected by configuration.
    pub async fn run(&self) -> Result<(), ControllerError> {
        if self.config.reconcile_once {
            self.run_once().await.map(|_| ())
        } else {
            self.run_forever().await
        }
    }
}

/// Process termination signals, registered before the first pass.
struct ShutdownSignals {
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self, ControllerError> {
        Ok(Self {
            #[cfg(unix)]
            terminate: tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?,
        })
    }

    #[cfg(unix)]
    async fn recv(mut self) {
        let interrupted = tokio::select! {
            result = tokio::signal::ctrl_c() => Some(result),
            _ = self.terminate.recv() => None,
        };
        match interrupted {
            Some(Ok(())) => info!("Received SIGINT, stopping after the current pass"),
            Some(Err(e)) => {
                warn!("Ctrl+C handler unavailable ({}), waiting for SIGTERM", e);
                self.terminate.recv().await;
                info!("Received SIGTERM, stopping after the current pass");
            }
            None => info!("Received SIGTERM, stopping after the current pass"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, stopping after the current pass"),
            Err(e) => {
                warn!("Ctrl+C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScheduleConfig;
    use crate::test_utils::{mock_with, running, stored, FixedClock};
    use chrono::{TimeZone, Utc};
    use workload_client::{MockOperation, MockWorkloadClient, WorkloadKind};

    fn config(reconcile_once: bool) -> ControllerConfig {
        ControllerConfig {
            schedule: ScheduleConfig::default(),
            page_size: 50,
            pass_concurrency: 1,
            reconcile_once,
            metrics_addr: None,
            reporting_instance: None,
        }
    }

    fn saturday() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2023, 1, 7, 10, 0, 0).unwrap()))
    }

    fn controller(mock: &MockWorkloadClient, config: ControllerConfig) -> Controller {
        Controller::with_client(config, Arc::new(mock.clone()), saturday()).unwrap()
    }

    #[tokio::test]
    async fn test_run_once_succeeds_without_failures() {
        let mock = mock_with(vec![running(WorkloadKind::Deployment, "default", "web", 2)]);
        let controller = controller(&mock, config(true));

        controller.run().await.unwrap();
        assert_eq!(stored(&mock, WorkloadKind::Deployment, "default", "web").current_scale, 0);
        assert!(controller.metrics.is_ready());
    }

    #[tokio::test]
    async fn test_run_once_reports_failures() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, "default", "web", 2),
            running(WorkloadKind::StatefulSet, "default", "db", 1),
        ]);
        mock.fail_on(MockOperation::PatchScale, WorkloadKind::Deployment, "default", "web");
        let controller = controller(&mock, config(true));

        let err = controller.run_once().await.unwrap_err();
        assert!(matches!(err, ControllerError::Reconciliation(_)));
        // The other workload was still handled
        assert_eq!(stored(&mock, WorkloadKind::StatefulSet, "default", "db").current_scale, 0);
    }

    #[tokio::test]
    async fn test_only_enabled_kinds_are_touched() {
        let mock = mock_with(vec![
            running(WorkloadKind::Deployment, "default", "web", 2),
            running(WorkloadKind::StatefulSet, "default", "db", 1),
        ]);
        let mut config = config(true);
        config.schedule.enabled_kinds = vec![WorkloadKind::StatefulSet];
        let controller = controller(&mock, config);

        controller.run_once().await.unwrap();
        assert_eq!(stored(&mock, WorkloadKind::Deployment, "default", "web").current_scale, 2);
        assert_eq!(stored(&mock, WorkloadKind::StatefulSet, "default", "db").current_scale, 0);
    }
}
