//! Reconciliation scheduler.
//!
//! Drives passes either once or forever on a fixed interval. The state
//! machine is `Idle -> Evaluating -> Applying -> Idle`, with `Stopped`
//! reached only when a continuous run is cancelled. Cancellation is observed
//! only while sleeping between passes, so a pass always runs to completion.

use crate::config::ScheduleConfig;
use crate::metrics::ControllerMetrics;
use crate::reconciler::{PassSummary, Reconciler};
use crate::schedule::is_active;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Evaluating,
    Applying,
    Stopped,
}

/// Ties the schedule evaluator to the reconciler.
pub struct Scheduler {
    schedule: ScheduleConfig,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    state: watch::Sender<SchedulerState>,
    passes: AtomicU64,
    metrics: Option<Arc<ControllerMetrics>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("schedule", &self.schedule)
            .field("reconciler", &self.reconciler)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(schedule: ScheduleConfig, reconciler: Reconciler, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            schedule,
            reconciler,
            clock,
            state,
            passes: AtomicU64::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ControllerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Number of passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Evaluates the window once and applies the matching transition to
    /// every workload in scope.
    pub async fn reconcile_once(&self) -> PassSummary {
        let pass = self.passes.fetch_add(1, Ordering::Relaxed) + 1;

        self.state.send_replace(SchedulerState::Evaluating);
        let now = self.clock.now();
        let active = is_active(&now, &self.schedule);
        let desired = if active { "active" } else { "inactive" };

        let span = info_span!("pass", pass, desired);
        let summary = async {
            info!(%now, timezone = %self.schedule.timezone, "Starting reconciliation pass");
            self.state.send_replace(SchedulerState::Applying);

            let started = Instant::now();
            let summary = if active {
                self.reconciler.resume_all().await
            } else {
                self.reconciler.suspend_all().await
            };
            if let Some(metrics) = &self.metrics {
                metrics.record_pass(active, started.elapsed());
            }
            summary
        }
        .instrument(span)
        .await;

        self.state.send_replace(SchedulerState::Idle);
        summary
    }

    /// Runs passes every `reconciliation_interval` until `shutdown` is true.
    ///
    /// The interval is measured from the end of one pass to the start of the
    /// next. A dropped sender counts as a shutdown request.
    pub async fn run_forever(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.schedule.reconciliation_interval;
        info!(
            interval_secs = interval.as_secs(),
            kinds = ?self.reconciler.kinds(),
            "Scheduler running"
        );

        while !*shutdown.borrow() {
            let summary = self.reconcile_once().await;
            if summary.has_failures() {
                warn!(failed = summary.failed, "Pass had failures, retrying next interval");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.wait_for(|stop| *stop) => break,
            }
        }

        self.state.send_replace(SchedulerState::Stopped);
        info!(passes = self.passes(), "Scheduler stopped");
    }
}
