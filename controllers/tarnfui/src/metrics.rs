//! Prometheus metrics and the probe/metrics HTTP server.
//!
//! The server is only started in continuous mode and exposes:
//! - `/metrics`: text exposition of the controller registry
//! - `/healthz`: 200 while the process is serving
//! - `/readyz`: 200 once the first pass has completed, 503 before

use crate::error::ControllerError;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use workload_client::WorkloadKind;

/// Outcome label for one workload in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Suspended,
    Resumed,
    Skipped,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Suspended => "suspended",
            Outcome::Resumed => "resumed",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        }
    }
}

/// Metrics owned by the controller, registered on a private registry.
#[derive(Debug)]
pub struct ControllerMetrics {
    registry: Registry,
    workloads_total: IntCounterVec,
    passes_total: IntCounterVec,
    active: IntGauge,
    pass_duration_seconds: Histogram,
    ready: AtomicBool,
}

impl ControllerMetrics {
    pub fn new() -> Result<Self, ControllerError> {
        let registry = Registry::new();

        let workloads_total = IntCounterVec::new(
            Opts::new("tarnfui_workloads_total", "Workloads processed, by kind and outcome."),
            &["kind", "outcome"],
        )?;
        let passes_total = IntCounterVec::new(
            Opts::new("tarnfui_passes_total", "Completed reconciliation passes, by desired state."),
            &["state"],
        )?;
        let active = IntGauge::new("tarnfui_active", "1 when the last pass evaluated the window as active.")?;
        let pass_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("tarnfui_pass_duration_seconds", "Duration of a reconciliation pass.")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(workloads_total.clone()))?;
        registry.register(Box::new(passes_total.clone()))?;
        registry.register(Box::new(active.clone()))?;
        registry.register(Box::new(pass_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            workloads_total,
            passes_total,
            active,
            pass_duration_seconds,
            ready: AtomicBool::new(false),
        })
    }

    pub fn record_workload(&self, kind: WorkloadKind, outcome: Outcome) {
        self.workloads_total
            .with_label_values(&[kind.as_str(), outcome.as_str()])
            .inc();
    }

    /// Records a completed pass and marks the controller ready.
    pub fn record_pass(&self, active: bool, duration: Duration) {
        let state = if active { "active" } else { "inactive" };
        self.passes_total.with_label_values(&[state]).inc();
        self.active.set(i64::from(active));
        self.pass_duration_seconds.observe(duration.as_secs_f64());
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Encodes the registry in the Prometheus text format.
    pub fn encode(&self) -> Result<Vec<u8>, ControllerError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(metrics): State<Arc<ControllerMetrics>>) -> impl IntoResponse {
    if metrics.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "waiting for first pass")
    }
}

async fn metrics_handler(State(metrics): State<Arc<ControllerMetrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// Create the probe/metrics router
pub fn router(metrics: Arc<ControllerMetrics>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

/// Serves the router until `shutdown` flips to true.
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<ControllerMetrics>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Serving metrics and probes");

    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;
    Ok(())
}
