//! Tarnfui Controller
//!
//! Scales Deployments and StatefulSets to zero outside configured active
//! hours and restores their previous replica count when the window opens
//! again. The replica count is remembered in an annotation on each workload,
//! so the controller keeps no state of its own and can restart at any time.

mod config;
mod controller;
mod error;
mod metrics;
mod reconciler;
mod schedule;
mod scheduler;
mod workload;

#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::{ControllerArgs, ControllerConfig};
use controller::Controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = ControllerArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())))
        .init();

    // kube's rustls transport needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Tarnfui Controller");

    let config = ControllerConfig::try_from(args).context("invalid configuration")?;
    let schedule = &config.schedule;

    info!("Configuration:");
    info!(
        "  Active window: {}-{} on {:?} ({})",
        schedule.startup_time.format("%H:%M"),
        schedule.shutdown_time.format("%H:%M"),
        schedule.active_days,
        schedule.timezone
    );
    info!("  Namespace: {}", schedule.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Resource types: {:?}", schedule.enabled_kinds);
    info!("  Interval: {}s", schedule.reconciliation_interval.as_secs());
    info!("  Mode: {}", if config.reconcile_once { "single pass" } else { "continuous" });

    let controller = Controller::new(config).await.context("failed to initialize controller")?;
    controller.run().await?;

    Ok(())
}
