//! Pod Label Controller
//!
//! Keeps the `padok.fr/pod-name` label on every Pod in sync with the
//! `padok.fr/add-pod-name-label` annotation: annotated Pods carry the label
//! with their own name as value, all other Pods do not carry it.
//!
//! Reconciliation is level-triggered. Pod events only schedule the Pod;
//! the reconciler re-reads it, computes the desired label and writes it back
//! with an optimistic-concurrency guard. Conflicts and failures are requeued
//! with per-cause backoff.

mod backoff;
mod config;
mod controller;
mod error;
mod labels;
mod reconciler;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Pod Label Controller");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    // Load configuration from environment variables
    let config = ControllerConfig::from_env()?;

    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Workers: {}", config.workers);
    info!("  Request timeout: {:?}", config.request_timeout);
    match config.resync_interval {
        Some(interval) => info!("  Resync interval: {:?}", interval),
        None => info!("  Resync interval: disabled"),
    }
    info!("  Error escalation threshold: {}", config.error_escalation_threshold);

    // Initialize and run controller
    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
