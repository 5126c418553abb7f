//! Kubernetes resource watchers.
//!
//! This module watches Pods and triggers reconciliation using
//! `kube_runtime::Controller`, which:
//! - collapses repeated notifications for a Pod into one pending request
//! - never reconciles the same Pod twice at once
//! - limits how many Pods are reconciled in parallel
//! - applies the requeue delays returned by `error_policy`
//! - reconnects the watch with backoff
//! - stops on SIGINT or SIGTERM, letting in-flight reconciliations finish

use crate::config::ControllerConfig;
use crate::controller::{error_policy, reconcile, Context};
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube_runtime::controller::{self, Config};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Watches Pods and reconciles them until a shutdown signal arrives.
pub async fn watch_pods(api: Api<Pod>, ctx: Arc<Context>, config: &ControllerConfig) {
    info!("Starting Pod watcher with {} workers", config.workers);

    let controller_config = Config::default().concurrency(config.workers);
    let mut pods = Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .shutdown_on_signal();

    if let Some(interval) = config.resync_interval {
        info!("Resyncing all Pods every {:?}", interval);
        pods = pods.reconcile_all_on(resync_ticks(interval));
    }

    pods.run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((pod, _action)) => debug!("Reconciled {}", pod),
                // Already logged and requeued by `error_policy`
                Err(controller::Error::ReconcilerFailed(err, pod)) => {
                    debug!("Requeued {}: {}", pod, err);
                }
                Err(e) => warn!("Pod controller error: {}", e),
            }
        })
        .await;

    info!("Pod watcher stopped");
}

/// Emits once every `interval`, starting one interval from now.
///
/// The watcher's initial list already covers startup, so there is no
/// immediate tick.
pub fn resync_ticks(interval: Duration) -> impl Stream<Item = ()> + Send + Sync + 'static {
    futures::stream::unfold((), move |()| async move {
        tokio::time::sleep(interval).await;
        Some(((), ()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_resync_ticks_after_each_interval() {
        let start = Instant::now();
        let mut ticks = Box::pin(resync_ticks(Duration::from_secs(30)));

        // Nothing on startup
        assert!(
            tokio::time::timeout(Duration::from_secs(29), ticks.next())
                .await
                .is_err()
        );

        assert_eq!(ticks.next().await, Some(()));
        assert!(start.elapsed() >= Duration::from_secs(30));

        assert_eq!(ticks.next().await, Some(()));
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_ticks_never_end() {
        let ticks = resync_ticks(Duration::from_secs(1));
        assert_eq!(ticks.take(100).count().await, 100);
    }
}
