//! Main controller implementation.
//!
//! This module contains the `Controller` struct that builds the Kubernetes
//! client and pod store, and the `reconcile` / `error_policy` pair that the
//! `kube_runtime` controller drives for every Pod.

use crate::backoff::{RequeueCause, Retry, RetryTracker};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, ReconcileError};
use crate::reconciler::{Outcome, Reconciler};
use crate::watcher::watch_pods;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};
use kube_runtime::controller::Action;
use pod_store::{KubePodStore, PodKey};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconciliation.
#[derive(Debug)]
pub struct Context {
    reconciler: Reconciler,
    retries: RetryTracker,
}

impl Context {
    /// Creates a context from a reconciler and its retry bookkeeping.
    pub fn new(reconciler: Reconciler, retries: RetryTracker) -> Self {
        Self {
            reconciler,
            retries,
        }
    }
}

/// Reconcile one Pod.
///
/// The Pod delivered by the watcher only identifies what to reconcile; the
/// reconciler re-reads it. Terminal outcomes wait for the next change.
/// Conflicts and failures are returned as errors so `error_policy` requeues
/// them.
pub async fn reconcile(pod: Arc<Pod>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let Some(key) = PodKey::from_pod(&pod) else {
        warn!("Skipping Pod without a name");
        return Ok(Action::await_change());
    };

    let outcome = ctx.reconciler.reconcile(&key).await;
    settle(&ctx, key, outcome)
}

/// Map an outcome to the controller's next action.
fn settle(ctx: &Context, key: PodKey, outcome: Outcome) -> Result<Action, ReconcileError> {
    match outcome {
        Outcome::Unchanged | Outcome::Applied | Outcome::NotFound => {
            let retries = ctx.retries.reset(&key);
            if retries > 0 {
                info!("Pod {} reconciled ({:?}) after {} retries", key, outcome, retries);
            }
            Ok(Action::await_change())
        }
        Outcome::Conflict => Err(ReconcileError::Conflict(key)),
        Outcome::Error(message) => Err(ReconcileError::Failed { key, message }),
    }
}

/// Requeue a failed Pod.
///
/// Conflicts come back quickly, errors back off exponentially. Errors past
/// the escalation threshold are reported as a stuck Pod, but retrying never
/// stops.
pub fn error_policy(_pod: Arc<Pod>, error: &ReconcileError, ctx: Arc<Context>) -> Action {
    let retry = ctx.retries.record(error.key(), error.cause());
    log_retry(error, &retry);
    Action::requeue(retry.delay)
}

fn log_retry(error: &ReconcileError, retry: &Retry) {
    let key = error.key();
    match error.cause() {
        RequeueCause::Conflict => {
            debug!("Conflict on Pod {}, retry #{} in {:?}", key, retry.attempt, retry.delay);
        }
        RequeueCause::Error if retry.stuck => {
            error!(
                "Pod {} is stuck: {} consecutive failures, retrying in {:?}: {}",
                key, retry.attempt, retry.delay, error
            );
        }
        RequeueCause::Error => {
            warn!(
                "{} (attempt {}), retrying in {:?}",
                error, retry.attempt, retry.delay
            );
        }
    }
}

/// Main controller for Pod label management.
pub struct Controller {
    pod_api: Api<Pod>,
    context: Arc<Context>,
    config: ControllerConfig,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Pod Label Controller");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;

        let store = KubePodStore::new(kube_client.clone(), config.request_timeout);
        let pod_api: Api<Pod> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client, ns),
            None => Api::all(kube_client),
        };

        let context = Arc::new(Context::new(
            Reconciler::new(Arc::new(store)),
            RetryTracker::new(config.requeue_policy, config.error_escalation_threshold),
        ));

        Ok(Self {
            pod_api,
            context,
            config,
        })
    }

    /// Runs the controller until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ControllerError> {
        info!("Pod Label Controller running");
        watch_pods(self.pod_api, self.context, &self.config).await;
        info!("Pod Label Controller stopped");
        Ok(())
    }
}
