//! Reconciliation logic for the pod-name label.
//!
//! One call to `Reconciler::reconcile` is one attempt to converge one pod:
//!
//! 1. Fetch the current pod (never trust the event that queued it)
//! 2. Derive the desired label state from its annotations
//! 3. Diff against the current label
//! 4. If needed, write the pod back, guarded by the `resourceVersion` read in step 1
//!
//! The reconciler holds no per-pod state between calls. Every failure is
//! returned as a classified `Outcome`; retry policy lives in the controller.
//! Request deadlines are enforced by the store.

use crate::labels::{desired_label_value, label_action, LabelAction, POD_NAME_LABEL};
use pod_store::{PodKey, PodStoreTrait, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one reconciliation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Label already matched the annotation; nothing written
    Unchanged,
    /// Label was added, corrected or removed
    Applied,
    /// Pod changed between read and write; retry from a fresh read
    Conflict,
    /// Pod no longer exists; nothing to converge
    NotFound,
    /// Unexpected failure (API error, timeout); retry with backoff
    Error(String),
}

/// Converges the pod-name label of individual pods.
pub struct Reconciler {
    store: Arc<dyn PodStoreTrait>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: Arc<dyn PodStoreTrait>) -> Self {
        Self { store }
    }

    /// Reconciles the pod identified by `key`.
    pub async fn reconcile(&self, key: &PodKey) -> Outcome {
        debug!("Reconciling Pod {}", key);

        let mut pod = match self.store.fetch(key).await {
            Ok(pod) => pod,
            Err(StoreError::NotFound(_)) => {
                debug!("Pod {} not found, nothing to reconcile", key);
                return Outcome::NotFound;
            }
            Err(e) => {
                warn!("Failed to fetch Pod {}: {}", key, e);
                return Outcome::Error(e.to_string());
            }
        };

        let name = pod.metadata.name.clone().unwrap_or_else(|| key.name.clone());
        let desired = desired_label_value(pod.metadata.annotations.as_ref(), &name);
        let action = label_action(pod.metadata.labels.as_ref(), desired.as_deref());

        if action == LabelAction::None {
            debug!("Pod {} already converged", key);
            return Outcome::Unchanged;
        }

        // Read-modify-write of the fetched object: only the governed key changes,
        // and the fetched resourceVersion guards the write.
        action.apply(&mut pod.metadata.labels);

        match self.store.replace(key, &pod).await {
            Ok(_) => {
                match &action {
                    LabelAction::Set(value) => {
                        info!("Set label {}={} on Pod {}", POD_NAME_LABEL, value, key);
                    }
                    LabelAction::Remove => {
                        info!("Removed label {} from Pod {}", POD_NAME_LABEL, key);
                    }
                    LabelAction::None => {}
                }
                Outcome::Applied
            }
            Err(StoreError::Conflict(msg)) => {
                debug!("Pod {} changed while reconciling, will retry: {}", key, msg);
                Outcome::Conflict
            }
            Err(StoreError::NotFound(_)) => {
                debug!("Pod {} deleted before update", key);
                Outcome::NotFound
            }
            Err(e) => {
                warn!("Failed to update Pod {}: {}", key, e);
                Outcome::Error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod reconciler_test;
