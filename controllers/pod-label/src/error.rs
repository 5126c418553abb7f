//! Controller-specific error types.

use crate::backoff::RequeueCause;
use kube::Error as KubeError;
use pod_store::PodKey;
use thiserror::Error;

/// Errors that can occur in the Pod Label Controller.
///
/// These cover startup and configuration, and are surfaced from `main`.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A reconciliation attempt that must be retried.
///
/// Returned to the `kube_runtime` controller, whose error policy picks the
/// requeue delay from the variant.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The pod changed between read and write
    #[error("Pod {0} changed concurrently")]
    Conflict(PodKey),

    /// Fetch or update failed
    #[error("Reconciliation of Pod {key} failed: {message}")]
    Failed {
        /// Pod being reconciled
        key: PodKey,
        /// Underlying failure
        message: String,
    },
}

impl ReconcileError {
    /// Pod the failed attempt was for
    pub fn key(&self) -> &PodKey {
        match self {
            Self::Conflict(key) | Self::Failed { key, .. } => key,
        }
    }

    /// Backoff class of the failure
    pub fn cause(&self) -> RequeueCause {
        match self {
            Self::Conflict(_) => RequeueCause::Conflict,
            Self::Failed { .. } => RequeueCause::Error,
        }
    }
}
