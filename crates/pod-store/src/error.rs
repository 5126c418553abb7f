//! Pod store errors

use thiserror::Error;

/// Errors that can occur when reading or writing pods
#[derive(Debug, Error)]
pub enum StoreError {
    /// The pod does not exist (deleted, or never created)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The write was rejected because the pod changed since it was read
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The request did not complete before its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The object is missing fields required for a conditional write
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// Any other Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Classify a Kubernetes API error by its HTTP status code.
    ///
    /// 404 becomes `NotFound` and 409 becomes `Conflict`; everything else is
    /// kept as `Kube`.
    pub fn from_kube(error: kube::Error, context: &str) -> Self {
        match error {
            kube::Error::Api(ref status) if status.code == 404 => {
                Self::NotFound(format!("{context}: {}", status.message))
            }
            kube::Error::Api(ref status) if status.code == 409 => {
                Self::Conflict(format!("{context}: {}", status.message))
            }
            other => Self::Kube(other),
        }
    }

    /// Whether this error means the pod no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error is an optimistic-concurrency rejection.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
