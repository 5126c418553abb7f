//! PodStoreTrait for mocking
//!
//! This trait abstracts pod reads and writes so the reconciler can be unit
//! tested without a cluster. `KubePodStore` implements it against the API
//! server; `MockPodStore` implements it in memory.

use crate::error::StoreError;
use crate::models::PodKey;
use k8s_openapi::api::core::v1::Pod;

/// Trait for pod store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait PodStoreTrait: Send + Sync {
    /// Point read of the current pod.
    ///
    /// Fails with `StoreError::NotFound` if the pod does not exist.
    async fn fetch(&self, key: &PodKey) -> Result<Pod, StoreError>;

    /// Conditional write of a previously fetched pod.
    ///
    /// The pod's `metadata.resourceVersion` is the expected version. If the
    /// stored pod has moved on, the write is rejected with
    /// `StoreError::Conflict` and nothing is committed.
    async fn replace(&self, key: &PodKey, pod: &Pod) -> Result<Pod, StoreError>;
}
