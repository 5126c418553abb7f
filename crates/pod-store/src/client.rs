//! Kubernetes-backed pod store
//!
//! Implements `PodStoreTrait` on top of `kube::Api<Pod>`. Writes use `replace`
//! (HTTP PUT), which the API server rejects with 409 when the submitted
//! `resourceVersion` is stale.

use crate::error::StoreError;
use crate::models::PodKey;
use crate::store_trait::PodStoreTrait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::PostParams;
use kube::{Api, Client};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Pod store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubePodStore {
    client: Client,
    request_timeout: Duration,
}

impl std::fmt::Debug for KubePodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePodStore")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl KubePodStore {
    /// Create a store over `client`
    ///
    /// # Arguments
    /// * `client` - Kubernetes client
    /// * `request_timeout` - Deadline applied to every API call
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    fn api_for(&self, key: &PodKey) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &key.namespace)
    }
}

/// Run an API call under `timeout`, classifying its failure
async fn with_deadline<T, F>(timeout: Duration, context: &str, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, kube::Error>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(|e| StoreError::from_kube(e, context)),
        Err(_elapsed) => Err(StoreError::Timeout(format!(
            "{context}: no response within {timeout:?}"
        ))),
    }
}

#[async_trait::async_trait]
impl PodStoreTrait for KubePodStore {
    async fn fetch(&self, key: &PodKey) -> Result<Pod, StoreError> {
        debug!("Fetching pod {}", key);
        let api = self.api_for(key);
        let context = format!("get pod {key}");
        with_deadline(self.request_timeout, &context, api.get(&key.name)).await
    }

    async fn replace(&self, key: &PodKey, pod: &Pod) -> Result<Pod, StoreError> {
        // Without a resourceVersion the API server would accept the write
        // unconditionally.
        let version = pod.metadata.resource_version.as_deref().ok_or_else(|| {
            StoreError::InvalidObject(format!("pod {key} has no resourceVersion"))
        })?;
        debug!("Replacing pod {} at resourceVersion {}", key, version);

        let api = self.api_for(key);
        let context = format!("replace pod {key}");
        with_deadline(
            self.request_timeout,
            &context,
            api.replace(&key.name, &PostParams::default(), pod),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out() {
        let call = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<(), kube::Error>(())
        };

        let err = with_deadline(Duration::from_secs(1), "get pod default/slow", call)
            .await
            .unwrap_err();

        match err {
            StoreError::Timeout(msg) => {
                assert!(msg.contains("get pod default/slow"), "{msg}");
                assert!(msg.contains("no response"), "{msg}");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_within_deadline_passes_through() {
        let call = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<u32, kube::Error>(7)
        };

        assert_eq!(with_deadline(Duration::from_secs(1), "get", call).await.unwrap(), 7);
    }
}
