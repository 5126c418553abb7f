//! Mock pod store for unit testing
//!
//! This module provides an in-memory implementation of `PodStoreTrait` that
//! behaves like the API server for the operations the controller uses:
//! every successful write bumps `resourceVersion`, and a write carrying a
//! stale version is rejected with `StoreError::Conflict`.
//!
//! Failures and concurrent writers can be injected to exercise retry paths.

use crate::error::StoreError;
use crate::models::PodKey;
use crate::store_trait::PodStoreTrait;
use k8s_openapi::api::core::v1::Pod;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Interference = Box<dyn FnOnce(&mut Pod) + Send>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Mock pod store for testing
///
/// Clones share the same underlying state, so a test can keep one handle for
/// setup and assertions while the reconciler owns another.
#[derive(Clone, Default)]
pub struct MockPodStore {
    pods: Arc<Mutex<HashMap<PodKey, Pod>>>,
    next_version: Arc<Mutex<u64>>,
    fetch_failures: Arc<Mutex<VecDeque<StoreError>>>,
    replace_failures: Arc<Mutex<VecDeque<StoreError>>>,
    // Applied to the stored pod right after the next fetch returns
    interference: Arc<Mutex<Option<Interference>>>,
    fetches: Arc<AtomicUsize>,
    replaces: Arc<AtomicUsize>,
}

impl std::fmt::Debug for MockPodStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPodStore")
            .field("pods", &lock(&self.pods).len())
            .field("fetches", &self.fetch_count())
            .field("replaces", &self.replace_count())
            .finish_non_exhaustive()
    }
}

impl MockPodStore {
    /// Create an empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_version(&self) -> String {
        let mut next = lock(&self.next_version);
        *next += 1;
        next.to_string()
    }

    /// Add or overwrite a pod (for test setup). Assigns a fresh resourceVersion.
    pub fn insert(&self, mut pod: Pod) -> PodKey {
        let key = PodKey::from_pod(&pod).unwrap_or_else(|| PodKey::new("default", ""));
        pod.metadata.namespace = Some(key.namespace.clone());
        pod.metadata.resource_version = Some(self.bump_version());
        lock(&self.pods).insert(key.clone(), pod);
        key
    }

    /// Current stored copy of a pod (for assertions)
    pub fn get(&self, key: &PodKey) -> Option<Pod> {
        lock(&self.pods).get(key).cloned()
    }

    /// Delete a pod (simulates deletion between enqueue and fetch)
    pub fn remove(&self, key: &PodKey) -> Option<Pod> {
        lock(&self.pods).remove(key)
    }

    /// Modify a stored pod out of band, as another writer would.
    pub fn modify(&self, key: &PodKey, f: impl FnOnce(&mut Pod)) {
        let version = self.bump_version();
        if let Some(pod) = lock(&self.pods).get_mut(key) {
            f(pod);
            pod.metadata.resource_version = Some(version);
        }
    }

    /// Make the next `fetch` fail with `error`. Queued failures are consumed in order.
    pub fn fail_next_fetch(&self, error: StoreError) {
        lock(&self.fetch_failures).push_back(error);
    }

    /// Make the next `replace` fail with `error`. Queued failures are consumed in order.
    pub fn fail_next_replace(&self, error: StoreError) {
        lock(&self.replace_failures).push_back(error);
    }

    /// Simulate a concurrent writer: right after the next successful fetch,
    /// `f` is applied to the stored pod and its resourceVersion is bumped.
    pub fn interfere_after_next_fetch(&self, f: impl FnOnce(&mut Pod) + Send + 'static) {
        *lock(&self.interference) = Some(Box::new(f));
    }

    /// Number of `fetch` calls made
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of `replace` calls made (including rejected ones)
    pub fn replace_count(&self) -> usize {
        self.replaces.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PodStoreTrait for MockPodStore {
    async fn fetch(&self, key: &PodKey) -> Result<Pod, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.fetch_failures).pop_front() {
            return Err(error);
        }

        let pod = self
            .get(key)
            .ok_or_else(|| StoreError::NotFound(format!("pod {key}")))?;

        let interference = lock(&self.interference).take();
        if let Some(f) = interference {
            self.modify(key, f);
        }

        Ok(pod)
    }

    async fn replace(&self, key: &PodKey, pod: &Pod) -> Result<Pod, StoreError> {
        self.replaces.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = lock(&self.replace_failures).pop_front() {
            return Err(error);
        }

        let expected = pod.metadata.resource_version.clone().ok_or_else(|| {
            StoreError::InvalidObject(format!("pod {key} has no resourceVersion"))
        })?;

        let version = self.bump_version();
        let mut pods = lock(&self.pods);
        let stored = pods
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(format!("pod {key}")))?;

        if stored.metadata.resource_version.as_deref() != Some(expected.as_str()) {
            return Err(StoreError::Conflict(format!(
                "pod {key}: resourceVersion {expected} is stale"
            )));
        }

        let mut updated = pod.clone();
        updated.metadata.resource_version = Some(version);
        *stored = updated.clone();
        Ok(updated)
    }
}
