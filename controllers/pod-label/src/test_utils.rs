//! Test utilities for unit testing the reconciler and controller
//!
//! This module provides helpers for creating test pods, reconcilers and
//! controller contexts.

use crate::labels::{ADD_POD_NAME_LABEL_ANNOTATION, POD_NAME_LABEL};
use crate::backoff::{RequeuePolicy, RetryTracker};
use crate::controller::Context;
use crate::reconciler::Reconciler;
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use pod_store::MockPodStore;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TEST_NAMESPACE: &str = "default";

/// Helper to create a test Pod, optionally carrying the trigger annotation
/// and/or the governed label (with the pod's own name as value).
pub fn create_test_pod(name: &str, with_annotation: bool, with_label: bool) -> Pod {
    let annotations = with_annotation.then(|| {
        BTreeMap::from([(ADD_POD_NAME_LABEL_ANNOTATION.to_string(), "true".to_string())])
    });
    let labels = with_label
        .then(|| BTreeMap::from([(POD_NAME_LABEL.to_string(), name.to_string())]));

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(TEST_NAMESPACE.to_string()),
            annotations,
            labels,
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: "test-container".to_string(),
                image: Some("test-image".to_string()),
                ..Default::default()
            }],
            restart_policy: Some("OnFailure".to_string()),
            ..Default::default()
        }),
        status: None,
    }
}

/// Reconciler over a mock store
pub fn create_test_reconciler(store: &MockPodStore) -> Reconciler {
    Reconciler::new(Arc::new(store.clone()))
}

/// Controller context over a mock store with the default requeue policy
pub fn create_test_context(store: &MockPodStore, escalation_threshold: u32) -> Arc<Context> {
    Arc::new(Context::new(
        create_test_reconciler(store),
        RetryTracker::new(RequeuePolicy::default(), escalation_threshold),
    ))
}

/// Current value of the governed label on a stored pod
pub fn governed_label(pod: &Pod) -> Option<&str> {
    pod.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(POD_NAME_LABEL))
        .map(String::as_str)
}
