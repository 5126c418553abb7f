//! Pod identifiers

use k8s_openapi::api::core::v1::Pod;
use std::fmt;

/// Identifies a single pod by namespace and name.
///
/// This is the whole payload of a reconcile request: the controller always
/// re-reads the pod rather than trusting the event that produced the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PodKey {
    /// Namespace the pod lives in
    pub namespace: String,
    /// Pod name
    pub name: String,
}

impl PodKey {
    /// Create a key from a namespace and name
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Build the key for a pod object.
    ///
    /// Returns `None` if the object has no name. A missing namespace falls
    /// back to `default`, the same as the API server does on create.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.as_ref()?;
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
        Some(Self::new(namespace, name.as_str()))
    }
}

impl fmt::Display for PodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_from_pod_defaults_namespace() {
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("web-0".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(PodKey::from_pod(&pod), Some(PodKey::new("default", "web-0")));
    }

    #[test]
    fn test_from_pod_without_name() {
        let pod = Pod::default();
        assert_eq!(PodKey::from_pod(&pod), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PodKey::new("kube-system", "dns").to_string(), "kube-system/dns");
    }
}
