//! Pod Store
//!
//! Point reads and optimistic-concurrency writes of `Pod` objects, as
//! consumed by the pod label controller.
//!
//! # Example
//!
//! ```no_run
//! use pod_store::{KubePodStore, PodKey, PodStoreTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubePodStore::new(client, Duration::from_secs(10));
//!
//! let key = PodKey::new("default", "web-0");
//! let mut pod = store.fetch(&key).await?;
//! pod.metadata
//!     .labels
//!     .get_or_insert_with(Default::default)
//!     .insert("example.com/owner".to_string(), "web-0".to_string());
//!
//! // Fails with `StoreError::Conflict` if the pod changed since `fetch`
//! store.replace(&key, &pod).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Conditional writes**: `replace` is guarded by the fetched `resourceVersion`
//! - **Classified errors**: not-found and conflict are distinct from transient failures
//! - **Request deadlines**: every API call is bounded by a timeout
//! - **Mocking**: `MockPodStore` behind the `test-util` feature

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubePodStore;
pub use error::StoreError;
pub use models::PodKey;
pub use store_trait::PodStoreTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockPodStore;
