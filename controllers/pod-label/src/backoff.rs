//! # Requeue Backoff
//!
//! Computes how long a pod waits before it is reconciled again after a
//! failed attempt. The delay depends on why the attempt failed:
//!
//! - **Conflict**: the pod changed between our read and our write. The read
//!   is simply stale, so retry soon: `conflict_base * n`, capped at
//!   `conflict_max`.
//! - **Error**: API failure or timeout. Back off exponentially:
//!   `error_base * 2^(n-1)`, capped at `error_max`. The delay stays at the
//!   cap for as long as the failures continue; we never give up on a pod.
//!
//! `n` counts consecutive failures of the same cause for the pod, starting
//! at 1. Conflicts and errors are counted separately, so a burst of conflicts
//! neither lengthens the next error delay nor pushes the pod towards being
//! reported as stuck. Both counts reset once the pod converges.

use pod_store::PodKey;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

/// Why a reconciliation is being retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueCause {
    /// Optimistic-concurrency rejection
    Conflict,
    /// Any other failure
    Error,
}

/// Per-cause requeue delay calculator
///
/// Stateless: failure counts are tracked by `RetryTracker` and passed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequeuePolicy {
    /// Delay step for conflict retries
    pub conflict_base: Duration,
    /// Maximum delay for conflict retries
    pub conflict_max: Duration,
    /// Initial delay for error retries
    pub error_base: Duration,
    /// Maximum delay for error retries
    pub error_max: Duration,
}

impl Default for RequeuePolicy {
    /// Conflicts: 100ms, 200ms, ... 1s. Errors: 1s, 2s, 4s, ... 5m.
    fn default() -> Self {
        Self {
            conflict_base: Duration::from_millis(100),
            conflict_max: Duration::from_secs(1),
            error_base: Duration::from_secs(1),
            error_max: Duration::from_secs(300),
        }
    }
}

impl RequeuePolicy {
    /// Delay before the next attempt, given the cause and the number of
    /// consecutive failures so far (including this one).
    #[must_use]
    pub fn delay_for(&self, cause: RequeueCause, failures: u32) -> Duration {
        let n = failures.max(1);
        match cause {
            RequeueCause::Conflict => self
                .conflict_base
                .saturating_mul(n)
                .min(self.conflict_max),
            RequeueCause::Error => {
                // 2^31 already overflows any sane base; clamp the exponent
                let exponent = (n - 1).min(31);
                self.error_base
                    .saturating_mul(1u32 << exponent)
                    .min(self.error_max)
            }
        }
    }
}

/// Consecutive failures of one pod, per cause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FailureCounts {
    conflicts: u32,
    errors: u32,
}

/// Retry decision for one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    /// Consecutive failures of this cause, including this one
    pub attempt: u32,
    /// Delay before the pod is reconciled again
    pub delay: Duration,
    /// The pod has kept failing with errors past the escalation threshold
    pub stuck: bool,
}

/// Tracks consecutive failures per pod and turns them into requeue delays.
#[derive(Debug)]
pub struct RetryTracker {
    policy: RequeuePolicy,
    escalation_threshold: u32,
    failures: Mutex<HashMap<PodKey, FailureCounts>>,
}

impl RetryTracker {
    /// Create a tracker. A pod is reported stuck once its consecutive error
    /// count reaches `escalation_threshold`.
    pub fn new(policy: RequeuePolicy, escalation_threshold: u32) -> Self {
        Self {
            policy,
            escalation_threshold,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed attempt for `key` and compute its retry.
    pub fn record(&self, key: &PodKey, cause: RequeueCause) -> Retry {
        let attempt = match self.failures.lock() {
            Ok(mut failures) => {
                let counts = failures.entry(key.clone()).or_default();
                let count = match cause {
                    RequeueCause::Conflict => &mut counts.conflicts,
                    RequeueCause::Error => &mut counts.errors,
                };
                *count = count.saturating_add(1);
                *count
            }
            Err(e) => {
                warn!("Failed to lock retry state: {}, using first-attempt backoff", e);
                1
            }
        };

        Retry {
            attempt,
            delay: self.policy.delay_for(cause, attempt),
            stuck: cause == RequeueCause::Error && attempt >= self.escalation_threshold,
        }
    }

    /// Clear the failure history of `key`, returning how many failed
    /// attempts preceded.
    pub fn reset(&self, key: &PodKey) -> u32 {
        match self.failures.lock() {
            Ok(mut failures) => failures
                .remove(key)
                .map_or(0, |c| c.conflicts.saturating_add(c.errors)),
            Err(e) => {
                warn!("Failed to lock retry state: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_backoff_sequence() {
        let policy = RequeuePolicy::default();

        // 1s, 2s, 4s, 8s, 16s, 32s, 64s, 128s, 256s, 300s (max)
        let expected = [1, 2, 4, 8, 16, 32, 64, 128, 256, 300];
        for (i, secs) in expected.iter().enumerate() {
            let failures = u32::try_from(i + 1).unwrap();
            assert_eq!(
                policy.delay_for(RequeueCause::Error, failures),
                Duration::from_secs(*secs),
                "failure #{failures}"
            );
        }
    }

    #[test]
    fn test_error_backoff_stays_at_cap() {
        let policy = RequeuePolicy::default();

        assert_eq!(policy.delay_for(RequeueCause::Error, 50), Duration::from_secs(300));
        // Should not overflow
        assert_eq!(
            policy.delay_for(RequeueCause::Error, u32::MAX),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_conflict_backoff_is_short() {
        let policy = RequeuePolicy::default();

        assert_eq!(policy.delay_for(RequeueCause::Conflict, 1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(RequeueCause::Conflict, 3), Duration::from_millis(300));
        assert_eq!(policy.delay_for(RequeueCause::Conflict, 100), Duration::from_secs(1));
        assert!(
            policy.delay_for(RequeueCause::Conflict, 5) < policy.delay_for(RequeueCause::Error, 5)
        );
    }

    #[test]
    fn test_zero_failures_treated_as_first() {
        let policy = RequeuePolicy::default();

        assert_eq!(
            policy.delay_for(RequeueCause::Error, 0),
            policy.delay_for(RequeueCause::Error, 1)
        );
    }

    fn key() -> PodKey {
        PodKey::new("default", "flaky")
    }

    #[test]
    fn test_errors_escalate_at_threshold() {
        let tracker = RetryTracker::new(RequeuePolicy::default(), 3);

        let first = tracker.record(&key(), RequeueCause::Error);
        assert_eq!(first.attempt, 1);
        assert_eq!(first.delay, Duration::from_secs(1));
        assert!(!first.stuck);

        assert!(!tracker.record(&key(), RequeueCause::Error).stuck);

        let third = tracker.record(&key(), RequeueCause::Error);
        assert_eq!(third.attempt, 3);
        assert_eq!(third.delay, Duration::from_secs(4));
        assert!(third.stuck, "third consecutive error reaches the threshold");

        // Stays stuck, keeps retrying
        let fourth = tracker.record(&key(), RequeueCause::Error);
        assert!(fourth.stuck);
        assert_eq!(fourth.delay, Duration::from_secs(8));
    }

    #[test]
    fn test_conflicts_do_not_inflate_error_backoff() {
        let tracker = RetryTracker::new(RequeuePolicy::default(), 10);

        for _ in 0..9 {
            let retry = tracker.record(&key(), RequeueCause::Conflict);
            assert!(!retry.stuck);
            assert!(retry.delay <= Duration::from_secs(1));
        }

        let error = tracker.record(&key(), RequeueCause::Error);
        assert_eq!(error.attempt, 1);
        assert_eq!(error.delay, Duration::from_secs(1));
        assert!(!error.stuck);
    }

    #[test]
    fn test_conflicts_never_escalate() {
        let tracker = RetryTracker::new(RequeuePolicy::default(), 2);

        for _ in 0..20 {
            assert!(!tracker.record(&key(), RequeueCause::Conflict).stuck);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let tracker = RetryTracker::new(RequeuePolicy::default(), 10);
        tracker.record(&key(), RequeueCause::Conflict);
        tracker.record(&key(), RequeueCause::Error);
        tracker.record(&key(), RequeueCause::Error);

        assert_eq!(tracker.reset(&key()), 3);
        assert_eq!(tracker.reset(&key()), 0);
        assert_eq!(tracker.record(&key(), RequeueCause::Error).attempt, 1);
    }

    #[test]
    fn test_pods_are_tracked_independently() {
        let tracker = RetryTracker::new(RequeuePolicy::default(), 10);
        let other = PodKey::new("default", "healthy");

        tracker.record(&key(), RequeueCause::Error);
        tracker.record(&key(), RequeueCause::Error);

        assert_eq!(tracker.record(&other, RequeueCause::Error).attempt, 1);
    }
}
