//! Controller configuration.
//!
//! All settings come from environment variables:
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `WATCH_NAMESPACE` | all namespaces | Restrict watching to one namespace |
//! | `WORKER_COUNT` | 2 | Pods reconciled in parallel |
//! | `REQUEST_TIMEOUT_SECS` | 10 | Deadline for each API call |
//! | `RESYNC_INTERVAL_SECS` | 600 | Full resync period, `0` disables |
//! | `ERROR_ESCALATION_THRESHOLD` | 10 | Consecutive failures before a pod is reported stuck |

use crate::backoff::RequeuePolicy;
use crate::error::ControllerError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_WORKER_COUNT: u16 = 2;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 600;
const DEFAULT_ERROR_ESCALATION_THRESHOLD: u32 = 10;

/// Runtime configuration for the Pod Label Controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, `None` for all
    pub namespace: Option<String>,
    /// Maximum number of Pods reconciled in parallel
    pub workers: u16,
    /// Deadline for each fetch or update
    pub request_timeout: Duration,
    /// Period of the full resync, `None` when disabled
    pub resync_interval: Option<Duration>,
    /// Consecutive failures after which a pod is logged as stuck
    pub error_escalation_threshold: u32,
    /// Requeue delays for conflicts and errors
    pub requeue_policy: RequeuePolicy,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            workers: DEFAULT_WORKER_COUNT,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            resync_interval: Some(Duration::from_secs(DEFAULT_RESYNC_INTERVAL_SECS)),
            error_escalation_threshold: DEFAULT_ERROR_ESCALATION_THRESHOLD,
            requeue_policy: RequeuePolicy::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());

        let workers = parse_or(&lookup, "WORKER_COUNT", DEFAULT_WORKER_COUNT)?;
        if workers == 0 {
            return Err(ControllerError::InvalidConfig(
                "WORKER_COUNT must be at least 1".to_string(),
            ));
        }

        let request_timeout_secs =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        if request_timeout_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "REQUEST_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let resync_secs = parse_or(&lookup, "RESYNC_INTERVAL_SECS", DEFAULT_RESYNC_INTERVAL_SECS)?;
        let error_escalation_threshold = parse_or(
            &lookup,
            "ERROR_ESCALATION_THRESHOLD",
            DEFAULT_ERROR_ESCALATION_THRESHOLD,
        )?;

        Ok(Self {
            namespace,
            workers,
            request_timeout: Duration::from_secs(request_timeout_secs),
            resync_interval: (resync_secs > 0).then(|| Duration::from_secs(resync_secs)),
            error_escalation_threshold,
            requeue_policy: RequeuePolicy::default(),
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{name}={raw:?} is not valid: {e}"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ControllerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let config = ControllerConfig::from_lookup(lookup_from(&[
            ("WATCH_NAMESPACE", "team-a"),
            ("WORKER_COUNT", "8"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("RESYNC_INTERVAL_SECS", "0"),
            ("ERROR_ESCALATION_THRESHOLD", "4"),
        ]))
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("team-a"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.resync_interval, None);
        assert_eq!(config.error_escalation_threshold, 4);
    }

    #[test]
    fn test_empty_namespace_means_all() {
        let config =
            ControllerConfig::from_lookup(lookup_from(&[("WATCH_NAMESPACE", "  ")])).unwrap();
        assert_eq!(config.namespace, None);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = ControllerConfig::from_lookup(lookup_from(&[("WORKER_COUNT", "many")]))
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(ref msg) if msg.contains("WORKER_COUNT")));

        assert!(ControllerConfig::from_lookup(lookup_from(&[("WORKER_COUNT", "0")])).is_err());
        assert!(
            ControllerConfig::from_lookup(lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")])).is_err()
        );
    }
}
