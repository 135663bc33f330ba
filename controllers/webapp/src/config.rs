//! Controller configuration, loaded from environment variables.

use crate::error::ControllerError;
use crate::reconciler::FIELD_MANAGER;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROBE_PORT: u16 = 8081;
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 3;
pub const DEFAULT_ERROR_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_ERROR_BACKOFF_MAX_MINUTES: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch, `None` for all namespaces
    pub namespace: Option<String>,
    pub field_manager: String,
    pub probe_port: u16,
    /// Deadline for a single reconciliation pass
    pub reconcile_timeout: Duration,
    pub max_concurrent_reconciles: u16,
    pub error_backoff_min: Duration,
    pub error_backoff_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            field_manager: FIELD_MANAGER.to_string(),
            probe_port: DEFAULT_PROBE_PORT,
            reconcile_timeout: Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            error_backoff_min: Duration::from_secs(DEFAULT_ERROR_BACKOFF_MIN_MINUTES * 60),
            error_backoff_max: Duration::from_secs(DEFAULT_ERROR_BACKOFF_MAX_MINUTES * 60),
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ControllerError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{name} must be a non-negative integer, got {raw:?}"))
        }),
        None => Ok(default),
    }
}

fn minutes(name: &str, value: u64) -> Result<Duration, ControllerError> {
    value
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ControllerError::InvalidConfig(format!("{name} is too large, got {value}")))
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty());
        let field_manager = lookup("FIELD_MANAGER")
            .filter(|fm| !fm.trim().is_empty())
            .unwrap_or_else(|| FIELD_MANAGER.to_string());

        let probe_port = parse_or(&lookup, "PROBE_PORT", DEFAULT_PROBE_PORT)?;
        let timeout_secs = parse_or(&lookup, "RECONCILE_TIMEOUT_SECS", DEFAULT_RECONCILE_TIMEOUT_SECS)?;
        let max_concurrent_reconciles =
            parse_or(&lookup, "MAX_CONCURRENT_RECONCILES", DEFAULT_MAX_CONCURRENT_RECONCILES)?;
        let backoff_min = parse_or(&lookup, "ERROR_BACKOFF_MIN_MINUTES", DEFAULT_ERROR_BACKOFF_MIN_MINUTES)?;
        let backoff_max = parse_or(&lookup, "ERROR_BACKOFF_MAX_MINUTES", DEFAULT_ERROR_BACKOFF_MAX_MINUTES)?;

        if timeout_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RECONCILE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if backoff_min == 0 || backoff_min > backoff_max {
            return Err(ControllerError::InvalidConfig(format!(
                "error backoff must satisfy 0 < min <= max, got {backoff_min}m..{backoff_max}m"
            )));
        }

        Ok(Self {
            namespace,
            field_manager,
            probe_port,
            reconcile_timeout: Duration::from_secs(timeout_secs),
            max_concurrent_reconciles,
            error_backoff_min: minutes("ERROR_BACKOFF_MIN_MINUTES", backoff_min)?,
            error_backoff_max: minutes("ERROR_BACKOFF_MAX_MINUTES", backoff_max)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ControllerConfig, ControllerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ControllerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        assert_eq!(load(&[]).unwrap(), ControllerConfig::default());
        assert_eq!(ControllerConfig::default().field_manager, "webapp-controller");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("WATCH_NAMESPACE", "prod"),
            ("FIELD_MANAGER", "platform"),
            ("PROBE_PORT", "9000"),
            ("RECONCILE_TIMEOUT_SECS", "10"),
            ("MAX_CONCURRENT_RECONCILES", "8"),
            ("ERROR_BACKOFF_MIN_MINUTES", "2"),
            ("ERROR_BACKOFF_MAX_MINUTES", "20"),
        ])
        .unwrap();

        assert_eq!(config.namespace.as_deref(), Some("prod"));
        assert_eq!(config.field_manager, "platform");
        assert_eq!(config.probe_port, 9000);
        assert_eq!(config.reconcile_timeout, Duration::from_secs(10));
        assert_eq!(config.max_concurrent_reconciles, 8);
        assert_eq!(config.error_backoff_min, Duration::from_secs(120));
        assert_eq!(config.error_backoff_max, Duration::from_secs(1200));
    }

    #[test]
    fn test_empty_namespace_means_all() {
        assert_eq!(load(&[("WATCH_NAMESPACE", "")]).unwrap().namespace, None);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("PROBE_PORT", "http")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("RECONCILE_TIMEOUT_SECS", "0")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("ERROR_BACKOFF_MIN_MINUTES", "5"), ("ERROR_BACKOFF_MAX_MINUTES", "2")]),
            Err(ControllerError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[("ERROR_BACKOFF_MAX_MINUTES", "18446744073709551615")]),
            Err(ControllerError::InvalidConfig(_))
        ));
    }
}
