use std::time::Duration;

use crate::authz::DEFAULT_ROLE_KEY;
use crate::errors::AppError;

pub const DEFAULT_BOOTSTRAP_PATH: &str = "/api/bootstrap";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Prefix joined to `path`; `None` keeps the literal path.
    pub base_url: Option<String>,
    pub path: String,
    pub default_role: String,
    pub timeout: Duration,
    pub event_capacity: usize,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            path: DEFAULT_BOOTSTRAP_PATH.to_string(),
            default_role: DEFAULT_ROLE_KEY.to_string(),
            timeout: Duration::from_secs(15),
            event_capacity: 64,
        }
    }
}

impl BootstrapConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let timeout = var("BOOTSTRAP_TIMEOUT_SECS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(defaults.timeout.as_secs()))
            .map_err(|_| AppError::configuration("BOOTSTRAP_TIMEOUT_SECS must be a valid integer"))?;
        let event_capacity = var("BOOTSTRAP_EVENT_CAPACITY")
            .map(|val| val.parse::<usize>())
            .unwrap_or(Ok(defaults.event_capacity))
            .map_err(|_| AppError::configuration("BOOTSTRAP_EVENT_CAPACITY must be a valid integer"))?;
        if event_capacity == 0 {
            return Err(AppError::configuration("BOOTSTRAP_EVENT_CAPACITY must be greater than zero"));
        }

        Ok(Self {
            base_url: var("BOOTSTRAP_BASE_URL"),
            path: var("BOOTSTRAP_PATH").unwrap_or(defaults.path),
            default_role: var("BOOTSTRAP_DEFAULT_ROLE").unwrap_or(defaults.default_role),
            timeout: Duration::from_secs(timeout),
            event_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = BootstrapConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BootstrapConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = BootstrapConfig::from_lookup(lookup(&[
            ("BOOTSTRAP_BASE_URL", "http://api.local"),
            ("BOOTSTRAP_PATH", "/v2/bootstrap"),
            ("BOOTSTRAP_TIMEOUT_SECS", "3"),
            ("BOOTSTRAP_DEFAULT_ROLE", " "),
        ]))
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://api.local"));
        assert_eq!(config.path, "/v2/bootstrap");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.default_role, DEFAULT_ROLE_KEY);
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = BootstrapConfig::from_lookup(lookup(&[("BOOTSTRAP_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
        let err = BootstrapConfig::from_lookup(lookup(&[("BOOTSTRAP_EVENT_CAPACITY", "0")])).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
