//! Assertion configuration: default timeout, poll interval, kubectl binary

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::poll::PollPolicy;

/// Default time a polled assertion may take before it fails
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default pause between poll cycles
pub const DEFAULT_POLL_MS: u64 = 10;

pub const TIMEOUT_ENV: &str = "KUBE_E2E_TIMEOUT_SECS";
pub const POLL_ENV: &str = "KUBE_E2E_POLL_MS";
pub const KUBECTL_ENV: &str = "KUBE_E2E_KUBECTL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssertConfig {
    /// Deadline for polled assertions, in seconds
    #[serde(rename = "timeout_secs", with = "secs")]
    pub timeout: Duration,

    /// Pause between poll cycles, in milliseconds
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    /// Program used for `get` and `apply` commands. Treated as a command-line
    /// fragment, so it may carry leading arguments (`sh ./fake-kubectl`).
    pub kubectl: String,

    /// Extra environment for every child process
    pub env: BTreeMap<String, String>,

    /// Keep polling when a command exits non-zero. When false the first
    /// failing exit ends any polled assertion that needs a successful run.
    pub retry_exec_errors: bool,
}

impl Default for AssertConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            kubectl: "kubectl".to_string(),
            env: BTreeMap::new(),
            retry_exec_errors: true,
        }
    }
}

impl AssertConfig {
    /// Defaults overridden by `KUBE_E2E_*` environment variables
    pub fn from_env() -> E2eResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a YAML file; missing fields keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> E2eResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> E2eResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer `KUBE_E2E_*` environment variables over the current values.
    pub fn apply_env(&mut self) -> E2eResult<()> {
        if let Some(secs) = env_number(TIMEOUT_ENV)? {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_number(POLL_ENV)? {
            self.poll_interval = Duration::from_millis(ms);
        }
        if let Ok(kubectl) = std::env::var(KUBECTL_ENV) {
            self.kubectl = kubectl;
        }
        self.validate()
    }

    pub fn validate(&self) -> E2eResult<()> {
        if self.kubectl.trim().is_empty() {
            return Err(E2eError::Config("kubectl program must not be empty".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(E2eError::Config("poll interval must be positive".into()));
        }
        Ok(())
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(self.timeout, self.poll_interval)
    }
}

fn env_number(key: &str) -> E2eResult<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| E2eError::Config(format!("{key} must be a whole number, got {raw:?}"))),
        Err(_) => Ok(None),
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AssertConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.kubectl, "kubectl");
        assert!(config.retry_exec_errors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn yaml_overrides_some_fields() {
        let config = AssertConfig::from_yaml(
            r#"
timeout_secs: 120
kubectl: /usr/local/bin/kubectl
env:
  KUBECONFIG: /tmp/kind-config
"#,
        )
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert_eq!(config.poll_interval, Duration::from_millis(DEFAULT_POLL_MS));
        assert_eq!(config.kubectl, "/usr/local/bin/kubectl");
        assert_eq!(
            config.env.get("KUBECONFIG").map(String::as_str),
            Some("/tmp/kind-config")
        );
    }

    #[test]
    fn yaml_rejects_unknown_fields() {
        assert!(AssertConfig::from_yaml("timeout: 5").is_err());
    }

    #[test]
    fn zero_poll_interval_is_invalid() {
        let err = AssertConfig::from_yaml("poll_interval_ms: 0").unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e2e.yaml");
        std::fs::write(&path, "retry_exec_errors: false\n").unwrap();
        let config = AssertConfig::from_yaml_file(&path).unwrap();
        assert!(!config.retry_exec_errors);
    }
}
