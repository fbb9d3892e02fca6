//! # Handler Configuration
//!
//! Loads the YAML file that tells a host which service to expose and how.
//!
//! ```yaml
//! name: demo
//! service: echo
//! log_path: logs/demo.log
//! endpoint: /api
//! cross_domain: true
//! session:
//!   header: x-session-id
//!   cookie: session_id
//!   idle_timeout_secs: 1200
//! binder:
//!   null_policy: reject
//! ```
//!
//! ## Environment Variables
//!
//! `JSONREST_SERVICE`, `JSONREST_LOG_PATH` and `JSONREST_ENDPOINT` override the
//! corresponding keys after the file is read.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::binder::BinderOptions;
use crate::session::{
    SessionStore, DEFAULT_IDLE_TIMEOUT, DEFAULT_SESSION_COOKIE, DEFAULT_SESSION_HEADER,
};

/// Where requests carry their session id, and how long an idle session lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub header: String,
    pub cookie: String,
    /// Seconds without activity before a session closes; `0` disables expiry
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            header: DEFAULT_SESSION_HEADER.to_string(),
            cookie: DEFAULT_SESSION_COOKIE.to_string(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    /// Empty session store using these names and this timeout.
    #[must_use]
    pub fn build_store(&self) -> SessionStore {
        SessionStore::with_names(self.header.clone(), self.cookie.clone())
            .with_idle_timeout(self.idle_timeout())
    }
}

/// Configuration of one exposed service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandlerConfig {
    /// Display name of the deployment
    #[serde(default)]
    pub name: Option<String>,
    /// Registry key of the service to expose
    #[serde(default)]
    pub service: String,
    /// File the host logs to
    #[serde(default)]
    pub log_path: PathBuf,
    /// Mount prefix stripped from request URLs
    #[serde(default)]
    pub endpoint: String,
    /// Send `Access-Control-Allow-Origin: *`
    #[serde(default)]
    pub cross_domain: bool,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub binder: BinderOptions,
}

impl HandlerConfig {
    /// Reads, overrides from the environment and validates a config file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if `service` or
    /// `log_path` end up empty.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses a config document without validating it.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML or unknown value types.
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse handler config")
    }

    /// Applies `JSONREST_SERVICE`, `JSONREST_LOG_PATH` and `JSONREST_ENDPOINT`.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(service) = lookup("JSONREST_SERVICE") {
            self.service = service;
        }
        if let Some(log_path) = lookup("JSONREST_LOG_PATH") {
            self.log_path = PathBuf::from(log_path);
        }
        if let Some(endpoint) = lookup("JSONREST_ENDPOINT") {
            self.endpoint = endpoint;
        }
    }

    /// # Errors
    ///
    /// Fails if `service` or `log_path` is empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service.trim().is_empty() {
            bail!("`service` must name the service to expose");
        }
        if self.log_path.as_os_str().is_empty() {
            bail!("`log_path` must be set");
        }
        Ok(())
    }

    /// Name used in logs: `name`, falling back to the service key.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::NullPolicy;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::from_yaml("service: echo\nlog_path: x.log\n").unwrap();
        assert_eq!(config.service, "echo");
        assert_eq!(config.endpoint, "");
        assert!(!config.cross_domain);
        assert_eq!(config.session, SessionConfig::default());
        assert_eq!(config.binder.null_policy, NullPolicy::ZeroValue);
        assert_eq!(config.display_name(), "echo");
        config.validate().unwrap();
    }

    #[test]
    fn test_session_idle_timeout() {
        let config = HandlerConfig::from_yaml(
            "service: echo\nlog_path: x.log\nsession:\n  idle_timeout_secs: 90\n",
        )
        .unwrap();
        assert_eq!(config.session.idle_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(config.session.header, DEFAULT_SESSION_HEADER);

        let config = HandlerConfig::from_yaml(
            "service: echo\nlog_path: x.log\nsession:\n  idle_timeout_secs: 0\n",
        )
        .unwrap();
        assert_eq!(config.session.idle_timeout(), None);
        assert_eq!(SessionConfig::default().idle_timeout(), Some(DEFAULT_IDLE_TIMEOUT));
    }

    #[test]
    fn test_missing_service_is_invalid() {
        let config = HandlerConfig::from_yaml("log_path: x.log\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("service"));
    }

    #[test]
    fn test_overrides() {
        let mut config = HandlerConfig::from_yaml("service: echo\nlog_path: x.log\n").unwrap();
        config.apply_overrides(|key| match key {
            "JSONREST_SERVICE" => Some("other".to_string()),
            "JSONREST_ENDPOINT" => Some("/api".to_string()),
            "JSONREST_LOG_PATH" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.service, "other");
        assert_eq!(config.endpoint, "/api");
        assert_eq!(config.log_path, PathBuf::from("x.log"));
    }
}
