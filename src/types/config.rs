//! Configuration structures.
//!
//! Loaded once at process start from environment variables (prefixed
//! `CHATOPS_`), validated, and never mutated afterward. Namespace,
//! deployment name, and replica bounds are intentionally not
//! runtime-configurable beyond the advisory, rejectable `NAMESPACE_OVERRIDE`
//! (I6, §6.4).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Error, Result};

/// Global process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            kubernetes: KubernetesConfig::default(),
            observability: ObservabilityConfig::default(),
            quota: QuotaConfig::default(),
        }
    }
}

impl Config {
    /// Build configuration from the process environment, then validate.
    ///
    /// This does not touch a config file — like the teacher's config
    /// module, every field reads `std::env::var` directly with a hard
    /// default, rather than pulling in a config-file crate.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(addr) = std::env::var("CHATOPS_BIND_ADDR") {
            config.server.bind_addr = addr;
        }

        if let Ok(ns) = std::env::var("NAMESPACE_OVERRIDE") {
            if ns != config.kubernetes.namespace {
                return Err(Error::system(format!(
                    "NAMESPACE_OVERRIDE ({ns}) does not match the compiled-in namespace ({}); \
                     refusing to widen the hard-coded target (I6)",
                    config.kubernetes.namespace
                )));
            }
        }

        if let Ok(deployment) = std::env::var("CHATOPS_DEPLOYMENT") {
            config.kubernetes.deployment = deployment;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.observability.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.kubernetes.replica_floor < 1 {
            return Err(Error::system("replica_floor must be >= 1"));
        }
        if self.kubernetes.replica_floor > self.kubernetes.replica_ceiling {
            return Err(Error::system("replica_floor must be <= replica_ceiling"));
        }
        if self.kubernetes.replica_ceiling > 5 {
            return Err(Error::system("replica_ceiling must be <= 5 (I7)"));
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address for the `/chat` and `/internal/*` surface.
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Kubernetes adapter configuration — the process-wide constants of §4.5/I6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub namespace: String,
    pub deployment: String,
    pub replica_floor: u32,
    pub replica_ceiling: u32,
    #[serde(with = "humantime_serde")]
    pub adapter_timeout: Duration,
    /// Grace delay between a successful `scale` call and its verification
    /// read (§4.5).
    #[serde(with = "humantime_serde")]
    pub verification_grace: Duration,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            deployment: "loadlab".to_string(),
            replica_floor: 1,
            replica_ceiling: 5,
            adapter_timeout: Duration::from_secs(15),
            verification_grace: Duration::from_secs(1),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

/// FREE-tier quota configuration (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub free_limit: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self { free_limit: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn ceiling_above_five_is_rejected() {
        let mut config = Config::default();
        config.kubernetes.replica_ceiling = 6;
        assert!(config.validate().is_err());
    }

    #[test]
    fn floor_above_ceiling_is_rejected() {
        let mut config = Config::default();
        config.kubernetes.replica_floor = 5;
        config.kubernetes.replica_ceiling = 3;
        assert!(config.validate().is_err());
    }
}
