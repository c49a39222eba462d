//! Refresh discipline shared by every trust registry.

use std::time::Duration;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Trust registry refresh configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
pub struct RegistryConfig {
    /// Seconds between background refreshes of trusted signing keys.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_REGISTRY_REFRESH_SECS", default_value_t = 300)
    )]
    #[serde(default = "RegistryConfig::default_refresh_interval_secs")]
    pub registry_refresh_secs: u64,

    /// Seconds a single registry fetch may take before it is abandoned.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_REGISTRY_TIMEOUT_SECS", default_value_t = 10)
    )]
    #[serde(default = "RegistryConfig::default_fetch_timeout_secs")]
    pub registry_timeout_secs: u64,

    /// Seconds a key without a published expiry stays trusted after a
    /// successful fetch stops publishing it.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_REGISTRY_KEY_TTL_SECS", default_value_t = 3600)
    )]
    #[serde(default = "RegistryConfig::default_key_ttl_secs")]
    pub registry_key_ttl_secs: u64,
}

impl RegistryConfig {
    fn default_refresh_interval_secs() -> u64 {
        300
    }

    fn default_fetch_timeout_secs() -> u64 {
        10
    }

    fn default_key_ttl_secs() -> u64 {
        3600
    }

    /// Interval between background refreshes.
    #[inline]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.registry_refresh_secs)
    }

    /// Deadline of a single fetch.
    #[inline]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    /// How long a rotated-out key without its own expiry stays trusted.
    #[inline]
    pub fn key_ttl(&self) -> SignedDuration {
        SignedDuration::from_secs(i64::try_from(self.registry_key_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Rejects zero durations.
    pub fn validate(&self) -> Result<()> {
        if self.registry_refresh_secs == 0 {
            return Err(Error::config("registry refresh interval must be positive"));
        }

        if self.registry_timeout_secs == 0 {
            return Err(Error::config("registry fetch timeout must be positive"));
        }

        if self.registry_key_ttl_secs == 0 {
            return Err(Error::config("registry key lifetime must be positive"));
        }

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_refresh_secs: Self::default_refresh_interval_secs(),
            registry_timeout_secs: Self::default_fetch_timeout_secs(),
            registry_key_ttl_secs: Self::default_key_ttl_secs(),
        }
    }
}
