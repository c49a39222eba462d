//! Sources of trust registry material.

use async_trait::async_trait;

use super::entry::TrustRegistryEntry;
use crate::Result;

/// Remote (or static) authority the trust registry pulls keys from.
///
/// Implementations perform the I/O; the registry owns timeouts, snapshot
/// construction and swapping.
#[async_trait]
pub trait RegistryLoader: Send + Sync + 'static {
    /// Short name of the source, used in logs.
    fn source(&self) -> &str;

    /// Fetches every entry the authority currently publishes.
    async fn load(&self) -> Result<Vec<TrustRegistryEntry>>;
}

/// Loader returning a fixed set of entries.
///
/// Used for deployments that pin keys in configuration, and in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistryLoader {
    entries: Vec<TrustRegistryEntry>,
}

impl StaticRegistryLoader {
    /// Creates a loader that always returns `entries`.
    pub fn new(entries: Vec<TrustRegistryEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl RegistryLoader for StaticRegistryLoader {
    fn source(&self) -> &str {
        "static"
    }

    async fn load(&self) -> Result<Vec<TrustRegistryEntry>> {
        Ok(self.entries.clone())
    }
}
