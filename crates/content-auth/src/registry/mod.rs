//! Trust registry: background-refreshed signing keys of trusted issuers.
//!
//! Readers never block and never perform I/O: [`TrustRegistry::get`] and
//! [`TrustRegistry::snapshot`] load the current [`TrustSnapshot`] through an
//! atomic pointer. A refresh fetches from its [`RegistryLoader`], builds a new
//! snapshot off to the side and swaps it in whole, so a reader observes
//! either the old or the new snapshot and nothing in between.
//!
//! Refresh failures after startup keep the previous snapshot in effect and
//! are only logged. [`TrustRegistry::initialize`] is the one place where a
//! failed fetch is fatal.

mod config;
mod entry;
mod jwks;
mod loader;
mod service_reg;
mod snapshot;

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use jiff::Timestamp;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;

pub use self::config::RegistryConfig;
pub use self::entry::{KeyMaterial, TrustRegistryEntry, fingerprint};
pub use self::jwks::JwksLoader;
pub use self::loader::{RegistryLoader, StaticRegistryLoader};
pub use self::service_reg::{ServiceReg, ServiceRegKey, ServiceRegistryLoader};
pub use self::snapshot::{IssuerKeys, SnapshotStats, TrustSnapshot};
use crate::utility::tracing_targets::TRACING_TARGET_REGISTRY as TRACING_TARGET;
use crate::{Error, Result};

/// Shared handle to one trust domain's signing keys.
///
/// Cloning is cheap; all clones observe the same snapshots.
#[derive(Clone)]
pub struct TrustRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    name: String,
    loader: Arc<dyn RegistryLoader>,
    config: RegistryConfig,
    current: ArcSwap<TrustSnapshot>,
    /// Serializes writers; readers never touch it.
    refresh_lock: Mutex<()>,
}

impl TrustRegistry {
    /// Creates a registry with an empty snapshot.
    ///
    /// Call [`initialize`](Self::initialize) before serving requests.
    pub fn new(
        name: impl Into<String>,
        loader: impl RegistryLoader,
        config: RegistryConfig,
    ) -> Self {
        Self::with_loader(name, Arc::new(loader), config)
    }

    /// Creates a registry from a shared loader.
    pub fn with_loader(
        name: impl Into<String>,
        loader: Arc<dyn RegistryLoader>,
        config: RegistryConfig,
    ) -> Self {
        let inner = RegistryInner {
            name: name.into(),
            loader,
            config,
            current: ArcSwap::from_pointee(TrustSnapshot::empty()),
            refresh_lock: Mutex::new(()),
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates a registry already populated with `entries`.
    ///
    /// Refreshing it reinstalls the same entries.
    pub fn from_entries(name: impl Into<String>, entries: Vec<TrustRegistryEntry>) -> Self {
        let registry = Self::new(
            name,
            StaticRegistryLoader::new(entries.clone()),
            RegistryConfig::default(),
        );
        registry.install(entries, Timestamp::now());
        registry
    }

    /// Name of the trust domain, used in logs.
    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Refresh configuration.
    #[inline]
    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Keys of `issuer` in the current snapshot.
    ///
    /// Expired keys are still present in the returned set; use
    /// [`IssuerKeys::key`] or [`IssuerKeys::active_for`] to filter them.
    pub fn get(&self, issuer: &str) -> Option<Arc<IssuerKeys>> {
        self.inner.current.load().get(issuer).cloned()
    }

    /// Current snapshot.
    ///
    /// Holding the returned `Arc` pins that snapshot for the duration of one
    /// verification, however many refreshes happen meanwhile.
    pub fn snapshot(&self) -> Arc<TrustSnapshot> {
        self.inner.current.load_full()
    }

    /// Performs the startup fetch.
    ///
    /// Any failure, including a timeout, is reported as
    /// [`ErrorKind::RegistryUnavailable`](crate::ErrorKind::RegistryUnavailable).
    pub async fn initialize(&self) -> Result<SnapshotStats> {
        self.refresh().await.map_err(|e| {
            tracing::error!(
                target: TRACING_TARGET,
                registry = %self.name(),
                error = %e,
                "initial trust registry fetch failed",
            );
            Error::registry_unavailable(format!(
                "trust registry '{}' could not be loaded",
                self.name()
            ))
            .with_source(e)
        })
    }

    /// Fetches from the loader and swaps in a new snapshot.
    ///
    /// On failure the current snapshot is left untouched.
    pub async fn refresh(&self) -> Result<SnapshotStats> {
        let _guard = self.inner.refresh_lock.lock().await;
        let loader = &self.inner.loader;
        let deadline = self.inner.config.fetch_timeout();

        let fetched = match timeout(deadline, loader.load()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::external(
                    loader.source().to_owned(),
                    format!("fetch exceeded {}s deadline", deadline.as_secs()),
                ));
            }
        };

        let stats = self.install(fetched, Timestamp::now());

        tracing::info!(
            target: TRACING_TARGET,
            registry = %self.name(),
            source = %loader.source(),
            issuers = stats.issuers,
            keys = stats.keys,
            retained = stats.retained,
            discarded = stats.discarded,
            "trust registry refreshed",
        );

        Ok(stats)
    }

    /// Builds a snapshot from `fetched` on top of the current one and
    /// publishes it.
    ///
    /// Only called with the result of a successful fetch: keys are retired
    /// when the source stops publishing them, never because a fetch failed.
    fn install(&self, fetched: Vec<TrustRegistryEntry>, now: Timestamp) -> SnapshotStats {
        let previous = self.inner.current.load();
        let retention = self.inner.config.key_ttl();
        let (next, stats) = TrustSnapshot::build(fetched, &previous, now, retention);
        self.inner.current.store(Arc::new(next));
        stats
    }

    /// Spawns the periodic refresh task.
    ///
    /// The first refresh happens one interval from now; startup is expected
    /// to have called [`initialize`](Self::initialize). The task exits when
    /// `cancel` is triggered.
    pub fn spawn_refresh(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let registry = self.clone();
        let period = registry.config().refresh_interval();

        tokio::spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(
                target: TRACING_TARGET,
                registry = %registry.name(),
                interval_secs = period.as_secs(),
                "trust registry refresh task started",
            );

            loop {
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => {
                        tracing::debug!(
                            target: TRACING_TARGET,
                            registry = %registry.name(),
                            "trust registry refresh task stopped",
                        );
                        break;
                    }

                    _ = ticker.tick() => {
                        if let Err(e) = registry.refresh().await {
                            let snapshot = registry.snapshot();
                            tracing::error!(
                                target: TRACING_TARGET,
                                registry = %registry.name(),
                                error = %e,
                                revision = snapshot.revision(),
                                "trust registry refresh failed, keeping previous snapshot",
                            );
                        }
                    }
                }
            }
        })
    }
}

impl fmt::Debug for TrustRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.inner.current.load();
        f.debug_struct("TrustRegistry")
            .field("name", &self.inner.name)
            .field("source", &self.inner.loader.source())
            .field("revision", &snapshot.revision())
            .field("issuers", &snapshot.len())
            .finish_non_exhaustive()
    }
}
