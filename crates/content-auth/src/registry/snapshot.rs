//! Immutable trust snapshots.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};
use jsonwebtoken::Algorithm;

use super::entry::TrustRegistryEntry;

/// Keys currently trusted for one issuer.
#[derive(Debug, Clone)]
pub struct IssuerKeys {
    issuer: String,
    keys: Vec<TrustRegistryEntry>,
}

impl IssuerKeys {
    /// Issuer these keys sign for.
    #[inline]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Active key with the given id.
    pub fn key(&self, key_id: &str, now: Timestamp) -> Option<&TrustRegistryEntry> {
        self.keys
            .iter()
            .find(|entry| entry.key_id == key_id && entry.is_active(now))
    }

    /// Active keys usable with `algorithm`, in registry order.
    pub fn active_for(
        &self,
        algorithm: Algorithm,
        now: Timestamp,
    ) -> impl Iterator<Item = &TrustRegistryEntry> {
        self.keys.iter().filter(move |entry| {
            entry.material.algorithm() == algorithm && entry.is_active(now)
        })
    }

    /// All keys, including ones that expired since the snapshot was built.
    #[inline]
    pub fn entries(&self) -> &[TrustRegistryEntry] {
        &self.keys
    }
}

/// Complete, internally consistent view of every trusted issuer.
///
/// Snapshots are never mutated after construction; a refresh builds a new
/// snapshot and swaps it in whole.
#[derive(Debug, Clone)]
pub struct TrustSnapshot {
    issuers: HashMap<String, Arc<IssuerKeys>>,
    built_at: Timestamp,
    revision: u64,
}

/// Counters describing how a snapshot was assembled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub issuers: usize,
    pub keys: usize,
    /// Keys carried over from the previous snapshot because they were
    /// rotated out but have not expired yet.
    pub retained: usize,
    /// Fetched keys discarded because they were already expired.
    pub discarded: usize,
}

impl TrustSnapshot {
    /// Snapshot trusting nothing.
    pub fn empty() -> Self {
        Self {
            issuers: HashMap::new(),
            built_at: Timestamp::UNIX_EPOCH,
            revision: 0,
        }
    }

    /// Builds the successor of `previous` from freshly fetched entries.
    ///
    /// Fetched entries replace previous entries with the same issuer and key
    /// id and keep the expiry their source published, if any. Previous
    /// entries that the fetch no longer publishes are retained until their
    /// own expiry, so tokens signed before a key rotation stay valid. A
    /// retired entry without an expiry is given one `retention` after `now`.
    /// Expired entries are dropped.
    pub fn build(
        fetched: Vec<TrustRegistryEntry>,
        previous: &TrustSnapshot,
        now: Timestamp,
        retention: SignedDuration,
    ) -> (Self, SnapshotStats) {
        let mut stats = SnapshotStats::default();
        let mut grouped: HashMap<String, Vec<TrustRegistryEntry>> = HashMap::new();

        for entry in fetched {
            if !entry.is_active(now) {
                stats.discarded += 1;
                continue;
            }

            let keys = grouped.entry(entry.issuer.clone()).or_default();
            match keys.iter_mut().find(|existing| existing.key_id == entry.key_id) {
                Some(existing) => *existing = entry,
                None => keys.push(entry),
            }
        }

        let retire_at = now.checked_add(retention).unwrap_or(Timestamp::MAX);
        let retire = |entry: &TrustRegistryEntry| match entry.expires_at {
            Some(_) => entry.clone(),
            None => entry.clone().with_expiry(retire_at),
        };

        for (issuer, previous_keys) in &previous.issuers {
            for entry in previous_keys.entries() {
                if !entry.is_active(now) {
                    continue;
                }

                match grouped.entry(issuer.clone()) {
                    Entry::Occupied(mut keys) => {
                        let keys = keys.get_mut();
                        if keys.iter().all(|fresh| fresh.key_id != entry.key_id) {
                            keys.push(retire(entry));
                            stats.retained += 1;
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(vec![retire(entry)]);
                        stats.retained += 1;
                    }
                }
            }
        }

        stats.issuers = grouped.len();
        stats.keys = grouped.values().map(Vec::len).sum();

        let issuers = grouped
            .into_iter()
            .map(|(issuer, keys)| {
                let keys = Arc::new(IssuerKeys {
                    issuer: issuer.clone(),
                    keys,
                });
                (issuer, keys)
            })
            .collect();

        let snapshot = Self {
            issuers,
            built_at: now,
            revision: previous.revision + 1,
        };

        (snapshot, stats)
    }

    /// Keys of `issuer`, if it is trusted.
    #[inline]
    pub fn get(&self, issuer: &str) -> Option<&Arc<IssuerKeys>> {
        self.issuers.get(issuer)
    }

    /// Trusted issuers.
    pub fn issuers(&self) -> impl Iterator<Item = &str> {
        self.issuers.keys().map(String::as_str)
    }

    /// Number of trusted issuers.
    #[inline]
    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    /// Returns `true` if no issuer is trusted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }

    /// When this snapshot was built.
    #[inline]
    pub fn built_at(&self) -> Timestamp {
        self.built_at
    }

    /// Monotonic counter incremented by every successful refresh.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for TrustSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
