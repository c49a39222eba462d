//! Loader for the central service registry.
//!
//! The core building block publishes the public keys of registered services
//! at `GET {base}/bbs/service-regs?ids=<comma separated ids>`:
//!
//! ```json
//! [
//!   {
//!     "service_id": "core",
//!     "host": "https://api.example.edu/core",
//!     "pub_key": { "key_pem": "-----BEGIN PUBLIC KEY-----...", "alg": "RS256" }
//!   }
//! ]
//! ```
//!
//! Each record becomes one trust entry whose issuer is the service `host`.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Deserialize;
use url::Url;

use super::entry::{KeyMaterial, TrustRegistryEntry, fingerprint};
use super::loader::RegistryLoader;
use crate::utility::tracing_targets::TRACING_TARGET_REGISTRY as TRACING_TARGET;
use crate::{Error, Result};

/// Published public key of a registered service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceRegKey {
    pub key_pem: String,
    pub alg: String,
}

/// Registration record of one service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceReg {
    pub service_id: String,
    pub host: String,
    #[serde(default)]
    pub pub_key: Option<ServiceRegKey>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

/// Pulls service registrations from the central registry.
#[derive(Debug, Clone)]
pub struct ServiceRegistryLoader {
    client: reqwest::Client,
    endpoint: Url,
    service_ids: Vec<String>,
}

impl ServiceRegistryLoader {
    /// Creates a loader for the registry hosted at `base_url`.
    pub fn new(client: reqwest::Client, base_url: &Url, service_ids: Vec<String>) -> Result<Self> {
        if service_ids.is_empty() {
            return Err(Error::config("service registry needs at least one service id"));
        }

        let endpoint = format!("{}/bbs/service-regs", base_url.as_str().trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| Error::config("invalid service registry URL").with_source(e))?;

        Ok(Self {
            client,
            endpoint,
            service_ids,
        })
    }

    /// Registry endpoint without the query string.
    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Turns registration records into trust entries.
    ///
    /// Records without a usable key are skipped with a warning rather than
    /// failing the whole refresh. A record's `expires_at` is kept as
    /// published; keys without one stay valid while they are published.
    pub fn entries_from_records(records: Vec<ServiceReg>) -> Vec<TrustRegistryEntry> {
        records
            .into_iter()
            .filter_map(|record| {
                let Some(pub_key) = record.pub_key else {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        service_id = %record.service_id,
                        "service registration has no public key, skipping",
                    );
                    return None;
                };

                let material = match KeyMaterial::from_pem_with_name(
                    &pub_key.alg,
                    pub_key.key_pem.as_bytes(),
                ) {
                    Ok(material) => material,
                    Err(e) => {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            service_id = %record.service_id,
                            alg = %pub_key.alg,
                            error = %e,
                            "service registration key is unusable, skipping",
                        );
                        return None;
                    }
                };

                let key_id = record
                    .key_id
                    .unwrap_or_else(|| fingerprint(pub_key.key_pem.trim().as_bytes()));

                Some(TrustRegistryEntry {
                    issuer: record.host,
                    key_id,
                    material,
                    expires_at: record.expires_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RegistryLoader for ServiceRegistryLoader {
    fn source(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn load(&self) -> Result<Vec<TrustRegistryEntry>> {
        let ids = self.service_ids.join(",");

        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %self.endpoint,
            ids = %ids,
            "fetching service registrations",
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("ids", ids.as_str())])
            .send()
            .await
            .map_err(|e| Error::external("service-regs", "request failed").with_source(e))?;

        let response = response.error_for_status().map_err(|e| {
            Error::external("service-regs", "registry returned an error status").with_source(e)
        })?;

        let records: Vec<ServiceReg> = response
            .json()
            .await
            .map_err(|e| Error::external("service-regs", "invalid response body").with_source(e))?;

        Ok(Self::entries_from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn records(json: serde_json::Value) -> Vec<ServiceReg> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn endpoint_is_derived_from_base_url() {
        let base = Url::parse("https://api.example.edu/core/").unwrap();
        let loader =
            ServiceRegistryLoader::new(reqwest::Client::new(), &base, vec!["core".to_owned()])
                .unwrap();
        assert_eq!(
            loader.endpoint().as_str(),
            "https://api.example.edu/core/bbs/service-regs"
        );
    }

    #[test]
    fn requires_service_ids() {
        let base = Url::parse("https://api.example.edu/core").unwrap();
        let result = ServiceRegistryLoader::new(reqwest::Client::new(), &base, Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn converts_records_without_inventing_expiry() {
        let entries = ServiceRegistryLoader::entries_from_records(
            records(serde_json::json!([{
                "service_id": "core",
                "host": testing::CENTRAL_ISSUER,
                "pub_key": { "key_pem": testing::CENTRAL_PUBLIC_KEY, "alg": "EdDSA" },
                "name": "Core Building Block"
            }])),
        );

        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.issuer, testing::CENTRAL_ISSUER);
        assert_eq!(entry.key_id, fingerprint(testing::CENTRAL_PUBLIC_KEY.trim().as_bytes()));
        assert_eq!(entry.expires_at, None);
    }

    #[test]
    fn explicit_key_id_and_expiry_are_kept() {
        let entries = ServiceRegistryLoader::entries_from_records(
            records(serde_json::json!([{
                "service_id": "core",
                "host": testing::CENTRAL_ISSUER,
                "key_id": "core-2024",
                "expires_at": "2100-01-01T00:00:00Z",
                "pub_key": { "key_pem": testing::CENTRAL_PUBLIC_KEY, "alg": "EdDSA" }
            }])),
        );

        assert_eq!(entries[0].key_id, "core-2024");
        assert_eq!(
            entries[0].expires_at,
            Some("2100-01-01T00:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn skips_records_without_usable_keys() {
        let entries = ServiceRegistryLoader::entries_from_records(
            records(serde_json::json!([
                { "service_id": "a", "host": "https://a" },
                { "service_id": "b", "host": "https://b", "pub_key": { "key_pem": "junk", "alg": "RS256" } },
                { "service_id": "c", "host": "https://c", "pub_key": { "key_pem": testing::CENTRAL_PUBLIC_KEY, "alg": "EdDSA" } }
            ])),
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].issuer, "https://c");
    }
}
