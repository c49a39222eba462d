//! Loader for an identity provider's JSON Web Key Set.

use async_trait::async_trait;
use jsonwebtoken::jwk::{
    AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse,
};
use jsonwebtoken::{Algorithm, DecodingKey};
use url::Url;

use super::entry::{KeyMaterial, TrustRegistryEntry, fingerprint};
use super::loader::RegistryLoader;
use crate::utility::tracing_targets::TRACING_TARGET_REGISTRY as TRACING_TARGET;
use crate::{Error, Result};

/// Pulls signing keys from a JWKS endpoint and attributes them to a single
/// issuer.
#[derive(Debug, Clone)]
pub struct JwksLoader {
    client: reqwest::Client,
    jwks_url: Url,
    issuer: String,
}

impl JwksLoader {
    /// Creates a loader for `issuer`'s key set published at `jwks_url`.
    pub fn new(client: reqwest::Client, jwks_url: Url, issuer: impl Into<String>) -> Self {
        Self {
            client,
            jwks_url,
            issuer: issuer.into(),
        }
    }

    /// Converts a key set into trust entries for `issuer`.
    ///
    /// Encryption keys, symmetric keys and keys whose algorithm cannot be
    /// determined are skipped. JWKS documents carry no expiry, so keys stay
    /// valid while the set publishes them.
    pub fn entries_from_set(issuer: &str, set: &JwkSet) -> Vec<TrustRegistryEntry> {
        set.keys
            .iter()
            .filter_map(|jwk| {
                if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                    return None;
                }

                let key_id = jwk.common.key_id.clone().unwrap_or_else(|| {
                    fingerprint(&serde_json::to_vec(jwk).unwrap_or_default())
                });

                let Some(algorithm) = signing_algorithm(jwk) else {
                    tracing::debug!(
                        target: TRACING_TARGET,
                        issuer = %issuer,
                        key_id = %key_id,
                        "skipping JWK without a supported signing algorithm",
                    );
                    return None;
                };

                let key = match DecodingKey::from_jwk(jwk) {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(
                            target: TRACING_TARGET,
                            issuer = %issuer,
                            key_id = %key_id,
                            error = %e,
                            "skipping undecodable JWK",
                        );
                        return None;
                    }
                };

                Some(TrustRegistryEntry {
                    issuer: issuer.to_owned(),
                    key_id,
                    material: KeyMaterial::new(algorithm, key),
                    expires_at: None,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RegistryLoader for JwksLoader {
    fn source(&self) -> &str {
        self.jwks_url.as_str()
    }

    async fn load(&self) -> Result<Vec<TrustRegistryEntry>> {
        tracing::debug!(
            target: TRACING_TARGET,
            jwks_url = %self.jwks_url,
            issuer = %self.issuer,
            "fetching key set",
        );

        let response = self
            .client
            .get(self.jwks_url.clone())
            .send()
            .await
            .map_err(|e| Error::external("jwks", "request failed").with_source(e))?
            .error_for_status()
            .map_err(|e| Error::external("jwks", "endpoint returned an error status").with_source(e))?;

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| Error::external("jwks", "invalid key set").with_source(e))?;

        Ok(Self::entries_from_set(&self.issuer, &set))
    }
}

/// Determines the signing algorithm of a key, preferring its `alg` member.
fn signing_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    if let Some(declared) = &jwk.common.key_algorithm {
        return match declared {
            KeyAlgorithm::RS256 => Some(Algorithm::RS256),
            KeyAlgorithm::RS384 => Some(Algorithm::RS384),
            KeyAlgorithm::RS512 => Some(Algorithm::RS512),
            KeyAlgorithm::PS256 => Some(Algorithm::PS256),
            KeyAlgorithm::PS384 => Some(Algorithm::PS384),
            KeyAlgorithm::PS512 => Some(Algorithm::PS512),
            KeyAlgorithm::ES256 => Some(Algorithm::ES256),
            KeyAlgorithm::ES384 => Some(Algorithm::ES384),
            KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
            _ => None,
        };
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Some(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(params) => match params.curve {
            EllipticCurve::P256 => Some(Algorithm::ES256),
            EllipticCurve::P384 => Some(Algorithm::ES384),
            _ => None,
        },
        AlgorithmParameters::OctetKeyPair(params) => match params.curve {
            EllipticCurve::Ed25519 => Some(Algorithm::EdDSA),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn key_set(json: serde_json::Value) -> JwkSet {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn converts_signing_keys() {
        let set = key_set(serde_json::json!({
            "keys": [{
                "kty": "OKP",
                "crv": "Ed25519",
                "x": testing::ADMIN_PUBLIC_KEY_X,
                "kid": testing::ADMIN_KEY_ID,
                "use": "sig",
                "alg": "EdDSA"
            }]
        }));

        let entries = JwksLoader::entries_from_set(testing::ADMIN_ISSUER, &set);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].issuer, testing::ADMIN_ISSUER);
        assert_eq!(entries[0].key_id, testing::ADMIN_KEY_ID);
        assert_eq!(entries[0].material.algorithm(), Algorithm::EdDSA);
        assert_eq!(entries[0].expires_at, None);
    }

    #[test]
    fn infers_algorithm_from_curve() {
        let set = key_set(serde_json::json!({
            "keys": [{ "kty": "OKP", "crv": "Ed25519", "x": testing::ADMIN_PUBLIC_KEY_X }]
        }));

        let entries = JwksLoader::entries_from_set(testing::ADMIN_ISSUER, &set);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].material.algorithm(), Algorithm::EdDSA);
        assert_eq!(entries[0].key_id.len(), 64);
    }

    #[test]
    fn skips_encryption_and_symmetric_keys() {
        let set = key_set(serde_json::json!({
            "keys": [
                { "kty": "OKP", "crv": "Ed25519", "x": testing::ADMIN_PUBLIC_KEY_X, "use": "enc", "kid": "enc" },
                { "kty": "oct", "k": "c2VjcmV0", "kid": "hmac" }
            ]
        }));

        let entries = JwksLoader::entries_from_set(testing::ADMIN_ISSUER, &set);
        assert!(entries.is_empty());
    }
}
