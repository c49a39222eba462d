//! Signing material of a single trusted key.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, DecodingKey};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Verification key together with the only algorithm it may be used with.
///
/// Pinning the algorithm to the key prevents a token header from choosing a
/// weaker algorithm than the issuer published.
#[derive(Clone)]
pub struct KeyMaterial {
    algorithm: Algorithm,
    key: DecodingKey,
}

impl KeyMaterial {
    /// Wraps an already decoded key.
    pub fn new(algorithm: Algorithm, key: DecodingKey) -> Self {
        Self { algorithm, key }
    }

    /// Decodes a PEM encoded public key for `algorithm`.
    ///
    /// Symmetric algorithms are refused: registry material is always public.
    pub fn from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<Self> {
        let key = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(pem),
            other => {
                return Err(Error::config(format!(
                    "algorithm {other:?} cannot be used for published keys"
                )));
            }
        }
        .map_err(|e| Error::config("invalid public key PEM").with_source(e))?;

        Ok(Self::new(algorithm, key))
    }

    /// Parses an algorithm name such as `RS256` and decodes the PEM with it.
    pub fn from_pem_with_name(algorithm: &str, pem: &[u8]) -> Result<Self> {
        let algorithm = Algorithm::from_str(algorithm.trim()).map_err(|e| {
            Error::config(format!("unknown key algorithm '{algorithm}'")).with_source(e)
        })?;
        Self::from_pem(algorithm, pem)
    }

    /// Algorithm this key verifies.
    #[inline]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Decoding key handed to the JWT library.
    #[inline]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// One trusted key of one issuer.
#[derive(Debug, Clone)]
pub struct TrustRegistryEntry {
    /// Issuer (`iss` claim) the key signs for.
    pub issuer: String,
    /// Key identifier, matched against the token's `kid` header.
    pub key_id: String,
    pub material: KeyMaterial,
    /// End of the key's validity. `None` means valid until the next refresh
    /// stops publishing it.
    pub expires_at: Option<Timestamp>,
}

impl TrustRegistryEntry {
    /// Creates an entry without an expiry.
    pub fn new(issuer: impl Into<String>, key_id: impl Into<String>, material: KeyMaterial) -> Self {
        Self {
            issuer: issuer.into(),
            key_id: key_id.into(),
            material,
            expires_at: None,
        }
    }

    /// Sets the entry's expiry.
    pub fn with_expiry(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns `true` if the key may still be used at `now`.
    #[inline]
    pub fn is_active(&self, now: Timestamp) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

/// Hex encoded SHA-256 of key material, used when the source publishes no
/// key id.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;
    use crate::testing;

    #[test]
    fn decodes_ed25519_pem() {
        let material = KeyMaterial::from_pem_with_name("EdDSA", testing::CENTRAL_PUBLIC_KEY.as_bytes())
            .unwrap();
        assert_eq!(material.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn rejects_symmetric_and_unknown_algorithms() {
        let pem = testing::CENTRAL_PUBLIC_KEY.as_bytes();
        assert!(KeyMaterial::from_pem(Algorithm::HS256, pem).is_err());
        assert!(KeyMaterial::from_pem_with_name("XX999", pem).is_err());
    }

    #[test]
    fn rejects_garbage_pem() {
        assert!(KeyMaterial::from_pem(Algorithm::EdDSA, b"not a key").is_err());
    }

    #[test]
    fn activity_follows_expiry() {
        let material = testing::central_key_material();
        let now = Timestamp::now();
        let entry = TrustRegistryEntry::new("https://core", "k1", material);
        assert!(entry.is_active(now));

        let expired = entry.clone().with_expiry(now - SignedDuration::from_secs(1));
        assert!(!expired.is_active(now));

        let live = entry.with_expiry(now + SignedDuration::from_secs(60));
        assert!(live.is_active(now));
    }

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint(b"key");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(b"key"));
        assert_ne!(a, fingerprint(b"other"));
    }
}
