//! Token verifiers.
//!
//! All verifiers share one pipeline:
//!
//! 1. parse the token structure ([`VerificationError::Malformed`]);
//! 2. resolve the issuer's keys in the trust registry
//!    ([`VerificationError::UntrustedIssuer`]);
//! 3. check signature, expiry and audience with a fixed clock skew;
//! 4. decode the claims ([`VerificationError::MissingRequiredClaim`]);
//! 5. apply the verifier's predicate ([`VerificationError::PredicateFailed`]).
//!
//! Verification is CPU-only: the registry snapshot is loaded once per call
//! and no I/O happens on this path.

mod error;

use std::sync::Arc;

use jiff::Timestamp;
use jsonwebtoken::{Algorithm, Validation, decode};
use serde::de::DeserializeOwned;

pub use self::error::VerificationError;
use crate::claims::{Claims, TokenClaims};
use crate::credential::UnverifiedToken;
use crate::registry::{TrustRegistry, TrustRegistryEntry};
use crate::utility::tracing_targets::TRACING_TARGET_VERIFY as TRACING_TARGET;

/// Tolerated clock difference between issuers and this service, in seconds.
pub const CLOCK_SKEW_SECS: u64 = 30;

/// Post-verification requirement a verifier places on central tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum VerifierKind {
    /// Any well-formed, unexpired, correctly signed token.
    Central,
    /// Service tokens of services owned by this organization.
    FirstPartyService,
    /// Service tokens of third-party integrations.
    ThirdPartyService,
}

impl VerifierKind {
    /// Checks the predicate against decoded claims.
    pub fn check(self, token: &TokenClaims) -> Result<(), VerificationError> {
        let service = match self {
            Self::Central => return Ok(()),
            Self::FirstPartyService | Self::ThirdPartyService => token
                .service
                .ok_or(VerificationError::MissingRequiredClaim("service".into()))?,
        };

        if !service {
            return Err(VerificationError::PredicateFailed("service"));
        }

        match (self, token.first_party) {
            (Self::FirstPartyService, false) => Err(VerificationError::PredicateFailed("first_party")),
            (Self::ThirdPartyService, true) => Err(VerificationError::PredicateFailed("third_party")),
            _ => Ok(()),
        }
    }
}

/// Verifier for tokens of the central identity trust domain.
///
/// Cheap to clone; clones share the registry handle.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    kind: VerifierKind,
    registry: TrustRegistry,
    audiences: Arc<[String]>,
}

impl TokenVerifier {
    /// Creates a verifier trusting the issuers of `registry`.
    pub fn new(kind: VerifierKind, registry: TrustRegistry) -> Self {
        Self {
            kind,
            registry,
            audiences: Arc::from(Vec::new()),
        }
    }

    /// Restricts accepted tokens to the given audiences.
    ///
    /// With no audiences configured the `aud` claim is not checked.
    pub fn with_audiences(mut self, audiences: impl IntoIterator<Item = String>) -> Self {
        self.audiences = audiences.into_iter().collect();
        self
    }

    #[inline]
    pub fn kind(&self) -> VerifierKind {
        self.kind
    }

    /// Verifies a compact token and returns its normalized claims.
    pub fn verify(&self, raw: &str) -> Result<Claims, VerificationError> {
        let result = UnverifiedToken::inspect(raw).and_then(|token| {
            let decoded: TokenClaims = decode_trusted(&self.registry, &token, raw, &self.audiences)?;
            self.kind.check(&decoded)?;
            Ok(Claims::from_token(decoded))
        });

        if let Err(ref e) = result {
            tracing::debug!(
                target: TRACING_TARGET,
                verifier = %self.kind,
                registry = %self.registry.name(),
                reason = e.code(),
                "token rejected",
            );
        }

        result
    }
}

/// Verifies `raw` against the keys `registry` holds for its issuer and
/// decodes the payload as `T`.
///
/// When the token names a `kid`, only that key is tried. Otherwise every
/// active key of the issuer with the header's algorithm is tried in order.
pub(crate) fn decode_trusted<T: DeserializeOwned>(
    registry: &TrustRegistry,
    token: &UnverifiedToken,
    raw: &str,
    audiences: &[String],
) -> Result<T, VerificationError> {
    let issuer = token.issuer().ok_or(VerificationError::UntrustedIssuer)?;
    let snapshot = registry.snapshot();
    let keys = snapshot
        .get(issuer)
        .ok_or(VerificationError::UntrustedIssuer)?;

    let now = Timestamp::now();
    let candidates: Vec<&TrustRegistryEntry> = match token.key_id() {
        Some(key_id) => keys.key(key_id, now).into_iter().collect(),
        None => keys.active_for(token.header().alg, now).collect(),
    };

    if candidates.is_empty() {
        return Err(VerificationError::UntrustedIssuer);
    }

    let mut last_error = VerificationError::BadSignature;
    for entry in candidates {
        let validation = validation(entry.material.algorithm(), issuer, audiences);
        match decode::<T>(raw, entry.material.decoding_key(), &validation) {
            Ok(data) => return Ok(data.claims),
            Err(e) => match VerificationError::from(e) {
                VerificationError::BadSignature => last_error = VerificationError::BadSignature,
                other => return Err(other),
            },
        }
    }

    Err(last_error)
}

fn validation(algorithm: Algorithm, issuer: &str, audiences: &[String]) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.leeway = CLOCK_SKEW_SECS;
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.set_issuer(&[issuer]);
    validation.set_required_spec_claims(&["exp", "iss"]);

    if audiences.is_empty() {
        validation.validate_aud = false;
    } else {
        validation.set_audience(audiences);
    }

    validation
}
