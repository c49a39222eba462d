use std::borrow::Cow;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};

/// Reason a credential failed verification.
///
/// Every variant maps to `401 Unauthorized`: the caller could not be
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum VerificationError {
    /// The credential could not be parsed.
    #[error("credential is malformed")]
    Malformed,
    /// No trusted key exists for the token's issuer or key id.
    #[error("token issuer is not trusted")]
    UntrustedIssuer,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token audience does not match")]
    AudienceMismatch,
    /// A claim this verifier depends on is absent.
    #[error("required claim '{0}' is missing")]
    MissingRequiredClaim(Cow<'static, str>),
    /// The token is valid but its caller class is not accepted here.
    #[error("token does not satisfy '{0}'")]
    PredicateFailed(&'static str),
}

impl VerificationError {
    /// Stable snake-case code for logs.
    #[inline]
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

impl From<JwtError> for VerificationError {
    fn from(error: JwtError) -> Self {
        match error.kind() {
            JwtErrorKind::ExpiredSignature => Self::Expired,
            JwtErrorKind::ImmatureSignature => Self::NotYetValid,
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidKeyFormat
            | JwtErrorKind::InvalidEcdsaKey
            | JwtErrorKind::InvalidRsaKey(_) => Self::BadSignature,
            JwtErrorKind::InvalidAudience => Self::AudienceMismatch,
            JwtErrorKind::InvalidIssuer => Self::UntrustedIssuer,
            JwtErrorKind::MissingRequiredClaim(claim) => {
                Self::MissingRequiredClaim(Cow::Owned(claim.clone()))
            }
            _ => Self::Malformed,
        }
    }
}
