use axum::http::StatusCode;

use crate::claims::{Claims, Identity};
use crate::verify::VerificationError;

/// Why a strategy denied a request.
///
/// Reasons are for audit logs only and are never sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    /// The request carried none of the credentials the strategy accepts.
    #[error("no credential presented")]
    MissingCredential,
    #[error("api key is not recognized")]
    InvalidApiKey,
    /// A bearer token failed verification.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// A valid token of an anonymous caller on an endpoint requiring an
    /// identified one.
    #[error("anonymous callers are not allowed")]
    AnonymousSubject,
    /// The administrative identity check did not authenticate the caller.
    #[error("administrator is not authenticated")]
    AdminUnauthenticated,
    /// Authenticated, but none of the caller's permissions is granted.
    #[error("no policy rule grants access")]
    PolicyDenied,
    /// Authenticated administrator, but none of their groups is granted.
    #[error("no group of the administrator is granted access")]
    GroupMismatch,
}

impl DenialReason {
    /// Status the request-handling layer answers with.
    ///
    /// `403` means the caller is known but lacks permission, `401` that the
    /// caller could not be authenticated.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AnonymousSubject | Self::PolicyDenied | Self::GroupMismatch => {
                StatusCode::FORBIDDEN
            }
            Self::MissingCredential
            | Self::InvalidApiKey
            | Self::Verification(_)
            | Self::AdminUnauthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable snake-case code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidApiKey => "invalid_api_key",
            Self::Verification(e) => e.code(),
            Self::AnonymousSubject => "anonymous_subject",
            Self::AdminUnauthenticated => "admin_unauthenticated",
            Self::PolicyDenied => "policy_denied",
            Self::GroupMismatch => "group_mismatch",
        }
    }
}

/// Outcome of one strategy for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDecision {
    pub allowed: bool,
    /// `200` when allowed, otherwise `401` or `403`.
    pub status: StatusCode,
    /// Authenticated caller. Absent for API-key access and for requests
    /// that failed authentication; present on `403` denials.
    pub identity: Option<Identity>,
    pub reason: Option<DenialReason>,
}

impl AuthDecision {
    pub fn allow(identity: Option<Identity>) -> Self {
        Self {
            allowed: true,
            status: StatusCode::OK,
            identity,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<DenialReason>) -> Self {
        let reason = reason.into();
        Self {
            allowed: false,
            status: reason.status(),
            identity: None,
            reason: Some(reason),
        }
    }

    /// Denial of an authenticated caller.
    pub fn deny_with_identity(reason: DenialReason, identity: impl Into<Identity>) -> Self {
        Self {
            identity: Some(identity.into()),
            ..Self::deny(reason)
        }
    }

    /// Central-identity claims of the caller, if any.
    pub fn claims(&self) -> Option<&Claims> {
        self.identity.as_ref().and_then(Identity::claims)
    }

    /// Subject for audit records.
    pub fn subject(&self) -> &str {
        self.identity
            .as_ref()
            .map(Identity::subject)
            .filter(|subject| !subject.is_empty())
            .unwrap_or("anonymous")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_separate_unauthenticated_from_unauthorized() {
        assert_eq!(DenialReason::PolicyDenied.status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::GroupMismatch.status(), StatusCode::FORBIDDEN);
        assert_eq!(DenialReason::AnonymousSubject.status(), StatusCode::FORBIDDEN);

        assert_eq!(DenialReason::MissingCredential.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DenialReason::AdminUnauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            DenialReason::from(VerificationError::PredicateFailed("service")).status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn verification_codes_pass_through() {
        let reason = DenialReason::from(VerificationError::Expired);
        assert_eq!(reason.code(), "expired");
        assert_eq!(reason.to_string(), "token has expired");
    }

    #[test]
    fn deny_carries_status_of_reason() {
        let decision = AuthDecision::deny(VerificationError::BadSignature);
        assert!(!decision.allowed);
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(decision.subject(), "anonymous");

        let decision = AuthDecision::allow(None);
        assert!(decision.allowed);
        assert_eq!(decision.status, StatusCode::OK);
        assert!(decision.claims().is_none());
    }
}
