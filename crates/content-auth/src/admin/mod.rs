//! Administrative identity check.
//!
//! Administrators authenticate against an external identity provider whose
//! signing keys live in their own [`TrustRegistry`], separate from the
//! central identity service. The token's subject and group claims are
//! configurable because identity providers name them differently.

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::credential::{UnverifiedToken, bearer_token};
use crate::registry::TrustRegistry;
use crate::request::AuthRequest;
use crate::utility::tracing_targets::TRACING_TARGET_ADMIN as TRACING_TARGET;
use crate::verify::{VerificationError, decode_trusted};

/// Default claim carrying the administrator's stable identifier.
pub const DEFAULT_SUBJECT_CLAIM: &str = "uin";

/// Default claim carrying the administrator's group memberships.
pub const DEFAULT_GROUPS_CLAIM: &str = "groups";

/// A verified administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    /// Stable user identifier issued by the identity provider.
    pub subject_id: String,
    /// Group memberships, in token order. Used as policy roles.
    pub groups: Vec<String>,
}

impl AdminIdentity {
    /// Group names as string slices, for policy lookups.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }
}

/// Verifier for administrative identity tokens.
#[derive(Debug, Clone)]
pub struct AdminVerifier {
    registry: TrustRegistry,
    issuer: Arc<str>,
    audiences: Arc<[String]>,
    subject_claim: Arc<str>,
    groups_claim: Arc<str>,
}

impl AdminVerifier {
    /// Creates a verifier for tokens issued by `issuer`.
    pub fn new(registry: TrustRegistry, issuer: impl Into<String>) -> Self {
        Self {
            registry,
            issuer: Arc::from(issuer.into()),
            audiences: Arc::from(Vec::new()),
            subject_claim: Arc::from(DEFAULT_SUBJECT_CLAIM),
            groups_claim: Arc::from(DEFAULT_GROUPS_CLAIM),
        }
    }

    /// Restricts accepted tokens to the given audiences, typically the
    /// client id registered with the identity provider.
    pub fn with_audiences(mut self, audiences: impl IntoIterator<Item = String>) -> Self {
        self.audiences = audiences.into_iter().collect();
        self
    }

    pub fn with_subject_claim(mut self, claim: impl Into<String>) -> Self {
        self.subject_claim = Arc::from(claim.into());
        self
    }

    pub fn with_groups_claim(mut self, claim: impl Into<String>) -> Self {
        self.groups_claim = Arc::from(claim.into());
        self
    }

    #[inline]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[inline]
    pub fn registry(&self) -> &TrustRegistry {
        &self.registry
    }

    /// Verifies an identity token and extracts subject and groups.
    pub fn verify(&self, raw: &str) -> Result<AdminIdentity, VerificationError> {
        let token = UnverifiedToken::inspect(raw)?;
        if token.issuer() != Some(self.issuer()) {
            return Err(VerificationError::UntrustedIssuer);
        }

        let claims: Map<String, Value> =
            decode_trusted(&self.registry, &token, raw, &self.audiences)?;

        let subject_id = match claims.get(&*self.subject_claim) {
            Some(Value::String(subject)) if !subject.trim().is_empty() => subject.trim().to_owned(),
            _ => {
                return Err(VerificationError::MissingRequiredClaim(Cow::Owned(
                    self.subject_claim.to_string(),
                )));
            }
        };

        let groups = claims
            .get(&*self.groups_claim)
            .map(parse_groups)
            .unwrap_or_default();

        Ok(AdminIdentity { subject_id, groups })
    }

    /// Authenticates the request's bearer token as an administrator.
    ///
    /// Any failure, including a missing token or a token of another trust
    /// domain, yields `None`: the caller is simply not an authenticated
    /// administrator.
    pub fn check(&self, request: &AuthRequest<'_>) -> Option<AdminIdentity> {
        let token = match bearer_token(request.headers()) {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(target: TRACING_TARGET, reason = e.code(), "unreadable bearer credential");
                return None;
            }
        };

        match self.verify(token.as_str()) {
            Ok(identity) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    subject = %identity.subject_id,
                    groups = identity.groups.len(),
                    "administrator authenticated",
                );
                Some(identity)
            }
            Err(e) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    issuer = %self.issuer,
                    reason = e.code(),
                    "administrator token rejected",
                );
                None
            }
        }
    }
}

/// Accepts a JSON array of strings or a comma-separated string.
fn parse_groups(value: &Value) -> Vec<String> {
    let names: Vec<&str> = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        Value::String(joined) => joined.split(',').collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, HeaderValue, Method};

    use super::*;
    use crate::testing::{self, TokenBuilder};

    fn request_headers(bearer: Option<String>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = bearer {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        }
        headers
    }

    #[test]
    fn verifies_subject_and_groups() {
        let verifier = testing::admin_verifier();
        let token = TokenBuilder::admin("651234567", &["content-admins", "staff"]).sign();

        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.subject_id, "651234567");
        assert_eq!(identity.groups, ["content-admins", "staff"]);
    }

    #[test]
    fn accepts_comma_separated_groups() {
        let verifier = testing::admin_verifier();
        let token = TokenBuilder::admin("651234567", &[])
            .claim("groups", "content-admins, staff,")
            .sign();

        let identity = verifier.verify(&token).unwrap();
        assert_eq!(identity.groups, ["content-admins", "staff"]);
    }

    #[test]
    fn missing_subject_is_rejected() {
        let verifier = testing::admin_verifier();
        let token = TokenBuilder::admin("651234567", &["content-admins"])
            .remove_claim("uin")
            .sign();

        assert_eq!(
            verifier.verify(&token).unwrap_err(),
            VerificationError::MissingRequiredClaim("uin".into())
        );
    }

    #[test]
    fn subject_claim_is_configurable() {
        let verifier = testing::admin_verifier().with_subject_claim("sub");
        let token = TokenBuilder::admin("651234567", &[]).remove_claim("uin").sign();
        assert_eq!(verifier.verify(&token).unwrap().subject_id, "651234567");
    }

    #[test]
    fn central_tokens_are_not_admin_tokens() {
        let verifier = testing::admin_verifier();
        let token = TokenBuilder::central().sign();
        assert_eq!(verifier.verify(&token).unwrap_err(), VerificationError::UntrustedIssuer);
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let verifier = testing::admin_verifier();
        let token = TokenBuilder::admin("651234567", &[]).claim("aud", "other-client").sign();
        assert_eq!(verifier.verify(&token).unwrap_err(), VerificationError::AudienceMismatch);
    }

    #[test]
    fn check_reports_unauthenticated_as_none() {
        let verifier = testing::admin_verifier();
        let method = Method::GET;

        let headers = request_headers(None);
        let request = AuthRequest::new(&method, "/admin/student_guides", &headers);
        assert!(verifier.check(&request).is_none());

        let expired = TokenBuilder::admin("651234567", &[]).expires_in(-3600).bearer();
        let headers = request_headers(Some(expired));
        let request = AuthRequest::new(&method, "/admin/student_guides", &headers);
        assert!(verifier.check(&request).is_none());

        let no_subject = TokenBuilder::admin("651234567", &[]).remove_claim("uin").bearer();
        let headers = request_headers(Some(no_subject));
        let request = AuthRequest::new(&method, "/admin/student_guides", &headers);
        assert!(verifier.check(&request).is_none());

        let valid = TokenBuilder::admin("651234567", &["content-admins"]).bearer();
        let headers = request_headers(Some(valid));
        let request = AuthRequest::new(&method, "/admin/student_guides", &headers);
        let identity = verifier.check(&request).unwrap();
        assert_eq!(identity.subject_id, "651234567");
    }
}
