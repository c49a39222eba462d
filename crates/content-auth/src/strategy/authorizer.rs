use std::sync::Arc;

use super::api_key::ApiKeySet;
use super::decision::{AuthDecision, DenialReason};
use super::kind::Strategy;
use crate::admin::AdminVerifier;
use crate::claims::{Claims, Identity};
use crate::credential::{BearerToken, Credential, api_key, bearer_token};
use crate::policy::PolicyTable;
use crate::registry::TrustRegistry;
use crate::request::AuthRequest;
use crate::utility::tracing_targets::TRACING_TARGET_AUTHORIZATION as TRACING_TARGET;
use crate::verify::{TokenVerifier, VerifierKind};

/// Components an [`Authorizer`] is assembled from.
#[derive(Debug, Clone)]
pub struct AuthorizerParts {
    pub api_keys: ApiKeySet,
    /// Trust registry of the central identity service.
    pub central: TrustRegistry,
    /// Accepted audiences of central tokens; empty disables the check.
    pub audiences: Vec<String>,
    /// Administrative identity check; without it admin strategies deny.
    pub admin: Option<AdminVerifier>,
    pub policy: PolicyTable,
}

/// Evaluates authorization strategies against requests.
///
/// Cheap to clone. Every decision is computed synchronously from the
/// request, the current trust snapshots and the policy table.
#[derive(Debug, Clone)]
pub struct Authorizer {
    inner: Arc<AuthorizerInner>,
}

#[derive(Debug)]
struct AuthorizerInner {
    api_keys: ApiKeySet,
    standard: TokenVerifier,
    first_party: TokenVerifier,
    third_party: TokenVerifier,
    admin: Option<AdminVerifier>,
    policy: PolicyTable,
}

impl Authorizer {
    pub fn new(parts: AuthorizerParts) -> Self {
        let verifier = |kind| {
            TokenVerifier::new(kind, parts.central.clone()).with_audiences(parts.audiences.clone())
        };

        let inner = AuthorizerInner {
            standard: verifier(VerifierKind::Central),
            first_party: verifier(VerifierKind::FirstPartyService),
            third_party: verifier(VerifierKind::ThirdPartyService),
            api_keys: parts.api_keys,
            admin: parts.admin,
            policy: parts.policy,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    #[inline]
    pub fn policy(&self) -> &PolicyTable {
        &self.inner.policy
    }

    #[inline]
    pub fn admin(&self) -> Option<&AdminVerifier> {
        self.inner.admin.as_ref()
    }

    /// Evaluates `strategy` and writes the audit record.
    ///
    /// Denials are logged at `warn` with the acting subject, the attempted
    /// resource and action, and the reason; allowed requests at `debug`.
    pub fn decide(&self, strategy: Strategy, request: &AuthRequest<'_>) -> AuthDecision {
        let decision = self.evaluate(strategy, request);

        match &decision.reason {
            Some(reason) => tracing::warn!(
                target: TRACING_TARGET,
                strategy = %strategy,
                subject = %decision.subject(),
                method = %request.method(),
                path = %request.path(),
                status = decision.status.as_u16(),
                reason = reason.code(),
                "request denied",
            ),
            None => tracing::debug!(
                target: TRACING_TARGET,
                strategy = %strategy,
                subject = %decision.subject(),
                method = %request.method(),
                path = %request.path(),
                "request allowed",
            ),
        }

        decision
    }

    pub fn api_key(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::ApiKey, request)
    }

    pub fn standard(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::Standard, request)
    }

    pub fn user(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::User, request)
    }

    pub fn permissions(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::Permissions, request)
    }

    pub fn admin_group(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::AdminGroup, request)
    }

    pub fn first_party_service(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::FirstPartyService, request)
    }

    pub fn third_party_service(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::ThirdPartyService, request)
    }

    pub fn api_key_or_token(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::ApiKeyOrToken, request)
    }

    pub fn admin_or_permissions(&self, request: &AuthRequest<'_>) -> AuthDecision {
        self.decide(Strategy::AdminOrPermissions, request)
    }

    fn evaluate(&self, strategy: Strategy, request: &AuthRequest<'_>) -> AuthDecision {
        match strategy {
            Strategy::ApiKey => self.eval_api_key(request),
            Strategy::Standard => self.eval_token(&self.inner.standard, request),
            Strategy::User => self.eval_user(request),
            Strategy::Permissions => self.eval_permissions(request),
            Strategy::AdminGroup => self.eval_admin_group(request),
            Strategy::FirstPartyService => self.eval_token(&self.inner.first_party, request),
            Strategy::ThirdPartyService => self.eval_token(&self.inner.third_party, request),
            Strategy::ApiKeyOrToken => match Credential::from_headers(request.headers()) {
                Ok(Some(Credential::ApiKey(key))) => self.check_api_key(key),
                Ok(Some(Credential::Bearer(token))) => {
                    self.eval_bearer(&self.inner.standard, &token)
                }
                Ok(None) => AuthDecision::deny(DenialReason::MissingCredential),
                Err(e) => AuthDecision::deny(e),
            },
            Strategy::AdminOrPermissions => {
                let decision = self.eval_admin_group(request);
                match decision.reason {
                    Some(DenialReason::AdminUnauthenticated) => self.eval_permissions(request),
                    _ => decision,
                }
            }
        }
    }

    fn eval_api_key(&self, request: &AuthRequest<'_>) -> AuthDecision {
        match api_key(request.headers()) {
            Some(key) => self.check_api_key(key),
            None => AuthDecision::deny(DenialReason::MissingCredential),
        }
    }

    fn check_api_key(&self, key: &str) -> AuthDecision {
        if self.inner.api_keys.contains(key) {
            AuthDecision::allow(None)
        } else {
            AuthDecision::deny(DenialReason::InvalidApiKey)
        }
    }

    fn eval_bearer(&self, verifier: &TokenVerifier, token: &BearerToken) -> AuthDecision {
        match verifier.verify(token.as_str()) {
            Ok(claims) => AuthDecision::allow(Some(claims.into())),
            Err(e) => AuthDecision::deny(e),
        }
    }

    /// Verifies the bearer token with `verifier`.
    fn verify(
        &self,
        verifier: &TokenVerifier,
        request: &AuthRequest<'_>,
    ) -> Result<Claims, DenialReason> {
        let token = bearer_token(request.headers())?.ok_or(DenialReason::MissingCredential)?;
        Ok(verifier.verify(token.as_str())?)
    }

    fn eval_token(&self, verifier: &TokenVerifier, request: &AuthRequest<'_>) -> AuthDecision {
        match self.verify(verifier, request) {
            Ok(claims) => AuthDecision::allow(Some(claims.into())),
            Err(reason) => AuthDecision::deny(reason),
        }
    }

    fn eval_user(&self, request: &AuthRequest<'_>) -> AuthDecision {
        match self.verify(&self.inner.standard, request) {
            Ok(claims) if claims.is_anonymous => {
                AuthDecision::deny_with_identity(DenialReason::AnonymousSubject, claims)
            }
            Ok(claims) => AuthDecision::allow(Some(claims.into())),
            Err(reason) => AuthDecision::deny(reason),
        }
    }

    fn eval_permissions(&self, request: &AuthRequest<'_>) -> AuthDecision {
        let claims = match self.verify(&self.inner.standard, request) {
            Ok(claims) => claims,
            Err(reason) => return AuthDecision::deny(reason),
        };

        if self.grants(claims.permission_names(), request) {
            AuthDecision::allow(Some(claims.into()))
        } else {
            AuthDecision::deny_with_identity(DenialReason::PolicyDenied, claims)
        }
    }

    fn eval_admin_group(&self, request: &AuthRequest<'_>) -> AuthDecision {
        let Some(identity) = self.inner.admin.as_ref().and_then(|admin| admin.check(request))
        else {
            return AuthDecision::deny(DenialReason::AdminUnauthenticated);
        };

        if self.grants(identity.group_names(), request) {
            AuthDecision::allow(Some(Identity::Admin(identity)))
        } else {
            AuthDecision::deny_with_identity(DenialReason::GroupMismatch, identity)
        }
    }

    /// Returns `true` if the policy table grants any of `roles` the request's
    /// action on its path. Stops at the first granted role.
    fn grants<'r>(&self, roles: impl IntoIterator<Item = &'r str>, request: &AuthRequest<'_>) -> bool {
        match self
            .inner
            .policy
            .authorize_any(roles, request.path(), request.action())
        {
            Some((role, rule)) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    role = %role,
                    rule = %rule,
                    "policy rule matched",
                );
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};

    use super::*;
    use crate::credential::API_KEY_HEADER;
    use crate::testing::{self, TokenBuilder};
    use crate::verify::VerificationError;

    fn bearer(token: &TokenBuilder) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&token.bearer()).unwrap());
        headers
    }

    fn with_api_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    fn decide(strategy: Strategy, method: Method, path: &str, headers: &HeaderMap) -> AuthDecision {
        let request = AuthRequest::new(&method, path, headers);
        testing::authorizer().decide(strategy, &request)
    }

    fn reason(decision: &AuthDecision) -> DenialReason {
        decision.reason.clone().unwrap()
    }

    #[test]
    fn api_key_allows_public_tier_without_claims() {
        let headers = with_api_key(testing::TEST_API_KEY);
        let decision = decide(Strategy::ApiKey, Method::GET, "/student_guides", &headers);
        assert!(decision.allowed);
        assert!(decision.identity.is_none());

        let headers = with_api_key("wrong");
        let decision = decide(Strategy::ApiKey, Method::GET, "/student_guides", &headers);
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reason(&decision), DenialReason::InvalidApiKey);

        let decision = decide(Strategy::ApiKey, Method::GET, "/student_guides", &HeaderMap::new());
        assert_eq!(reason(&decision), DenialReason::MissingCredential);
    }

    #[test]
    fn expired_token_is_unauthenticated_for_every_central_strategy() {
        let headers = bearer(&TokenBuilder::central().permissions("content.guides.write").expires_in(-3600));

        for strategy in [
            Strategy::Standard,
            Strategy::User,
            Strategy::Permissions,
            Strategy::ApiKeyOrToken,
            Strategy::AdminOrPermissions,
        ] {
            let decision = decide(strategy, Method::POST, "/admin/student_guides", &headers);
            assert_eq!(decision.status, StatusCode::UNAUTHORIZED, "{strategy}");
            assert_eq!(
                reason(&decision),
                DenialReason::Verification(VerificationError::Expired),
                "{strategy}"
            );
        }
    }

    #[test]
    fn missing_permission_is_forbidden() {
        let headers = bearer(&TokenBuilder::central().permissions("content.guides.read"));
        let decision = decide(Strategy::Permissions, Method::POST, "/admin/student_guides", &headers);

        assert_eq!(decision.status, StatusCode::FORBIDDEN);
        assert_eq!(reason(&decision), DenialReason::PolicyDenied);
        assert_eq!(decision.subject(), "user-1");
    }

    #[test]
    fn granted_permission_is_allowed() {
        let headers = bearer(&TokenBuilder::central().permissions("content.guides.read,content.guides.write"));
        let decision = decide(Strategy::Permissions, Method::DELETE, "/admin/student_guides/7", &headers);
        assert!(decision.allowed);
        assert_eq!(decision.claims().unwrap().subject, "user-1");
    }

    #[test]
    fn admin_group_grants_by_policy() {
        let headers = bearer(&TokenBuilder::admin("651234567", &["staff", "content-admins"]));
        let decision = decide(Strategy::AdminGroup, Method::POST, "/admin/student_guides", &headers);

        assert!(decision.allowed);
        let admin = decision.identity.as_ref().and_then(Identity::admin).unwrap();
        assert_eq!(admin.subject_id, "651234567");
    }

    #[test]
    fn admin_without_matching_group_is_forbidden() {
        let headers = bearer(&TokenBuilder::admin("651234567", &["staff"]));
        let decision = decide(Strategy::AdminGroup, Method::POST, "/admin/student_guides", &headers);
        assert_eq!(decision.status, StatusCode::FORBIDDEN);
        assert_eq!(reason(&decision), DenialReason::GroupMismatch);

        let headers = bearer(&TokenBuilder::admin("651234567", &["content-admins"]));
        let decision = decide(Strategy::AdminGroup, Method::DELETE, "/admin/student_guides/7", &headers);
        assert_eq!(reason(&decision), DenialReason::GroupMismatch);
    }

    #[test]
    fn admin_check_failure_is_unauthenticated() {
        let headers = bearer(&TokenBuilder::admin("651234567", &["content-admins"]).expires_in(-3600));
        let decision = decide(Strategy::AdminGroup, Method::POST, "/admin/student_guides", &headers);
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reason(&decision), DenialReason::AdminUnauthenticated);
    }

    #[test]
    fn service_classes_are_separated() {
        let headers = bearer(&TokenBuilder::central().subject("core").service(true).first_party(true));

        let decision = decide(Strategy::FirstPartyService, Method::GET, "/bbs/ping", &headers);
        assert!(decision.allowed);

        let decision = decide(Strategy::ThirdPartyService, Method::GET, "/tps/ping", &headers);
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            reason(&decision),
            DenialReason::Verification(VerificationError::PredicateFailed("third_party"))
        );
    }

    #[test]
    fn anonymous_tokens_pass_standard_but_not_user() {
        let headers = bearer(&TokenBuilder::central().subject("").anonymous(true));

        let decision = decide(Strategy::Standard, Method::GET, "/student_guides", &headers);
        assert!(decision.allowed);
        assert!(decision.claims().unwrap().is_anonymous);

        let decision = decide(Strategy::User, Method::POST, "/image", &headers);
        assert_eq!(decision.status, StatusCode::FORBIDDEN);
        assert_eq!(reason(&decision), DenialReason::AnonymousSubject);
        assert_eq!(decision.subject(), "anonymous");
    }

    #[test]
    fn api_key_or_token_prefers_the_key() {
        let mut headers = with_api_key("wrong");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&TokenBuilder::central().bearer()).unwrap(),
        );
        let decision = decide(Strategy::ApiKeyOrToken, Method::GET, "/student_guides", &headers);
        assert_eq!(reason(&decision), DenialReason::InvalidApiKey);

        let headers = bearer(&TokenBuilder::central());
        let decision = decide(Strategy::ApiKeyOrToken, Method::GET, "/student_guides", &headers);
        assert!(decision.allowed);

        let decision = decide(Strategy::ApiKeyOrToken, Method::GET, "/student_guides", &HeaderMap::new());
        assert_eq!(reason(&decision), DenialReason::MissingCredential);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        let decision = decide(Strategy::ApiKeyOrToken, Method::GET, "/student_guides", &headers);
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            reason(&decision),
            DenialReason::Verification(VerificationError::Malformed)
        );

        let headers = bearer(&TokenBuilder::central().expires_in(-3600));
        let decision = decide(Strategy::ApiKeyOrToken, Method::GET, "/student_guides", &headers);
        assert_eq!(
            reason(&decision),
            DenialReason::Verification(VerificationError::Expired)
        );
    }

    #[test]
    fn admin_or_permissions_falls_back_to_central_permissions() {
        let headers = bearer(&TokenBuilder::admin("651234567", &["content-admins"]));
        let decision = decide(Strategy::AdminOrPermissions, Method::POST, "/admin/student_guides", &headers);
        assert!(decision.identity.as_ref().unwrap().admin().is_some());
        assert!(decision.allowed);

        let headers = bearer(&TokenBuilder::central().permissions("content.guides.write"));
        let decision = decide(Strategy::AdminOrPermissions, Method::PUT, "/admin/student_guides/7", &headers);
        assert!(decision.allowed);
        assert!(decision.claims().is_some());

        let headers = bearer(&TokenBuilder::central());
        let decision = decide(Strategy::AdminOrPermissions, Method::PUT, "/admin/student_guides/7", &headers);
        assert_eq!(reason(&decision), DenialReason::PolicyDenied);

        let decision = decide(Strategy::AdminOrPermissions, Method::GET, "/admin/student_guides", &HeaderMap::new());
        assert_eq!(decision.status, StatusCode::UNAUTHORIZED);
        assert_eq!(reason(&decision), DenialReason::MissingCredential);
    }

    #[test]
    fn missing_admin_verifier_denies_admin_strategies() {
        let authorizer = Authorizer::new(AuthorizerParts {
            api_keys: ApiKeySet::default(),
            central: testing::central_registry(),
            audiences: Vec::new(),
            admin: None,
            policy: testing::policy(),
        });

        let headers = bearer(&TokenBuilder::admin("651234567", &["content-admins"]));
        let method = Method::POST;
        let request = AuthRequest::new(&method, "/admin/student_guides", &headers);
        let decision = authorizer.admin_group(&request);
        assert_eq!(reason(&decision), DenialReason::AdminUnauthenticated);
    }
}
