//! Normalized identity produced by a successful verification.

use jiff::Timestamp;
use serde::Serialize;

use super::token::TokenClaims;
use crate::admin::AdminIdentity;

/// Verifier-agnostic facts about an authenticated caller.
///
/// Built from [`TokenClaims`] by [`Claims::from_token`], which enforces the
/// model invariants:
///
/// - exactly one of anonymous human, identified human, or service applies;
/// - `is_first_party` is only ever `true` for services;
/// - a service is never anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    /// Account id for humans, service id for services. Empty only for
    /// anonymous callers whose issuer did not assign one.
    pub subject: String,
    /// Issuer the token was verified against.
    pub issuer: String,
    pub org_id: String,
    pub app_id: String,
    pub session_id: Option<String>,
    /// Permissions granted by the issuer, in issuer order.
    pub permissions: Vec<String>,
    pub is_service: bool,
    pub is_first_party: bool,
    pub is_anonymous: bool,
    pub name: Option<String>,
    pub email: Option<String>,
    pub issued_at: Option<Timestamp>,
    pub expires_at: Timestamp,
}

impl Claims {
    /// Normalizes decoded token claims.
    pub fn from_token(token: TokenClaims) -> Self {
        let permissions = token.permission_list();
        let is_service = token.service.unwrap_or(false);

        Self {
            subject: token.sub,
            issuer: token.iss,
            org_id: token.org_id,
            app_id: token.app_id,
            session_id: token.session_id,
            permissions,
            is_service,
            is_first_party: is_service && token.first_party,
            is_anonymous: !is_service && token.anonymous,
            name: token.name,
            email: token.email,
            issued_at: token.iat.and_then(|iat| Timestamp::from_second(iat).ok()),
            expires_at: Timestamp::from_second(token.exp).unwrap_or(Timestamp::MIN),
        }
    }

    /// Classifies the caller.
    pub fn kind(&self) -> ClaimsKind {
        match (self.is_service, self.is_first_party, self.is_anonymous) {
            (true, true, _) => ClaimsKind::FirstPartyService,
            (true, false, _) => ClaimsKind::ThirdPartyService,
            (false, _, true) => ClaimsKind::AnonymousHuman,
            (false, _, false) => ClaimsKind::IdentifiedHuman,
        }
    }

    /// Returns `true` if the issuer granted `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Permissions as string slices, for policy lookups.
    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(String::as_str)
    }
}

/// Caller classes a central-identity token can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ClaimsKind {
    AnonymousHuman,
    IdentifiedHuman,
    FirstPartyService,
    ThirdPartyService,
}

/// Identity attached to an allowed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, derive_more::From)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum Identity {
    /// Verified by the central identity service or a service registry.
    Token(Claims),
    /// Verified by the administrative identity provider.
    Admin(AdminIdentity),
}

impl Identity {
    /// Borrowed, exhaustive view of the caller.
    pub fn principal(&self) -> Principal<'_> {
        match self {
            Self::Token(claims) => match claims.kind() {
                ClaimsKind::AnonymousHuman => Principal::AnonymousHuman {
                    subject: &claims.subject,
                },
                ClaimsKind::IdentifiedHuman => Principal::IdentifiedHuman {
                    subject: &claims.subject,
                    permissions: &claims.permissions,
                },
                ClaimsKind::FirstPartyService => Principal::FirstPartyService {
                    service_id: &claims.subject,
                    permissions: &claims.permissions,
                },
                ClaimsKind::ThirdPartyService => Principal::ThirdPartyService {
                    service_id: &claims.subject,
                },
            },
            Self::Admin(admin) => Principal::AdminHuman {
                subject_id: &admin.subject_id,
                groups: &admin.groups,
            },
        }
    }

    /// Stable identifier used in audit logs.
    pub fn subject(&self) -> &str {
        match self {
            Self::Token(claims) => &claims.subject,
            Self::Admin(admin) => &admin.subject_id,
        }
    }

    /// Central-identity claims, if this identity came from that domain.
    pub fn claims(&self) -> Option<&Claims> {
        match self {
            Self::Token(claims) => Some(claims),
            Self::Admin(_) => None,
        }
    }

    /// Administrative identity, if this identity came from that domain.
    pub fn admin(&self) -> Option<&AdminIdentity> {
        match self {
            Self::Token(_) => None,
            Self::Admin(admin) => Some(admin),
        }
    }
}

/// Who is calling, carrying only the fields relevant to each class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Principal<'a> {
    AnonymousHuman {
        subject: &'a str,
    },
    IdentifiedHuman {
        subject: &'a str,
        permissions: &'a [String],
    },
    FirstPartyService {
        service_id: &'a str,
        permissions: &'a [String],
    },
    ThirdPartyService {
        service_id: &'a str,
    },
    AdminHuman {
        subject_id: &'a str,
        groups: &'a [String],
    },
}

impl Principal<'_> {
    /// Snake-case class name, e.g. `first_party_service`.
    pub fn class(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(service: Option<bool>, first_party: bool, anonymous: bool) -> TokenClaims {
        TokenClaims {
            sub: "subject".to_owned(),
            iss: "https://core".to_owned(),
            exp: 2_000_000_000,
            service,
            first_party,
            anonymous,
            ..TokenClaims::default()
        }
    }

    #[test]
    fn first_party_flag_ignored_for_humans() {
        let claims = Claims::from_token(token(Some(false), true, false));
        assert!(!claims.is_first_party);
        assert_eq!(claims.kind(), ClaimsKind::IdentifiedHuman);
    }

    #[test]
    fn service_is_never_anonymous() {
        let claims = Claims::from_token(token(Some(true), false, true));
        assert!(!claims.is_anonymous);
        assert_eq!(claims.kind(), ClaimsKind::ThirdPartyService);
    }

    #[test]
    fn anonymous_human() {
        let claims = Claims::from_token(token(None, false, true));
        assert_eq!(claims.kind(), ClaimsKind::AnonymousHuman);
        let identity = Identity::from(claims);
        assert!(matches!(
            identity.principal(),
            Principal::AnonymousHuman { subject: "subject" }
        ));
    }

    #[test]
    fn first_party_service_principal() {
        let mut raw = token(Some(true), true, false);
        raw.permissions = "content.sync".to_owned();
        let identity = Identity::from(Claims::from_token(raw));

        let principal = identity.principal();
        assert_eq!(principal.class(), "first_party_service");
        let Principal::FirstPartyService {
            service_id,
            permissions,
        } = principal
        else {
            panic!("unexpected principal {principal:?}");
        };
        assert_eq!(service_id, "subject");
        assert_eq!(permissions, ["content.sync".to_owned()]);
    }

    #[test]
    fn admin_principal() {
        let identity = Identity::from(AdminIdentity {
            subject_id: "123456789".to_owned(),
            groups: vec!["content-admins".to_owned()],
        });
        assert_eq!(identity.subject(), "123456789");
        assert!(identity.claims().is_none());
        assert_eq!(identity.principal().class(), "admin_human");
    }
}
