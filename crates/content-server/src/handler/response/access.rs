use content_auth::claims::{Identity, Principal};
use serde::Serialize;

/// Caller as seen by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrincipalResponse {
    /// Snake-case caller class, e.g. `identified_human`.
    pub class: &'static str,
    /// Account id, service id or administrator id.
    pub subject: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl From<&Identity> for PrincipalResponse {
    fn from(identity: &Identity) -> Self {
        let principal = identity.principal();
        let class = principal.class();
        let none: &[String] = &[];

        let (subject, permissions, groups) = match principal {
            Principal::AnonymousHuman { subject } => (subject, none, none),
            Principal::IdentifiedHuman {
                subject,
                permissions,
            } => (subject, permissions, none),
            Principal::FirstPartyService {
                service_id,
                permissions,
            } => (service_id, permissions, none),
            Principal::ThirdPartyService { service_id } => (service_id, none, none),
            Principal::AdminHuman { subject_id, groups } => (subject_id, none, groups),
        };

        Self {
            class,
            subject: subject.to_owned(),
            permissions: permissions.to_vec(),
            groups: groups.to_vec(),
        }
    }
}

/// Acknowledgement of an authorized request.
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    /// Resource the request addressed, relative to the service mount.
    pub resource: String,
    /// HTTP method of the request.
    pub action: String,
    /// Authenticated caller; absent for API-key access.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<PrincipalResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use content_auth::admin::AdminIdentity;
    use content_auth::claims::{Claims, TokenClaims};

    use super::*;

    #[test]
    fn admin_principal_carries_groups() {
        let identity = Identity::Admin(AdminIdentity {
            subject_id: "123456789".to_owned(),
            groups: vec!["content-admins".to_owned()],
        });

        let response = PrincipalResponse::from(&identity);
        assert_eq!(response.class, "admin_human");
        assert_eq!(response.subject, "123456789");
        assert_eq!(response.groups, ["content-admins"]);
        assert!(response.permissions.is_empty());
    }

    #[test]
    fn third_party_service_drops_permissions() {
        let claims = Claims::from_token(TokenClaims {
            sub: "partner".to_owned(),
            iss: "https://core".to_owned(),
            exp: 2_000_000_000,
            service: Some(true),
            permissions: "content.read".to_owned(),
            ..TokenClaims::default()
        });

        let response = PrincipalResponse::from(&Identity::Token(claims));
        assert_eq!(response.class, "third_party_service");
        assert!(response.permissions.is_empty());

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("permissions").is_none());
    }
}
