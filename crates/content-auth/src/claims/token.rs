//! Wire format of tokens issued by the central identity service.

use serde::{Deserialize, Serialize};

/// Claims as encoded by the central identity service.
///
/// Only `iss` and `exp` are mandatory; every other claim falls back
/// to its default when absent. `service` stays optional so that verifiers
/// with a service predicate can tell an omitted claim from an explicit
/// `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: account id for humans, service id for services.
    #[serde(default)]
    pub sub: String,
    /// Issuer, used to select the trust registry entry.
    pub iss: String,
    /// Expiration time (unix seconds).
    pub exp: i64,

    /// Issued-at time (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Audience, a single value or a list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    #[serde(default)]
    pub org_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,

    /// Comma-separated permission names.
    #[serde(default)]
    pub permissions: String,
    /// Space-separated scopes granted to third-party services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default)]
    pub anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<bool>,
    #[serde(default)]
    pub first_party: bool,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub system: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The `aud` claim, which issuers may encode as a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Audience values in token order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }

    /// Returns `true` if `audience` is one of the values.
    pub fn contains(&self, audience: &str) -> bool {
        self.iter().any(|value| value == audience)
    }
}

impl TokenClaims {
    /// Splits the `permissions` claim, dropping empty entries and keeping
    /// the issuer's order.
    pub fn permission_list(&self) -> Vec<String> {
        self.permissions
            .split(',')
            .map(str::trim)
            .filter(|permission| !permission.is_empty())
            .map(str::to_owned)
            .collect()
    }
}
