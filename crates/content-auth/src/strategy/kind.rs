use serde::{Deserialize, Serialize};

/// Authorization strategies, one per endpoint sensitivity class.
///
/// The request-routing layer picks the strategy for an endpoint; the
/// [`Authorizer`](super::Authorizer) evaluates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// Configured API key, no identity.
    ApiKey,
    /// Any valid central-identity token.
    Standard,
    /// Valid central-identity token of a non-anonymous caller.
    User,
    /// Valid central-identity token with a permission granted by the policy
    /// table for the request's path and method.
    Permissions,
    /// Administrator with a group granted by the policy table.
    AdminGroup,
    /// Service token of a first-party service.
    FirstPartyService,
    /// Service token of a third-party service.
    ThirdPartyService,
    /// [`ApiKey`](Self::ApiKey) when an API key is presented, otherwise
    /// [`Standard`](Self::Standard).
    ApiKeyOrToken,
    /// [`AdminGroup`](Self::AdminGroup), falling back to
    /// [`Permissions`](Self::Permissions) when the caller is not an
    /// authenticated administrator.
    AdminOrPermissions,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn names_are_snake_case() {
        assert_eq!(Strategy::FirstPartyService.to_string(), "first_party_service");
        assert_eq!(Strategy::from_str("admin_or_permissions").unwrap(), Strategy::AdminOrPermissions);
        assert!(Strategy::from_str("nope").is_err());
    }
}
