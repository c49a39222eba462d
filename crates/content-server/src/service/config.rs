use std::path::PathBuf;

#[cfg(any(test, feature = "config"))]
use clap::Args;
use content_auth::admin::{AdminVerifier, DEFAULT_GROUPS_CLAIM, DEFAULT_SUBJECT_CLAIM};
use content_auth::policy::PolicyTable;
use content_auth::registry::{JwksLoader, RegistryConfig, ServiceRegistryLoader, TrustRegistry};
use content_auth::strategy::ApiKeySet;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::service::{Error, Result};

/// Authorization configuration of the service.
///
/// Describes where trusted signing keys come from, which API keys are
/// accepted and where the policy table lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "config"), derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct AuthConfig {
    /// Base URL of the core building block hosting the service registry.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_CORE_BB_HOST")
    )]
    pub core_bb_host: Url,

    /// Service id of this building block.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_SERVICE_ID", default_value = "content")
    )]
    #[serde(default = "AuthConfig::default_service_id")]
    pub service_id: String,

    /// Services whose published keys are trusted.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(
            long,
            env = "CONTENT_REGISTRY_SERVICE_IDS",
            value_delimiter = ',',
            default_value = "core"
        )
    )]
    #[serde(default = "AuthConfig::default_registry_service_ids")]
    pub registry_service_ids: Vec<String>,

    /// Accepted audiences of central tokens. Empty disables the check.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_TOKEN_AUDIENCES", value_delimiter = ',')
    )]
    #[serde(default)]
    pub token_audiences: Vec<String>,

    /// Issuer of administrative identity tokens.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_ADMIN_ISSUER", requires = "admin_jwks_url")
    )]
    #[serde(default)]
    pub admin_issuer: Option<String>,

    /// JWKS document of the administrative identity provider.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_ADMIN_JWKS_URL", requires = "admin_issuer")
    )]
    #[serde(default)]
    pub admin_jwks_url: Option<Url>,

    /// Client id registered with the identity provider, required as the
    /// audience of administrative tokens when set.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_ADMIN_CLIENT_ID")
    )]
    #[serde(default)]
    pub admin_client_id: Option<String>,

    /// Claim holding the administrator's stable id.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_ADMIN_SUBJECT_CLAIM", default_value = DEFAULT_SUBJECT_CLAIM)
    )]
    #[serde(default = "AuthConfig::default_admin_subject_claim")]
    pub admin_subject_claim: String,

    /// Claim holding the administrator's groups.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_ADMIN_GROUPS_CLAIM", default_value = DEFAULT_GROUPS_CLAIM)
    )]
    #[serde(default = "AuthConfig::default_admin_groups_claim")]
    pub admin_groups_claim: String,

    /// Path to the policy table.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_POLICY_FILE", default_value = "./policy.csv")
    )]
    #[serde(default = "AuthConfig::default_policy_file")]
    pub policy_file: PathBuf,

    /// API keys of public-tier clients.
    #[cfg_attr(
        any(test, feature = "config"),
        arg(long, env = "CONTENT_API_KEYS", value_delimiter = ',', hide_env_values = true)
    )]
    #[serde(default)]
    pub api_keys: Vec<String>,

    #[cfg_attr(any(test, feature = "config"), clap(flatten))]
    #[serde(flatten)]
    pub registry: RegistryConfig,
}

impl AuthConfig {
    fn default_service_id() -> String {
        "content".to_owned()
    }

    fn default_registry_service_ids() -> Vec<String> {
        vec!["core".to_owned()]
    }

    fn default_admin_subject_claim() -> String {
        DEFAULT_SUBJECT_CLAIM.to_owned()
    }

    fn default_admin_groups_claim() -> String {
        DEFAULT_GROUPS_CLAIM.to_owned()
    }

    fn default_policy_file() -> PathBuf {
        PathBuf::from("./policy.csv")
    }

    /// Validates all configuration values.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if:
    /// - the service id or every registry service id is blank
    /// - only one of the admin issuer and admin JWKS URL is set
    /// - an admin claim name is blank
    /// - a registry duration is zero
    pub fn validate(&self) -> Result<()> {
        if self.service_id.trim().is_empty() {
            return Err(Error::config("service id cannot be empty"));
        }

        if self.registry_service_ids().is_empty() {
            return Err(Error::config("at least one registry service id is required"));
        }

        if self.admin_issuer.is_some() != self.admin_jwks_url.is_some() {
            return Err(Error::config(
                "admin issuer and admin JWKS URL must be configured together",
            ));
        }

        if self.admin_subject_claim.trim().is_empty() || self.admin_groups_claim.trim().is_empty()
        {
            return Err(Error::config("admin claim names cannot be empty"));
        }

        self.registry.validate()
    }

    /// Registry service ids with blanks removed.
    pub fn registry_service_ids(&self) -> Vec<String> {
        trimmed(&self.registry_service_ids)
    }

    /// Accepted token audiences with blanks removed.
    pub fn audiences(&self) -> Vec<String> {
        trimmed(&self.token_audiences)
    }

    /// Configured API keys.
    pub fn api_key_set(&self) -> ApiKeySet {
        self.api_keys.iter().map(String::as_str).collect()
    }

    /// Returns `true` if the administrative identity provider is configured.
    #[inline]
    pub fn has_admin(&self) -> bool {
        self.admin_issuer.is_some() && self.admin_jwks_url.is_some()
    }

    /// HTTP client used for registry fetches.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.registry.fetch_timeout())
            .user_agent(format!("{}/{}", self.service_id, env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal("failed to build registry HTTP client").with_source(e))
    }

    /// Trust registry of the central identity service, not yet initialized.
    pub fn central_registry(&self, client: reqwest::Client) -> Result<TrustRegistry> {
        let loader =
            ServiceRegistryLoader::new(client, &self.core_bb_host, self.registry_service_ids())?;

        Ok(TrustRegistry::new("central", loader, self.registry.clone()))
    }

    /// Admin verifier over a JWKS-backed registry, not yet initialized.
    ///
    /// Returns `None` when no administrative identity provider is configured.
    pub fn admin_verifier(&self, client: reqwest::Client) -> Option<AdminVerifier> {
        let (issuer, jwks_url) = self.admin_issuer.as_ref().zip(self.admin_jwks_url.as_ref())?;

        let loader = JwksLoader::new(client, jwks_url.clone(), issuer.clone());
        let registry = TrustRegistry::new("admin", loader, self.registry.clone());

        let verifier = AdminVerifier::new(registry, issuer.clone())
            .with_audiences(self.admin_client_id.iter().cloned())
            .with_subject_claim(self.admin_subject_claim.trim())
            .with_groups_claim(self.admin_groups_claim.trim());

        Some(verifier)
    }

    /// Reads and parses the policy table.
    pub async fn load_policy(&self) -> Result<PolicyTable> {
        PolicyTable::from_file(&self.policy_file).await
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}
