use content_auth::registry::TrustRegistry;
use content_auth::strategy::{Authorizer, AuthorizerParts};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::service::{AuthConfig, Result};
use crate::utility::tracing_targets::TRACING_TARGET_SERVICE as TRACING_TARGET;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    pub authorizer: Authorizer,

    // Trust registries refreshed in the background:
    pub central_registry: TrustRegistry,
    pub admin_registry: Option<TrustRegistry>,
}

impl ServiceState {
    /// Assembles state from already initialized components.
    pub fn new(
        authorizer: Authorizer,
        central_registry: TrustRegistry,
        admin_registry: Option<TrustRegistry>,
    ) -> Self {
        Self {
            authorizer,
            central_registry,
            admin_registry,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Fetches every trust registry and loads the policy table. Any failure
    /// is fatal: the service must not start without trusted keys.
    pub async fn from_config(config: &AuthConfig) -> Result<Self> {
        config.validate()?;

        let client = config.http_client()?;

        let central_registry = config.central_registry(client.clone())?;
        central_registry.initialize().await?;

        let admin = config.admin_verifier(client);
        if let Some(admin) = &admin {
            admin.registry().initialize().await?;
        } else {
            tracing::warn!(
                target: TRACING_TARGET,
                "no administrative identity provider configured, admin groups will not authenticate",
            );
        }
        let admin_registry = admin.as_ref().map(|admin| admin.registry().clone());

        let policy = config.load_policy().await?;
        let api_keys = config.api_key_set();

        tracing::info!(
            target: TRACING_TARGET,
            service_id = %config.service_id,
            policy_rules = policy.len(),
            api_keys = api_keys.len(),
            admin = admin.is_some(),
            "service state initialized",
        );

        let authorizer = Authorizer::new(AuthorizerParts {
            api_keys,
            central: central_registry.clone(),
            audiences: config.audiences(),
            admin,
            policy,
        });

        Ok(Self::new(authorizer, central_registry, admin_registry))
    }

    /// Trust registries owned by this state.
    pub fn registries(&self) -> impl Iterator<Item = &TrustRegistry> {
        std::iter::once(&self.central_registry).chain(self.admin_registry.as_ref())
    }

    /// Spawns one refresh task per trust registry.
    ///
    /// All tasks stop when `cancel` is triggered.
    pub fn spawn_refresh(&self, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.registries()
            .map(|registry| registry.spawn_refresh(cancel.child_token()))
            .collect()
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(authorizer: Authorizer);

#[cfg(test)]
mod tests {
    use content_auth::testing;

    use super::*;

    fn state() -> ServiceState {
        ServiceState::new(
            testing::authorizer(),
            testing::central_registry(),
            Some(testing::admin_registry()),
        )
    }

    #[test]
    fn registries_include_admin_when_configured() {
        let configured = state();
        let names: Vec<_> = configured.registries().map(TrustRegistry::name).collect();
        assert_eq!(names, ["central", "admin"]);

        let state = ServiceState::new(testing::authorizer(), testing::central_registry(), None);
        assert_eq!(state.registries().count(), 1);
    }

    #[tokio::test]
    async fn refresh_tasks_stop_on_cancel() -> anyhow::Result<()> {
        let cancel = CancellationToken::new();
        let tasks = state().spawn_refresh(&cancel);
        assert_eq!(tasks.len(), 2);

        cancel.cancel();
        for task in tasks {
            task.await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn startup_fails_without_registry() {
        let config: AuthConfig = serde_json::from_str(
            r#"{"core_bb_host":"http://127.0.0.1:1","registry_timeout_secs":1}"#,
        )
        .unwrap();

        let error = ServiceState::from_config(&config).await.unwrap_err();
        assert_eq!(error.kind(), content_auth::ErrorKind::RegistryUnavailable);
    }
}
