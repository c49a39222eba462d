//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! Every route lives under [`MOUNT_PATH`]. Each group of routes is guarded
//! by the authorization strategy of its endpoint class; policy rules match
//! paths relative to the mount point.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod admin;
mod content;
mod error;
mod monitors;
mod response;
mod services;

use axum::Json;
use axum::Router;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::response::{
    AccessResponse, ErrorResponse, PrincipalResponse, VersionResponse,
};
use crate::extract::CurrentIdentity;
use crate::service::ServiceState;

/// Path prefix all routes are nested under.
pub const MOUNT_PATH: &str = "/content";

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Acknowledges an authorized request with the caller it was granted to.
fn acknowledge(method: &Method, uri: &Uri, identity: Option<&CurrentIdentity>) -> Json<AccessResponse> {
    Json(AccessResponse {
        resource: uri.path().to_owned(),
        action: method.as_str().to_owned(),
        principal: identity.map(|identity| PrincipalResponse::from(&identity.0)),
    })
}

/// Returns a [`Router`] with all routes, guarded by their strategies.
pub fn routes(state: ServiceState) -> Router {
    let content = Router::new()
        .merge(monitors::routes())
        .merge(content::routes(&state))
        .merge(admin::routes(&state))
        .merge(services::routes(&state));

    Router::new()
        .nest(MOUNT_PATH, content)
        .fallback(handler)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test {
    use axum_test::TestServer;
    use content_auth::testing;

    use crate::handler::routes;
    use crate::service::ServiceState;

    /// Returns state wired with the test fixtures.
    pub fn test_state() -> ServiceState {
        ServiceState::new(
            testing::authorizer(),
            testing::central_registry(),
            Some(testing::admin_registry()),
        )
    }

    /// Returns a new [`TestServer`] with the default router and state.
    pub fn create_test_server() -> anyhow::Result<TestServer> {
        let server = TestServer::new(routes(test_state()))?;
        Ok(server)
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server.get("/content/unknown").await;
        response.assert_status_not_found();
        response.assert_json(&serde_json::json!({
            "name": "not_found",
            "message": "The requested resource was not found",
        }));

        server.get("/elsewhere").await.assert_status_not_found();
        Ok(())
    }
}
