//! Administrative student guide and image endpoints.
//!
//! Administrators authenticate with the administrative identity provider
//! and are authorized by group. Callers without an administrative identity
//! may still pass with a central token whose permissions the policy grants.

use axum::extract::Path;
use axum::http::{Method, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use content_auth::strategy::Strategy;

use super::{AccessResponse, acknowledge};
use crate::extract::CurrentIdentity;
use crate::middleware::RouterAuthorizeExt;
use crate::service::ServiceState;
use crate::utility::tracing_targets::TRACING_TARGET_HANDLER as TRACING_TARGET;

async fn student_guides(identity: CurrentIdentity, method: Method, uri: Uri) -> Json<AccessResponse> {
    tracing::debug!(
        target: TRACING_TARGET,
        subject = identity.subject(),
        method = %method,
        "admin student guides",
    );
    acknowledge(&method, &uri, Some(&identity))
}

async fn student_guide(
    Path(guide_id): Path<String>,
    identity: CurrentIdentity,
    method: Method,
    uri: Uri,
) -> Json<AccessResponse> {
    tracing::debug!(
        target: TRACING_TARGET,
        subject = identity.subject(),
        guide_id = %guide_id,
        method = %method,
        "admin student guide",
    );
    acknowledge(&method, &uri, Some(&identity))
}

async fn upload_image(identity: CurrentIdentity, method: Method, uri: Uri) -> Json<AccessResponse> {
    acknowledge(&method, &uri, Some(&identity))
}

pub fn routes(state: &ServiceState) -> Router<ServiceState> {
    Router::new()
        .route(
            "/admin/student_guides",
            get(student_guides).post(student_guides),
        )
        .route(
            "/admin/student_guides/{id}",
            get(student_guide).put(student_guide).delete(student_guide),
        )
        .route("/admin/image", post(upload_image))
        .with_strategy(state, Strategy::AdminOrPermissions)
}
