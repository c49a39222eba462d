//! Student guide and image endpoints of ordinary clients.

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

async fn list_student_guides(
    identity: Option<CurrentIdentity>,
    method: Method,
    uri: Uri,
) -> Json<AccessResponse> {
    acknowledge(&method, &uri, identity.as_ref())
}

async fn get_student_guide(
    Path(guide_id): Path<String>,
    identity: Option<CurrentIdentity>,
    method: Method,
    uri: Uri,
) -> Json<AccessResponse> {
    tracing::debug!(target: TRACING_TARGET, guide_id = %guide_id, "student guide requested");
    acknowledge(&method, &uri, identity.as_ref())
}

async fn upload_image(identity: CurrentIdentity, method: Method, uri: Uri) -> Json<AccessResponse> {
    tracing::debug!(target: TRACING_TARGET, subject = identity.subject(), "image upload");
    acknowledge(&method, &uri, Some(&identity))
}

async fn student_guide_permissions(
    Path(guide_id): Path<String>,
    identity: CurrentIdentity,
    method: Method,
    uri: Uri,
) -> Json<AccessResponse> {
    tracing::debug!(
        target: TRACING_TARGET,
        guide_id = %guide_id,
        subject = identity.subject(),
        "student guide permissions requested",
    );
    acknowledge(&method, &uri, Some(&identity))
}

pub fn routes(state: &ServiceState) -> Router<ServiceState> {
    let public = Router::new()
        .route("/student_guides", get(list_student_guides))
        .route("/student_guides/{id}", get(get_student_guide))
        .with_strategy(state, Strategy::ApiKeyOrToken);

    let user = Router::new()
        .route("/image", post(upload_image))
        .with_strategy(state, Strategy::User);

    let permissions = Router::new()
        .route("/student_guides/{id}/permissions", get(student_guide_permissions))
        .with_strategy(state, Strategy::Permissions);

    public.merge(user).merge(permissions)
}
