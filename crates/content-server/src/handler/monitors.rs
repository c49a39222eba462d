//! Unauthenticated service information.

use axum::Json;
use axum::Router;
use axum::routing::get;

use super::VersionResponse;
use crate::service::ServiceState;

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn routes() -> Router<ServiceState> {
    Router::new().route("/version", get(version))
}
