//! Endpoints called by other services.

use axum::http::{Method, Uri};
use axum::routing::get;
use axum::{Json, Router};
use content_auth::strategy::Strategy;

use super::{AccessResponse, acknowledge};
use crate::extract::CurrentIdentity;
use crate::middleware::RouterAuthorizeExt;
use crate::service::ServiceState;

async fn ping(identity: CurrentIdentity, method: Method, uri: Uri) -> Json<AccessResponse> {
    acknowledge(&method, &uri, Some(&identity))
}

pub fn routes(state: &ServiceState) -> Router<ServiceState> {
    let first_party = Router::new()
        .route("/bbs/ping", get(ping))
        .with_strategy(state, Strategy::FirstPartyService);

    let third_party = Router::new()
        .route("/tps/ping", get(ping))
        .with_strategy(state, Strategy::ThirdPartyService);

    first_party.merge(third_party)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use content_auth::testing::TokenBuilder;

    use crate::handler::test::create_test_server;

    fn service_token(first_party: bool) -> String {
        TokenBuilder::central()
            .subject("groups-bb")
            .service(true)
            .first_party(first_party)
            .bearer()
    }

    #[tokio::test]
    async fn first_party_services_only_on_bbs() -> anyhow::Result<()> {
        let server = create_test_server()?;

        let response = server
            .get("/content/bbs/ping")
            .add_header("authorization", service_token(true))
            .await;
        response.assert_status_ok();

        let body: serde_json::Value = response.json();
        assert_eq!(body["principal"]["class"], "first_party_service");
        assert_eq!(body["principal"]["subject"], "groups-bb");

        server
            .get("/content/bbs/ping")
            .add_header("authorization", service_token(false))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn third_party_services_only_on_tps() -> anyhow::Result<()> {
        let server = create_test_server()?;

        server
            .get("/content/tps/ping")
            .add_header("authorization", service_token(false))
            .await
            .assert_status_ok();

        server
            .get("/content/tps/ping")
            .add_header("authorization", service_token(true))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn human_tokens_are_not_services() -> anyhow::Result<()> {
        let server = create_test_server()?;
        let human = TokenBuilder::central().bearer();

        server
            .get("/content/bbs/ping")
            .add_header("authorization", human)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
