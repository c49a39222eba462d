#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use content_server::handler::routes;
use content_server::middleware::RouterExt;
use content_server::service::ServiceState;
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, ServerConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "content_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "content_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "content_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let state = ServiceState::from_config(&cli.auth)
        .await
        .context("failed to initialize service state")?;

    let refresh = CancellationToken::new();
    let refresh_tasks = state.spawn_refresh(&refresh);

    let router = create_router(state, &cli.server);
    let result = server::serve(router, cli.server).await;

    refresh.cancel();
    for task in refresh_tasks {
        if let Err(e) = task.await {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %e,
                "registry refresh task did not stop cleanly"
            );
        }
    }

    result.context("server terminated abnormally")
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Error handling (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Routes (innermost) - strategy guards and handlers
fn create_router(state: ServiceState, server: &ServerConfig) -> Router {
    routes(state)
        .with_observability_layer()
        .with_error_handling_layer(server.request_timeout())
}
