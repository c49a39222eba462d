//! Strategy enforcement for routes.

use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use content_auth::request::AuthRequest;
use content_auth::strategy::{Authorizer, Strategy};

use crate::handler::{Error, Result};
use crate::service::ServiceState;
use crate::utility::tracing_targets::TRACING_TARGET_MIDDLEWARE as TRACING_TARGET;

/// State of one [`authorize`] layer: the strategy of the routes it guards.
#[derive(Debug, Clone)]
pub struct StrategyGuard {
    authorizer: Authorizer,
    strategy: Strategy,
}

impl StrategyGuard {
    pub fn new(authorizer: Authorizer, strategy: Strategy) -> Self {
        Self {
            authorizer,
            strategy,
        }
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }
}

/// Extension trait for `axum::`[`Router`] to guard routes with a strategy.
pub trait RouterAuthorizeExt<S> {
    /// Requires every route of this router to pass `strategy`.
    ///
    /// Applied as a route layer, so unmatched paths still fall through to
    /// the not-found handler.
    fn with_strategy(self, state: &ServiceState, strategy: Strategy) -> Self;
}

impl<S> RouterAuthorizeExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_strategy(self, state: &ServiceState, strategy: Strategy) -> Self {
        let guard = StrategyGuard::new(state.authorizer.clone(), strategy);
        self.route_layer(from_fn_with_state(guard, authorize))
    }
}

/// Evaluates the guard's strategy for the request.
///
/// Allowed requests continue with the caller's identity, if any, inserted
/// into the request extensions. Denied requests are answered with `401` or
/// `403` and a generic body.
pub async fn authorize(
    State(guard): State<StrategyGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let decision = guard
        .authorizer
        .decide(guard.strategy, &AuthRequest::from_request(&request));

    if !decision.allowed {
        let error = decision.reason.map(Error::from).unwrap_or_default();
        return Err(error);
    }

    tracing::trace!(
        target: TRACING_TARGET,
        strategy = %guard.strategy,
        subject = decision.subject(),
        "request authorized",
    );

    if let Some(identity) = decision.identity {
        request.extensions_mut().insert(identity);
    }

    Ok(next.run(request).await)
}
