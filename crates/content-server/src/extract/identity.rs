use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;
use content_auth::claims::Identity;

use crate::handler::{Error, ErrorKind};

/// Caller identity attached by the [`authorize`] middleware.
///
/// Extracting it from a route without a guarding strategy, or from a route
/// whose strategy authenticates by API key, is rejected with `401`. Use
/// `Option<CurrentIdentity>` where both are acceptable.
///
/// [`authorize`]: crate::middleware::authorize
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Deref, derive_more::Into)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(Self)
            .ok_or_else(|| ErrorKind::Unauthorized.with_context("no authenticated identity"))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().map(Self))
    }
}
