//! Conversion of layer failures and panics into error responses.

use std::any::Any;
use std::future::ready;

use axum::response::{IntoResponse, Response};
use futures::future::{BoxFuture, FutureExt};

use crate::handler::ErrorKind;
use crate::utility::tracing_targets::TRACING_TARGET_RECOVERY as TRACING_TARGET;

type ResponseFut = BoxFuture<'static, Response>;

type Panic = Box<dyn Any + Send + 'static>;

/// Transforms a [`tower::BoxError`] into an error response.
pub fn handle_error(err: tower::BoxError) -> ResponseFut {
    use tower::timeout::error::Elapsed;

    let kind = if err.is::<Elapsed>() {
        tracing::error!(
            target: TRACING_TARGET,
            error = %err,
            "request timeout exceeded",
        );
        ErrorKind::ServiceUnavailable
    } else {
        tracing::error!(
            target: TRACING_TARGET,
            error = %err,
            "unknown middleware error",
        );
        ErrorKind::InternalServerError
    };

    ready(kind.into_response()).boxed()
}

/// Transforms a handler panic into an error response.
pub fn catch_panic(err: Panic) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(
        target: TRACING_TARGET,
        panic = message,
        "service panic",
    );

    ErrorKind::InternalServerError.into_response()
}
