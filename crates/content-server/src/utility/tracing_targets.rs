//! Centralized tracing target constants for structured logging.

/// Strategy enforcement on routes.
pub const TRACING_TARGET_MIDDLEWARE: &str = "content_server::middleware";

/// Timeouts, panics and other failures outside handlers.
pub const TRACING_TARGET_RECOVERY: &str = "content_server::recovery";

/// State construction and background tasks.
pub const TRACING_TARGET_SERVICE: &str = "content_server::service";

/// Request handlers.
pub const TRACING_TARGET_HANDLER: &str = "content_server::handler";
