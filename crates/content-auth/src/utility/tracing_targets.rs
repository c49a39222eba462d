//! Centralized tracing target constants for structured logging.
//!
//! Every event emitted by this crate uses one of these targets, so
//! operators can raise or lower verbosity per concern through `RUST_LOG`.

/// Token verification: signature, expiry and issuer checks.
pub const TRACING_TARGET_VERIFY: &str = "content_auth::verify";

/// Administrative identity checks.
pub const TRACING_TARGET_ADMIN: &str = "content_auth::admin";

/// Authorization decisions and denial audit records.
pub const TRACING_TARGET_AUTHORIZATION: &str = "content_auth::authorization";

/// Trust registry fetches, snapshot swaps and background refresh.
pub const TRACING_TARGET_REGISTRY: &str = "content_auth::registry";

/// Policy table loading.
pub const TRACING_TARGET_POLICY: &str = "content_auth::policy";
