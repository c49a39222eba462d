//! Application state and dependency injection.

mod config;
mod state;

pub use content_auth::{Error, ErrorKind, Result};

pub use crate::service::config::AuthConfig;
pub use crate::service::state::ServiceState;
