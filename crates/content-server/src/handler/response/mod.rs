//! Response bodies.

mod access;
mod error_response;

pub use access::{AccessResponse, PrincipalResponse, VersionResponse};
pub use error_response::ErrorResponse;
