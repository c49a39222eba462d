//! Authorization strategies.
//!
//! Each [`Strategy`] is a decision function `(request) -> AuthDecision`
//! composed from the token verifiers, the administrative identity check and
//! the policy table. The request-routing layer chooses which strategy guards
//! an endpoint; this module never looks at routes.

mod api_key;
mod authorizer;
mod decision;
mod kind;

pub use api_key::ApiKeySet;
pub use authorizer::{Authorizer, AuthorizerParts};
pub use decision::{AuthDecision, DenialReason};
pub use kind::Strategy;
