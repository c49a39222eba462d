//! Claims model: the wire claims of central tokens and the normalized
//! identity every strategy works with.

mod identity;
mod token;

pub use identity::{Claims, ClaimsKind, Identity, Principal};
pub use token::{Audience, TokenClaims};
