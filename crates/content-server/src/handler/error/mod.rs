//! [`Error`], [`ErrorKind`] and [`Result`].

mod denial;
mod http_error;

pub use http_error::{Error, ErrorKind, Result};
