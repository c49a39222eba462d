#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod admin;
pub mod claims;
pub mod credential;
pub mod policy;
pub mod registry;
pub mod request;
pub mod strategy;
#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;
pub mod utility;
pub mod verify;

pub use crate::error::{BoxedError, Error, ErrorKind, Result};
