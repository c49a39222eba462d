//! Shared helpers.

pub mod tracing_targets;
