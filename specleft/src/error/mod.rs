//! Error types produced while tracing and persisting test runs.

mod constructors;
mod types;

pub use types::SpecleftError;

/// Result alias used throughout the crate.
pub type SpecleftResult<T> = Result<T, SpecleftError>;
