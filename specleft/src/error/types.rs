//! Primary error enum for tracing, binding and persistence flows.

use std::sync::Arc;

use figment::Error as FigmentError;
use thiserror::Error;

use crate::ids::IdentifierKind;

/// Errors raised while binding, tracing or persisting test results.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpecleftError {
    /// A test is already bound to this step context.
    #[error("step context is already bound to test '{test_id}'")]
    AlreadyBound {
        /// Test currently holding the binding.
        test_id: String,
    },

    /// No test is bound to this step context.
    #[error("step context has no bound test")]
    NotBound,

    /// An identifier does not match its grammar.
    #[error("invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        /// Grammar the value was checked against.
        kind: IdentifierKind,
        /// Offending value.
        value: String,
        /// Human-readable explanation of the mismatch.
        reason: String,
    },

    /// A test was bound to a scenario twice.
    #[error("test '{test_id}' is already bound to scenario {existing}")]
    DuplicateBinding {
        /// Test that was bound twice.
        test_id: String,
        /// Scenario of the binding that was kept.
        existing: String,
    },

    /// Writing a result set failed.
    #[error("failed to write results to '{path}': {source}")]
    StoreWrite {
        /// Location that could not be written.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Reading a stored result set failed for a reason other than absence.
    #[error("failed to read results from '{path}': {source}")]
    StoreRead {
        /// Location that could not be read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// No result set is stored under the requested run id.
    #[error("no results stored for run '{run_id}'")]
    NotFound {
        /// Requested run id.
        run_id: String,
    },

    /// A stored record exists but cannot be decoded.
    #[error("corrupt result record '{path}': {reason}")]
    CorruptRecord {
        /// Location of the record.
        path: String,
        /// Why decoding failed.
        reason: String,
    },

    /// A per-test flush failed earlier in the run.
    #[error("an earlier per-test flush failed: {source}")]
    FlushFailed {
        /// First flush failure recorded by the session.
        #[source]
        source: Arc<SpecleftError>,
    },

    /// Error while gathering configuration from providers.
    #[error("failed to load tracing configuration: {0}")]
    Config(#[from] Box<FigmentError>),
}
