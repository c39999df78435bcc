//! Custom error types for the crate.
//!
//! This module defines the primary error type, `GmError`, used across the
//! record-processing pipeline. Using the `thiserror` crate, it provides a
//! centralized and consistent way to report failures, from malformed
//! processing requests to backing-store outages.
//!
//! ## Error categories
//!
//! Validation errors are detected during descriptor build, before any sample
//! is loaded or computed:
//!
//! - **`InvalidRequest`**: the operation chain is malformed or incompatible
//!   with the record's unit kind; carries the index of the first offending
//!   step so callers can report precisely what was wrong.
//! - **`InvalidFilterParameter`**: out-of-range corner frequency or filter
//!   order.
//! - **`InvalidConversion`**: an integration or differentiation step was
//!   requested for an unsupported unit transition.
//! - **`UnsupportedOperation`**: an operation applied to the wrong waveform
//!   kind (e.g. a response spectrum on a displacement series).
//!
//! Runtime errors:
//!
//! - **`CacheUnavailable`**: the backing key-value store failed. Read
//!   failures degrade to recomputation; write failures are logged and never
//!   fail the request.
//! - **`NotFound`**: the raw record does not exist; fatal to the single
//!   request only.
//!
//! Nothing in this crate retries automatically; retry policy belongs to the
//! external store collaborator.

use crate::waveform::UnitKind;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type GmResult<T> = std::result::Result<T, GmError>;

/// The crate-wide error type.
#[derive(Error, Debug)]
pub enum GmError {
    /// Malformed or unit-incompatible operation chain. `step` is the
    /// zero-based index of the first offending step in the requested chain.
    #[error("invalid request at step {step}: {reason}")]
    InvalidRequest {
        /// Index of the first offending step.
        step: usize,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// Out-of-range filter parameter.
    #[error("invalid filter parameter: {0}")]
    InvalidFilterParameter(String),

    /// Unsupported unit transition for an integration or differentiation.
    #[error("invalid conversion from {from:?} to {to:?}")]
    InvalidConversion {
        /// Unit kind of the input waveform.
        from: UnitKind,
        /// Unit kind that was requested.
        to: UnitKind,
    },

    /// Operation applied to a waveform of the wrong kind.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The backing key-value store failed.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The raw record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Configuration file error.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Waveform (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GmError {
    /// True for errors detected during descriptor validation, i.e. before
    /// any computation started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            GmError::InvalidRequest { .. }
                | GmError::InvalidFilterParameter(_)
                | GmError::InvalidConversion { .. }
                | GmError::UnsupportedOperation(_)
        )
    }
}
