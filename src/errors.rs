// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the conversion engine

use std::fmt;

/// Result type alias using ConvertError
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Failure taxonomy for the conversion engine
///
/// The variants drive different loop policies: rejected input is the caller's
/// bug and is never retried, transient resource failures are skipped and
/// retried on the next cadence tick, and fatal resource failures stop the
/// loop so the execution context can be re-initialized.
#[derive(Debug, Clone)]
pub enum ConvertError {
    /// Unsupported input format or dimensions; fail fast, no partial work
    RejectedInput(String),
    /// Device or driver momentarily unable to service the request
    TransientResource(String),
    /// The execution context itself is unusable
    FatalResource(String),
}

impl ConvertError {
    /// Whether the loop may retry after this error on its next tick
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConvertError::TransientResource(_))
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertError::RejectedInput(msg) => write!(f, "rejected input: {}", msg),
            ConvertError::TransientResource(msg) => {
                write!(f, "transient resource failure: {}", msg)
            }
            ConvertError::FatalResource(msg) => write!(f, "fatal resource failure: {}", msg),
        }
    }
}

impl std::error::Error for ConvertError {}
