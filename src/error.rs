//! Structured error types for POA graph construction and traversal.

use thiserror::Error;

/// Unified error type for all POA graph operations.
#[derive(Debug, Error)]
pub enum PoaError {
    /// Invalid input (empty sequence, mismatched lengths, malformed
    /// correspondence arrays). Rejected before any graph mutation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The acyclicity invariant was violated during topological sorting.
    /// The graph is left in an unspecified state and should be discarded.
    #[error("graph corruption: {0}")]
    GraphCorruption(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PoaError>;
