//! Error types for the dialect back end.

use thiserror::Error;

use crate::stcs::StcsError;

/// Errors that abort a compilation.
///
/// None of these are retryable: the fix is always a change to the query or
/// the literal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialectError {
    /// Construct this dialect refuses outright.
    #[error("{feature} is not supported by the PostgreSQL dialect")]
    Unsupported { feature: String },

    /// PostgreSQL polygon literals cannot hold expressions.
    #[error("POLYGON only accepts numeric literals here, got '{argument}'")]
    NonLiteralPolygon { argument: String },

    #[error("{function} expects {expected} arguments, got {got}")]
    Arity {
        function: String,
        expected: String,
        got: usize,
    },

    #[error("Unknown reference frame '{frame}'")]
    UnknownFrame { frame: String },

    /// An STC-S region placeholder reached SQL rendering.
    #[error("Unresolved STC-S region cannot be rendered as SQL: {region}")]
    UnresolvedRegion { region: String },

    /// A geometry predicate compared against something other than 0 or 1.
    #[error("Geometry predicates can only be compared to 0 or 1: {comparison}")]
    PredicateComparison { comparison: String },

    #[error(transparent)]
    Stcs(#[from] StcsError),
}

/// Result type for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;
