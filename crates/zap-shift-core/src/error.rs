//! # Error Hierarchy
//!
//! Structured errors for domain-level validation, built with `thiserror`.

use thiserror::Error;

/// Errors raised by domain primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The requested status change is not in the transition table.
    #[error("invalid parcel status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// A status token that is not part of the closed set.
    #[error("unknown {kind}: {value}")]
    UnknownValue {
        /// Which enum the value was parsed as (e.g. "parcel status").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A cost that cannot be converted into a checkout amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
