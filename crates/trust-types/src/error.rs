use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    #[error("amount overflow")]
    AmountOverflow,

    #[error("unknown alert level {0:?}")]
    UnknownAlertLevel(String),
}
