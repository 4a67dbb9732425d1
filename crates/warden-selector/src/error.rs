//! Selector construction errors.

use thiserror::Error;

/// Errors raised while building a requirement or selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("invalid label key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("invalid label value {value:?} for key {key:?}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("operator {operator} on key {key:?}: {reason}")]
    InvalidValues {
        key: String,
        operator: String,
        reason: String,
    },

    #[error("unsupported node selector operator {operator:?} on key {key:?}")]
    UnsupportedOperator { key: String, operator: String },
}

pub type SelectorResult<T> = Result<T, SelectorError>;
