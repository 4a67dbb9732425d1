//! Error types for cluster API calls.

use thiserror::Error;

use crate::resource::ResourceKind;

/// Result type alias for cluster API calls.
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by the cluster API collaborator.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: ResourceKind, key: String },

    #[error("{kind} {key} not found")]
    NotFound { kind: ResourceKind, key: String },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: ResourceKind, reason: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("snapshot i/o error: {0}")]
    Io(#[from] std::io::Error),
}
