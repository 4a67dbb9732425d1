//! Reconciliation error types.

use std::fmt;

use thiserror::Error;
use warden_cluster::{ClusterError, ObjectKey, ResourceKind};

use crate::reconciler::PassReport;

pub type RbacResult<T> = Result<T, RbacError>;

/// Errors outside of a pass: deriving the context or loading a strategy.
#[derive(Debug, Error)]
pub enum RbacError {
    #[error("failed to encode installation spec: {0}")]
    Encode(String),

    #[error("invalid install strategy: {0}")]
    Strategy(String),

    #[error("install strategy i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("refusing to reconcile {0} installations; at most one may exist")]
    MultipleInstallations(usize),
}

/// The cluster call that failed for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectOp {
    Create,
    Update,
    Backup,
}

impl fmt::Display for ObjectOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectOp::Create => "create",
            ObjectOp::Update => "update",
            ObjectOp::Backup => "backup",
        })
    }
}

/// A failure attributed to one managed object.
#[derive(Debug, Error)]
#[error("unable to {op} {kind} {key}: {error}")]
pub struct ObjectFailure {
    pub kind: ResourceKind,
    pub key: ObjectKey,
    pub op: ObjectOp,
    #[source]
    pub error: ClusterError,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Some objects failed; everything else in the pass was processed.
    #[error("reconciliation pass had {} failed object(s)", .failures.len())]
    Partial {
        report: PassReport,
        failures: Vec<ObjectFailure>,
    },
}

impl ReconcileError {
    pub fn failures(&self) -> &[ObjectFailure] {
        match self {
            ReconcileError::Partial { failures, .. } => failures,
        }
    }

    pub fn report(&self) -> &PassReport {
        match self {
            ReconcileError::Partial { report, .. } => report,
        }
    }
}
