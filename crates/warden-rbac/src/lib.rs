//! Warden RBAC reconciler: drives roles and bindings toward a versioned
//! install strategy.
//!
//! Every pass first takes an ephemeral backup of each managed object that
//! belongs to an older version, then creates missing objects and replaces
//! stale ones. Creates are announced to an [`Expectations`] tracker so the
//! caller can hold off the next pass until the cache has caught up.
//!
//! # Components
//!
//! - **`expectations`**: Per-owner pending create/delete counters
//! - **`metadata`**: Version tag stamping and matching, backup construction
//! - **`kinds`**: Per-kind policy hooks
//! - **`strategy`**: The desired set of managed objects
//! - **`reconciler`**: The pass itself

pub mod error;
pub mod expectations;
pub mod kinds;
pub mod metadata;
pub mod reconciler;
pub mod strategy;

pub use error::{ObjectFailure, ObjectOp, RbacError, RbacResult, ReconcileError};
pub use expectations::Expectations;
pub use kinds::{ManagedKind, RbacCache, RbacClient};
pub use metadata::{
    VersionTag, backup_source, inject_operator_metadata, make_backup, object_matches_version,
};
pub use reconciler::{InstallContext, PassReport, Reconciler};
pub use strategy::{InstallStrategy, ManagedResource};
