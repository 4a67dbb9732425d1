//! warden-cluster: the cluster object model and the API contracts the
//! Warden engines consume.
//!
//! The admission and reconciliation engines never talk to a cluster
//! directly. They see it through the traits in [`api`]:
//!
//! - [`ResourceClient`]: `create` / `update` / `list` per kind
//! - [`ResourceCache`]: the eventually-consistent read cache (`get` / `list`)
//! - [`PodLister`] / [`InstallationLister`]: the two admission reads
//!
//! [`MemoryCluster`] implements all of them over JSON-encoded objects held
//! in memory. Its cache can lag behind writes, which lets callers exercise
//! the eventual-consistency paths deterministically.

pub mod api;
pub mod error;
pub mod memory;
pub mod rbac;
pub mod resource;
pub mod types;

pub use api::{InstallationLister, PodLister, PodQuery, ResourceCache, ResourceClient};
pub use error::{ClusterError, ClusterResult};
pub use memory::{CacheEvent, CacheEventType, ClusterAction, ClusterSnapshot, MemoryCluster, Verb};
pub use rbac::*;
pub use resource::{ObjectKey, Resource, ResourceKind};
pub use types::*;
