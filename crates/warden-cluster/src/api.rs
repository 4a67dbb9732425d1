//! Contracts of the cluster API collaborator.
//!
//! Each call is one synchronous request/response. Timeouts and retries
//! belong to whoever schedules the calling pass.

use warden_core::Labels;

use crate::error::ClusterResult;
use crate::resource::{ObjectKey, Resource};
use crate::types::{Installation, Pod};

/// Write-through client for one kind of object.
pub trait ResourceClient<R: Resource> {
    /// Create `obj`. If its name is empty the cluster derives one from
    /// `generate_name`. Returns the object as stored.
    fn create(&self, obj: &R) -> ClusterResult<R>;

    /// Replace the stored object with the same identity. The cluster keeps
    /// the existing UID and bumps the resource version.
    fn update(&self, obj: &R) -> ClusterResult<R>;

    /// List objects, optionally restricted to a namespace.
    fn list_in(&self, namespace: Option<&str>) -> ClusterResult<Vec<R>>;
}

/// Eventually-consistent read cache for one kind of object.
///
/// May not yet reflect writes issued through a [`ResourceClient`].
pub trait ResourceCache<R: Resource> {
    fn get(&self, key: &ObjectKey) -> Option<R>;

    fn list(&self) -> Vec<R>;
}

/// Filter for a pod listing: bound to `node_name` and carrying every label.
#[derive(Debug, Clone, PartialEq)]
pub struct PodQuery {
    pub node_name: String,
    pub labels: Labels,
}

pub trait PodLister {
    fn list_pods(&self, query: &PodQuery) -> ClusterResult<Vec<Pod>>;
}

pub trait InstallationLister {
    fn list_installations(&self) -> ClusterResult<Vec<Installation>>;
}
