//! Resource kinds and object identity.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::rbac::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use crate::types::{Installation, ObjectMeta, Pod};

/// Every kind of object the cluster collaborator stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    ClusterRole,
    ClusterRoleBinding,
    Role,
    RoleBinding,
    Pod,
    Installation,
}

impl ResourceKind {
    /// The four access-control kinds, in reconciliation order.
    pub const RBAC: [ResourceKind; 4] = [
        ResourceKind::ClusterRole,
        ResourceKind::ClusterRoleBinding,
        ResourceKind::Role,
        ResourceKind::RoleBinding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClusterRole => "clusterrole",
            Self::ClusterRoleBinding => "clusterrolebinding",
            Self::Role => "role",
            Self::RoleBinding => "rolebinding",
            Self::Pod => "pod",
            Self::Installation => "installation",
        }
    }

    pub fn is_namespaced(self) -> bool {
        matches!(
            self,
            Self::Role | Self::RoleBinding | Self::Pod | Self::Installation
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an object within its kind: `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: &str) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn from_meta(meta: &ObjectMeta) -> Self {
        Self::new(meta.namespace.as_deref(), &meta.name)
    }
}

/// Renders as `{namespace}/{name}` or `{name}` for cluster-scoped objects.
impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A typed cluster object.
pub trait Resource: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn key(&self) -> ObjectKey {
        ObjectKey::from_meta(self.metadata())
    }
}

macro_rules! impl_resource {
    ($ty:ty, $kind:ident) => {
        impl Resource for $ty {
            const KIND: ResourceKind = ResourceKind::$kind;

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

impl_resource!(ClusterRole, ClusterRole);
impl_resource!(ClusterRoleBinding, ClusterRoleBinding);
impl_resource!(Role, Role);
impl_resource!(RoleBinding, RoleBinding);
impl_resource!(Pod, Pod);
impl_resource!(Installation, Installation);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        assert_eq!(ObjectKey::new(None, "reader").to_string(), "reader");
        assert_eq!(ObjectKey::new(Some("ops"), "reader").to_string(), "ops/reader");
    }

    #[test]
    fn scope_per_kind() {
        assert!(!ResourceKind::ClusterRole.is_namespaced());
        assert!(!ResourceKind::ClusterRoleBinding.is_namespaced());
        assert!(ResourceKind::Role.is_namespaced());
        assert!(ResourceKind::RoleBinding.is_namespaced());
    }

    #[test]
    fn key_comes_from_metadata() {
        let role = Role {
            metadata: ObjectMeta::namespaced("ops", "reader"),
            rules: vec![],
        };
        assert_eq!(role.key(), ObjectKey::new(Some("ops"), "reader"));
        assert_eq!(<Role as Resource>::KIND, ResourceKind::Role);
    }
}
