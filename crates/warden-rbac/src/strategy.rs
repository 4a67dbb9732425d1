//! The desired set of managed access-control objects.

use std::path::Path;

use serde::{Deserialize, Serialize};
use warden_cluster::{
    ClusterRole, ClusterRoleBinding, ObjectKey, ObjectMeta, PolicyRule, Resource, ResourceKind,
    Role, RoleBinding, RoleRef, Subject,
};
use warden_core::MONITOR_SERVICE_ACCOUNT_NAME;

use crate::error::{RbacError, RbacResult};

/// One desired object, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagedResource {
    ClusterRole(ClusterRole),
    ClusterRoleBinding(ClusterRoleBinding),
    Role(Role),
    RoleBinding(RoleBinding),
}

impl ManagedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ClusterRole(_) => ResourceKind::ClusterRole,
            Self::ClusterRoleBinding(_) => ResourceKind::ClusterRoleBinding,
            Self::Role(_) => ResourceKind::Role,
            Self::RoleBinding(_) => ResourceKind::RoleBinding,
        }
    }

    pub fn key(&self) -> ObjectKey {
        match self {
            Self::ClusterRole(o) => o.key(),
            Self::ClusterRoleBinding(o) => o.key(),
            Self::Role(o) => o.key(),
            Self::RoleBinding(o) => o.key(),
        }
    }
}

/// Ordered list of desired objects for one install.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallStrategy {
    pub resources: Vec<ManagedResource>,
}

impl InstallStrategy {
    /// Load a strategy from a JSON file.
    pub fn load(path: &Path) -> RbacResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> RbacResult<Self> {
        let strategy: Self =
            serde_json::from_str(json).map_err(|e| RbacError::Strategy(e.to_string()))?;
        for resource in &strategy.resources {
            let key = resource.key();
            if key.name.is_empty() {
                return Err(RbacError::Strategy(format!("{} without a name", resource.kind())));
            }
            if resource.kind().is_namespaced() != key.namespace.is_some() {
                return Err(RbacError::Strategy(format!(
                    "{} {key}: namespace does not match the kind's scope",
                    resource.kind()
                )));
            }
        }
        Ok(strategy)
    }

    /// The access-control objects of a stock install into `namespace`.
    pub fn default_for(namespace: &str) -> Self {
        let mut resources = Vec::new();

        for (name, rules) in [
            (
                "warden-operator",
                vec![
                    PolicyRule::new("warden.io", &["installations"], &["get", "list", "watch", "update"]),
                    PolicyRule::new(
                        "rbac.authorization.k8s.io",
                        &["clusterroles", "clusterrolebindings", "roles", "rolebindings"],
                        &["get", "list", "watch", "create", "update"],
                    ),
                ],
            ),
            (
                "warden-controller",
                vec![
                    PolicyRule::new("", &["pods"], &["get", "list", "watch", "create", "delete"]),
                    PolicyRule::new("", &["nodes"], &["get", "list", "watch", "patch"]),
                ],
            ),
            (
                "warden-handler",
                vec![
                    PolicyRule::new("", &["nodes"], &["get", "patch"]),
                    PolicyRule::new("", &["pods"], &["get", "list", "watch"]),
                ],
            ),
        ] {
            resources.push(ManagedResource::ClusterRole(ClusterRole {
                metadata: ObjectMeta::named(name),
                rules,
            }));
            resources.push(ManagedResource::ClusterRoleBinding(ClusterRoleBinding {
                metadata: ObjectMeta::named(name),
                role_ref: RoleRef::cluster_role(name),
                subjects: vec![Subject::service_account(namespace, name)],
            }));
        }

        resources.push(ManagedResource::Role(Role {
            metadata: ObjectMeta::namespaced(namespace, "warden-operator"),
            rules: vec![PolicyRule::new(
                "",
                &["configmaps", "secrets"],
                &["get", "list", "watch", "create", "update"],
            )],
        }));
        resources.push(ManagedResource::RoleBinding(RoleBinding {
            metadata: ObjectMeta::namespaced(namespace, "warden-operator"),
            role_ref: RoleRef::role("warden-operator"),
            subjects: vec![Subject::service_account(namespace, "warden-operator")],
        }));

        resources.push(ManagedResource::Role(Role {
            metadata: ObjectMeta::namespaced(namespace, MONITOR_SERVICE_ACCOUNT_NAME),
            rules: vec![PolicyRule::new(
                "",
                &["services", "endpoints", "pods"],
                &["get", "list", "watch"],
            )],
        }));
        resources.push(ManagedResource::RoleBinding(RoleBinding {
            metadata: ObjectMeta::namespaced(namespace, MONITOR_SERVICE_ACCOUNT_NAME),
            role_ref: RoleRef::role(MONITOR_SERVICE_ACCOUNT_NAME),
            subjects: vec![Subject::service_account(
                "monitoring",
                MONITOR_SERVICE_ACCOUNT_NAME,
            )],
        }));

        Self { resources }
    }
}
