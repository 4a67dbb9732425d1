//! Per-kind policy for the four managed access-control kinds.

use warden_cluster::{
    ClusterRole, ClusterRoleBinding, ObjectMeta, Resource, ResourceCache, ResourceClient, Role,
    RoleBinding,
};
use warden_core::MONITOR_SERVICE_ACCOUNT_NAME;

use crate::reconciler::InstallContext;

/// A kind the reconciler manages.
///
/// The reconciler treats every kind the same way; differences are
/// expressed through the hooks here.
pub trait ManagedKind: Resource {
    /// Objects of this kind the current installation must leave alone,
    /// both for create/update and for backups.
    fn exempt(_meta: &ObjectMeta, _ctx: &InstallContext) -> bool {
        false
    }
}

impl ManagedKind for ClusterRole {}

impl ManagedKind for ClusterRoleBinding {}

impl ManagedKind for Role {
    fn exempt(meta: &ObjectMeta, ctx: &InstallContext) -> bool {
        monitoring_disabled_for(meta, ctx)
    }
}

impl ManagedKind for RoleBinding {
    fn exempt(meta: &ObjectMeta, ctx: &InstallContext) -> bool {
        monitoring_disabled_for(meta, ctx)
    }
}

/// The monitoring role and binding are only managed while the service
/// monitor feature is on.
fn monitoring_disabled_for(meta: &ObjectMeta, ctx: &InstallContext) -> bool {
    !ctx.service_monitor_enabled && meta.name == MONITOR_SERVICE_ACCOUNT_NAME
}

/// Cluster API client for all managed kinds.
pub trait RbacClient:
    ResourceClient<ClusterRole>
    + ResourceClient<ClusterRoleBinding>
    + ResourceClient<Role>
    + ResourceClient<RoleBinding>
{
}

impl<T> RbacClient for T where
    T: ResourceClient<ClusterRole>
        + ResourceClient<ClusterRoleBinding>
        + ResourceClient<Role>
        + ResourceClient<RoleBinding>
{
}

/// Read cache for all managed kinds.
pub trait RbacCache:
    ResourceCache<ClusterRole>
    + ResourceCache<ClusterRoleBinding>
    + ResourceCache<Role>
    + ResourceCache<RoleBinding>
{
}

impl<T> RbacCache for T where
    T: ResourceCache<ClusterRole>
        + ResourceCache<ClusterRoleBinding>
        + ResourceCache<Role>
        + ResourceCache<RoleBinding>
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::VersionTag;

    fn ctx(service_monitor_enabled: bool) -> InstallContext {
        InstallContext {
            owner_key: "warden/warden".to_string(),
            generation: 1,
            version: VersionTag::new("v1", "registry.local/warden", "0123456789abcdef"),
            service_monitor_enabled,
        }
    }

    #[test]
    fn monitor_objects_exempt_only_when_disabled() {
        let monitor = ObjectMeta::namespaced("warden", MONITOR_SERVICE_ACCOUNT_NAME);
        assert!(<Role as ManagedKind>::exempt(&monitor, &ctx(false)));
        assert!(<RoleBinding as ManagedKind>::exempt(&monitor, &ctx(false)));
        assert!(!<Role as ManagedKind>::exempt(&monitor, &ctx(true)));
    }

    #[test]
    fn cluster_scoped_kinds_never_exempt() {
        let monitor = ObjectMeta::named(MONITOR_SERVICE_ACCOUNT_NAME);
        assert!(!<ClusterRole as ManagedKind>::exempt(&monitor, &ctx(false)));
        assert!(!<ClusterRoleBinding as ManagedKind>::exempt(&monitor, &ctx(false)));
    }

    #[test]
    fn other_roles_not_exempt() {
        let meta = ObjectMeta::namespaced("warden", "warden-handler");
        assert!(!<Role as ManagedKind>::exempt(&meta, &ctx(false)));
    }
}
