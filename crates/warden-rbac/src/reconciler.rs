//! RBAC reconciliation pass.
//!
//! A pass runs in two phases:
//!
//! 1. **Backup sweep.** Every cached operator-owned object stamped with a
//!    different install strategy than the current one gets a one-time
//!    copy under a generated name, before anything overwrites it.
//! 2. **Create or update.** Each desired object is created if missing,
//!    replaced if its stamp is stale, and left alone otherwise. A stale
//!    object whose backup failed is held back until a later pass manages
//!    to back it up.
//!
//! Failures are attributed to single objects. The pass always runs to the
//! end and reports every failure at once.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use warden_cluster::{
    CacheEvent, CacheEventType, ClusterError, ClusterRole, ClusterRoleBinding, Installation,
    ObjectKey, ResourceCache, ResourceClient, ResourceKind, Role, RoleBinding,
};
use warden_core::{WardenConfig, is_managed_by_operator};

use crate::error::{ObjectFailure, ObjectOp, RbacResult, ReconcileError};
use crate::expectations::Expectations;
use crate::kinds::{ManagedKind, RbacCache, RbacClient};
use crate::metadata::{
    VersionTag, backup_source, inject_operator_metadata, make_backup, object_matches_version,
};
use crate::strategy::ManagedResource;

/// What a pass reconciles against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallContext {
    /// Expectation owner; the installation's `namespace/name`.
    pub owner_key: String,
    /// Installation generation stamped on every object.
    pub generation: i64,
    pub version: VersionTag,
    pub service_monitor_enabled: bool,
}

impl InstallContext {
    pub fn for_installation(installation: &Installation, config: &WardenConfig) -> RbacResult<Self> {
        Ok(Self {
            owner_key: ObjectKey::from_meta(&installation.metadata).to_string(),
            generation: installation.metadata.generation,
            version: VersionTag::for_installation(installation, &config.install)?,
            service_monitor_enabled: config.features.service_monitor,
        })
    }
}

/// Per-pass object counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub backed_up: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Stale objects left untouched because their backup failed.
    pub held_back: usize,
}

impl PassReport {
    pub fn mutations(&self) -> usize {
        self.created + self.updated + self.backed_up
    }
}

#[derive(Default)]
struct Pass {
    report: PassReport,
    failures: Vec<ObjectFailure>,
    unbacked: HashSet<(ResourceKind, ObjectKey)>,
}

impl Pass {
    fn fail(&mut self, kind: ResourceKind, key: ObjectKey, op: ObjectOp, error: ClusterError) {
        error!(%kind, %key, %op, %error, "reconcile step failed");
        self.failures.push(ObjectFailure {
            kind,
            key,
            op,
            error,
        });
    }
}

/// Reconciles managed access-control objects for one installation.
pub struct Reconciler<C, S> {
    client: C,
    cache: S,
    expectations: Arc<Expectations>,
    ctx: InstallContext,
}

impl<C, S> Reconciler<C, S> {
    pub fn new(client: C, cache: S, expectations: Arc<Expectations>, ctx: InstallContext) -> Self {
        Self {
            client,
            cache,
            expectations,
            ctx,
        }
    }

    pub fn context(&self) -> &InstallContext {
        &self.ctx
    }

    /// Feed cache events back into the expectation tracker.
    ///
    /// Only operator-owned objects of the managed kinds count.
    pub fn observe(&self, events: &[CacheEvent]) {
        for event in events {
            if !ResourceKind::RBAC.contains(&event.kind) || !is_managed_by_operator(&event.labels) {
                continue;
            }
            match event.event {
                CacheEventType::Added => {
                    self.expectations
                        .creation_observed(&self.ctx.owner_key, event.kind)
                }
                CacheEventType::Deleted => {
                    self.expectations
                        .deletion_observed(&self.ctx.owner_key, event.kind)
                }
                CacheEventType::Modified => {}
            }
        }
    }

    /// Run one pass over `desired`.
    pub fn reconcile(&self, desired: &[ManagedResource]) -> Result<PassReport, ReconcileError>
    where
        C: RbacClient,
        S: RbacCache,
    {
        let mut pass = Pass::default();

        self.backup_kind::<ClusterRole>(&mut pass);
        self.backup_kind::<ClusterRoleBinding>(&mut pass);
        self.backup_kind::<Role>(&mut pass);
        self.backup_kind::<RoleBinding>(&mut pass);

        for resource in desired {
            match resource {
                ManagedResource::ClusterRole(obj) => self.create_or_update(obj, &mut pass),
                ManagedResource::ClusterRoleBinding(obj) => self.create_or_update(obj, &mut pass),
                ManagedResource::Role(obj) => self.create_or_update(obj, &mut pass),
                ManagedResource::RoleBinding(obj) => self.create_or_update(obj, &mut pass),
            }
        }

        let Pass {
            report, failures, ..
        } = pass;
        info!(
            owner = %self.ctx.owner_key,
            created = report.created,
            updated = report.updated,
            backed_up = report.backed_up,
            unchanged = report.unchanged,
            held_back = report.held_back,
            failed = failures.len(),
            "rbac reconciliation pass finished"
        );

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(ReconcileError::Partial { report, failures })
        }
    }

    // ── Backups ───────────────────────────────────────────────────

    fn backup_kind<K>(&self, pass: &mut Pass)
    where
        K: ManagedKind,
        C: ResourceClient<K>,
        S: ResourceCache<K>,
    {
        let cached: Vec<K> = self.cache.list();

        for obj in &cached {
            let Some(previous) = self.needs_backup(obj, &cached) else {
                continue;
            };
            let Some(backup) = make_backup(obj) else {
                continue;
            };

            let key = obj.key();
            self.expectations
                .raise(&self.ctx.owner_key, K::KIND, 1, 0);
            match self.client.create(&backup) {
                Ok(stored) => {
                    info!(
                        kind = %K::KIND,
                        %key,
                        backup = %stored.metadata().name,
                        version = %previous.image_tag,
                        "backup created"
                    );
                    pass.report.backed_up += 1;
                }
                Err(e) => {
                    self.expectations
                        .lower(&self.ctx.owner_key, K::KIND, 1, 0);
                    pass.unbacked.insert((K::KIND, key.clone()));
                    pass.fail(K::KIND, key, ObjectOp::Backup, e);
                }
            }
        }
    }

    /// The version to back `obj` up under, if it needs a backup.
    fn needs_backup<K: ManagedKind>(&self, obj: &K, cached: &[K]) -> Option<VersionTag> {
        let meta = obj.metadata();
        if K::exempt(meta, &self.ctx)
            || meta.is_deleting()
            || !is_managed_by_operator(&meta.labels)
            || backup_source(meta).is_some()
        {
            return None;
        }

        let previous = VersionTag::from_meta(meta)?;
        if object_matches_version(meta, &self.ctx.version, self.ctx.generation) {
            return None;
        }
        // A generation-only change rewrites the object in place.
        if previous == self.ctx.version {
            return None;
        }

        let already_backed_up = cached.iter().any(|other| {
            let other = other.metadata();
            backup_source(other) == Some(meta.uid.as_str())
                && VersionTag::from_meta(other).as_ref() == Some(&previous)
        });
        if already_backed_up {
            debug!(kind = %K::KIND, key = %obj.key(), "backup already exists");
            return None;
        }
        Some(previous)
    }

    // ── Create / update ───────────────────────────────────────────

    fn create_or_update<K>(&self, desired: &K, pass: &mut Pass)
    where
        K: ManagedKind,
        C: ResourceClient<K>,
        S: ResourceCache<K>,
    {
        let key = desired.key();
        if K::exempt(desired.metadata(), &self.ctx) {
            debug!(kind = %K::KIND, %key, "monitoring disabled, skipping");
            pass.report.skipped += 1;
            return;
        }

        let mut obj = desired.clone();
        inject_operator_metadata(obj.metadata_mut(), &self.ctx.version, self.ctx.generation);

        let Some(cached) = self.cache.get(&key) else {
            self.expectations
                .raise(&self.ctx.owner_key, K::KIND, 1, 0);
            match self.client.create(&obj) {
                Ok(_) => {
                    info!(kind = %K::KIND, %key, "created");
                    pass.report.created += 1;
                }
                Err(e) => {
                    self.expectations
                        .lower(&self.ctx.owner_key, K::KIND, 1, 0);
                    pass.fail(K::KIND, key, ObjectOp::Create, e);
                }
            }
            return;
        };

        if object_matches_version(cached.metadata(), &self.ctx.version, self.ctx.generation) {
            debug!(kind = %K::KIND, %key, "already up to date");
            pass.report.unchanged += 1;
            return;
        }

        if pass.unbacked.contains(&(K::KIND, key.clone())) {
            warn!(kind = %K::KIND, %key, "backup failed, holding back update");
            pass.report.held_back += 1;
            return;
        }

        // Access-control content is replaced wholesale; no merge needed.
        match self.client.update(&obj) {
            Ok(_) => {
                info!(kind = %K::KIND, %key, "updated");
                pass.report.updated += 1;
            }
            Err(e) => pass.fail(K::KIND, key, ObjectOp::Update, e),
        }
    }
}
