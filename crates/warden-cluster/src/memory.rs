//! MemoryCluster: an in-memory cluster API with a separately synced cache.
//!
//! Objects are JSON-encoded per kind, keyed by [`ObjectKey`]. Writes land in
//! the live view immediately; the cache view follows either on every write
//! (the default) or only when [`MemoryCluster::sync_cache`] is called, which
//! models an informer that has not caught up yet. Either way the changes
//! are reported as [`CacheEvent`]s by the next sync.
//!
//! Every API call is recorded as a [`ClusterAction`], and calls can be made
//! to fail with [`MemoryCluster::fail_on`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::{InstallationLister, PodLister, PodQuery, ResourceCache, ResourceClient};
use crate::error::{ClusterError, ClusterResult};
use crate::rbac::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use crate::resource::{ObjectKey, Resource, ResourceKind};
use crate::types::{Installation, Pod};

/// Convert any `Display` error into a `ClusterError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| ClusterError::$variant(e.to_string())
    };
}

/// Alphabet for generated name suffixes (no vowels, no look-alikes).
const NAME_SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const NAME_SUFFIX_LEN: usize = 5;

type Bucket = BTreeMap<ObjectKey, Vec<u8>>;

/// API verb of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verb {
    Create,
    Update,
    List,
}

/// A call made against the cluster, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterAction {
    pub verb: Verb,
    pub kind: ResourceKind,
    /// Requested identity; `generate_name*` for server-named creates.
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventType {
    Added,
    Modified,
    Deleted,
}

/// A change that became visible in the cache during a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub event: CacheEventType,
    pub kind: ResourceKind,
    pub key: ObjectKey,
    /// Labels of the object as cached (as last cached, for deletions).
    pub labels: warden_core::Labels,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    verb: Verb,
    kind: ResourceKind,
    /// Matches the object name or generate-name; empty matches everything.
    name: String,
}

#[derive(Default)]
struct Inner {
    live: BTreeMap<ResourceKind, Bucket>,
    cache: BTreeMap<ResourceKind, Bucket>,
    lagging_cache: bool,
    sequence: u64,
    actions: Vec<ClusterAction>,
    failures: Vec<InjectedFailure>,
    /// Changes already applied to the cache but not yet reported.
    unreported: Vec<CacheEvent>,
}

impl Inner {
    fn check_failure(&self, verb: Verb, kind: ResourceKind, name: &str) -> ClusterResult<()> {
        let hit = self.failures.iter().any(|f| {
            f.verb == verb && f.kind == kind && (f.name.is_empty() || f.name == name)
        });
        if hit {
            return Err(ClusterError::Rejected(format!(
                "{verb:?} {kind} {name} refused by injected failure"
            )));
        }
        Ok(())
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn put_live(&mut self, kind: ResourceKind, key: ObjectKey, value: Vec<u8>) {
        if !self.lagging_cache {
            let bucket = self.cache.entry(kind).or_default();
            let event = if bucket.contains_key(&key) {
                CacheEventType::Modified
            } else {
                CacheEventType::Added
            };
            self.unreported.push(CacheEvent {
                event,
                kind,
                key: key.clone(),
                labels: labels_of(&value),
            });
            bucket.insert(key.clone(), value.clone());
        }
        self.live.entry(kind).or_default().insert(key, value);
    }
}

/// Point-in-time export of every object in a [`MemoryCluster`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSnapshot {
    pub installations: Vec<Installation>,
    pub pods: Vec<Pod>,
    pub cluster_roles: Vec<ClusterRole>,
    pub cluster_role_bindings: Vec<ClusterRoleBinding>,
    pub roles: Vec<Role>,
    pub role_bindings: Vec<RoleBinding>,
}

/// Thread-safe in-memory cluster. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCluster {
    /// Cluster whose cache reflects every write immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster whose cache only changes on [`MemoryCluster::sync_cache`].
    pub fn with_lagging_cache() -> Self {
        let cluster = Self::default();
        cluster.write().lagging_cache = true;
        cluster
    }

    /// Build a cluster from a snapshot. Objects keep their UIDs.
    pub fn from_snapshot(snapshot: ClusterSnapshot) -> ClusterResult<Self> {
        let cluster = Self::new();
        for obj in snapshot.installations {
            cluster.seed(obj)?;
        }
        for obj in snapshot.pods {
            cluster.seed(obj)?;
        }
        for obj in snapshot.cluster_roles {
            cluster.seed(obj)?;
        }
        for obj in snapshot.cluster_role_bindings {
            cluster.seed(obj)?;
        }
        for obj in snapshot.roles {
            cluster.seed(obj)?;
        }
        for obj in snapshot.role_bindings {
            cluster.seed(obj)?;
        }
        Ok(cluster)
    }

    /// Load a JSON snapshot file.
    pub fn load(path: &Path) -> ClusterResult<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: ClusterSnapshot =
            serde_json::from_slice(&bytes).map_err(map_err!(Deserialize))?;
        debug!(?path, "cluster snapshot loaded");
        Self::from_snapshot(snapshot)
    }

    /// Write the live view to a JSON snapshot file.
    pub fn save(&self, path: &Path) -> ClusterResult<()> {
        let bytes =
            serde_json::to_vec_pretty(&self.snapshot()?).map_err(map_err!(Serialize))?;
        std::fs::write(path, bytes)?;
        debug!(?path, "cluster snapshot saved");
        Ok(())
    }

    /// Export the live view.
    pub fn snapshot(&self) -> ClusterResult<ClusterSnapshot> {
        let inner = self.read();
        Ok(ClusterSnapshot {
            installations: decode_bucket(inner.live.get(&ResourceKind::Installation))?,
            pods: decode_bucket(inner.live.get(&ResourceKind::Pod))?,
            cluster_roles: decode_bucket(inner.live.get(&ResourceKind::ClusterRole))?,
            cluster_role_bindings: decode_bucket(inner.live.get(&ResourceKind::ClusterRoleBinding))?,
            roles: decode_bucket(inner.live.get(&ResourceKind::Role))?,
            role_bindings: decode_bucket(inner.live.get(&ResourceKind::RoleBinding))?,
        })
    }

    /// Insert or replace an object in both views without recording an action.
    ///
    /// Missing UIDs are assigned. Used for fixtures and snapshot import.
    pub fn seed<R: Resource>(&self, obj: R) -> ClusterResult<R> {
        let mut inner = self.write();
        let mut stored = obj;
        let seq = inner.next_sequence();
        let key = stored.key();
        let meta = stored.metadata_mut();
        if meta.uid.is_empty() {
            meta.uid = generate_uid(R::KIND, &key, seq);
        }
        if meta.resource_version.is_empty() {
            meta.resource_version = seq.to_string();
        }
        let value = encode(&stored)?;
        inner
            .cache
            .entry(R::KIND)
            .or_default()
            .insert(key.clone(), value.clone());
        inner.live.entry(R::KIND).or_default().insert(key, value);
        Ok(stored)
    }

    /// Remove an object from the live view, as an external collector would.
    /// Returns true if it existed.
    pub fn remove(&self, kind: ResourceKind, key: &ObjectKey) -> bool {
        let mut inner = self.write();
        let existed = inner
            .live
            .get_mut(&kind)
            .and_then(|bucket| bucket.remove(key))
            .is_some();
        if existed && !inner.lagging_cache {
            let removed = inner
                .cache
                .get_mut(&kind)
                .and_then(|bucket| bucket.remove(key));
            if let Some(value) = removed {
                inner.unreported.push(CacheEvent {
                    event: CacheEventType::Deleted,
                    kind,
                    key: key.clone(),
                    labels: labels_of(&value),
                });
            }
        }
        existed
    }

    /// Bring the cache up to date with the live view and report what changed
    /// since the previous sync.
    pub fn sync_cache(&self) -> Vec<CacheEvent> {
        let mut inner = self.write();
        let mut events = std::mem::take(&mut inner.unreported);
        let empty = Bucket::new();

        let kinds: BTreeSet<ResourceKind> = inner
            .live
            .keys()
            .chain(inner.cache.keys())
            .copied()
            .collect();
        for kind in kinds {
            let live = inner.live.get(&kind).unwrap_or(&empty);
            let cached = inner.cache.get(&kind).unwrap_or(&empty);

            for (key, value) in live {
                let event = match cached.get(key) {
                    None => CacheEventType::Added,
                    Some(old) if old != value => CacheEventType::Modified,
                    Some(_) => continue,
                };
                events.push(CacheEvent {
                    event,
                    kind,
                    key: key.clone(),
                    labels: labels_of(value),
                });
            }
            for (key, value) in cached {
                if !live.contains_key(key) {
                    events.push(CacheEvent {
                        event: CacheEventType::Deleted,
                        kind,
                        key: key.clone(),
                        labels: labels_of(value),
                    });
                }
            }
        }

        inner.cache = inner.live.clone();
        events.sort_by(|a, b| (a.kind, &a.key).cmp(&(b.kind, &b.key)));
        debug!(events = events.len(), "cache synced");
        events
    }

    /// Make matching calls fail until [`MemoryCluster::clear_failures`].
    ///
    /// `name` matches the object name (or generate-name); empty matches all.
    pub fn fail_on(&self, verb: Verb, kind: ResourceKind, name: &str) {
        self.write().failures.push(InjectedFailure {
            verb,
            kind,
            name: name.to_string(),
        });
    }

    pub fn clear_failures(&self) {
        self.write().failures.clear();
    }

    /// Every call recorded so far, in order.
    pub fn actions(&self) -> Vec<ClusterAction> {
        self.read().actions.clone()
    }

    /// Number of create and update calls recorded.
    pub fn mutation_count(&self) -> usize {
        self.read()
            .actions
            .iter()
            .filter(|a| matches!(a.verb, Verb::Create | Verb::Update))
            .count()
    }

    pub fn clear_actions(&self) {
        self.write().actions.clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Resource> ResourceClient<R> for MemoryCluster {
    fn create(&self, obj: &R) -> ClusterResult<R> {
        let mut inner = self.write();
        let meta = obj.metadata();
        let requested = if meta.name.is_empty() {
            &meta.generate_name
        } else {
            &meta.name
        };
        inner.actions.push(ClusterAction {
            verb: Verb::Create,
            kind: R::KIND,
            key: if meta.name.is_empty() {
                format!("{}*", ObjectKey::new(meta.namespace.as_deref(), requested))
            } else {
                obj.key().to_string()
            },
        });
        inner.check_failure(Verb::Create, R::KIND, requested)?;
        check_scope(R::KIND, meta.namespace.as_deref())?;

        let mut stored = obj.clone();
        let seq = inner.next_sequence();
        {
            let meta = stored.metadata_mut();
            if meta.name.is_empty() {
                if meta.generate_name.is_empty() {
                    return Err(ClusterError::Invalid {
                        kind: R::KIND,
                        reason: "name or generateName is required".to_string(),
                    });
                }
                meta.name = generate_name(&meta.generate_name, seq);
            }
        }

        let key = stored.key();
        if inner
            .live
            .get(&R::KIND)
            .is_some_and(|bucket| bucket.contains_key(&key))
        {
            return Err(ClusterError::AlreadyExists {
                kind: R::KIND,
                key: key.to_string(),
            });
        }

        {
            let meta = stored.metadata_mut();
            meta.uid = generate_uid(R::KIND, &key, seq);
            meta.resource_version = seq.to_string();
            if meta.generation == 0 {
                meta.generation = 1;
            }
        }

        let value = encode(&stored)?;
        inner.put_live(R::KIND, key.clone(), value);
        debug!(kind = %R::KIND, %key, "object created");
        Ok(stored)
    }

    fn update(&self, obj: &R) -> ClusterResult<R> {
        let mut inner = self.write();
        let key = obj.key();
        inner.actions.push(ClusterAction {
            verb: Verb::Update,
            kind: R::KIND,
            key: key.to_string(),
        });
        inner.check_failure(Verb::Update, R::KIND, &key.name)?;

        let existing: R = match inner.live.get(&R::KIND).and_then(|b| b.get(&key)) {
            Some(bytes) => decode(bytes)?,
            None => {
                return Err(ClusterError::NotFound {
                    kind: R::KIND,
                    key: key.to_string(),
                });
            }
        };

        let mut stored = obj.clone();
        let seq = inner.next_sequence();
        {
            let current = existing.metadata();
            let meta = stored.metadata_mut();
            meta.uid = current.uid.clone();
            meta.generation = current.generation;
            meta.generate_name = current.generate_name.clone();
            meta.resource_version = seq.to_string();
        }

        let value = encode(&stored)?;
        inner.put_live(R::KIND, key.clone(), value);
        debug!(kind = %R::KIND, %key, "object updated");
        Ok(stored)
    }

    fn list_in(&self, namespace: Option<&str>) -> ClusterResult<Vec<R>> {
        let mut inner = self.write();
        inner.actions.push(ClusterAction {
            verb: Verb::List,
            kind: R::KIND,
            key: namespace.unwrap_or_default().to_string(),
        });
        inner.check_failure(Verb::List, R::KIND, "")?;
        let all: Vec<R> = decode_bucket(inner.live.get(&R::KIND))?;
        Ok(all
            .into_iter()
            .filter(|obj| namespace.is_none() || obj.metadata().namespace.as_deref() == namespace)
            .collect())
    }
}

impl<R: Resource> ResourceCache<R> for MemoryCluster {
    fn get(&self, key: &ObjectKey) -> Option<R> {
        let inner = self.read();
        let bytes = inner.cache.get(&R::KIND)?.get(key)?;
        match decode(bytes) {
            Ok(obj) => Some(obj),
            Err(e) => {
                warn!(kind = %R::KIND, %key, error = %e, "skipping undecodable cache entry");
                None
            }
        }
    }

    fn list(&self) -> Vec<R> {
        let inner = self.read();
        let Some(bucket) = inner.cache.get(&R::KIND) else {
            return Vec::new();
        };
        bucket
            .iter()
            .filter_map(|(key, bytes)| match decode(bytes) {
                Ok(obj) => Some(obj),
                Err(e) => {
                    warn!(kind = %R::KIND, %key, error = %e, "skipping undecodable cache entry");
                    None
                }
            })
            .collect()
    }
}

impl PodLister for MemoryCluster {
    fn list_pods(&self, query: &PodQuery) -> ClusterResult<Vec<Pod>> {
        let pods: Vec<Pod> = self.list_in(None)?;
        Ok(pods
            .into_iter()
            .filter(|pod| pod.spec.node_name == query.node_name)
            .filter(|pod| {
                query
                    .labels
                    .iter()
                    .all(|(k, v)| pod.metadata.labels.get(k) == Some(v))
            })
            .collect())
    }
}

impl InstallationLister for MemoryCluster {
    fn list_installations(&self) -> ClusterResult<Vec<Installation>> {
        self.list_in(None)
    }
}

fn check_scope(kind: ResourceKind, namespace: Option<&str>) -> ClusterResult<()> {
    match (kind.is_namespaced(), namespace) {
        (true, None) | (true, Some("")) => Err(ClusterError::Invalid {
            kind,
            reason: "namespace is required".to_string(),
        }),
        (false, Some(ns)) => Err(ClusterError::Invalid {
            kind,
            reason: format!("cluster-scoped object cannot set namespace {ns}"),
        }),
        _ => Ok(()),
    }
}

fn encode<R: Resource>(obj: &R) -> ClusterResult<Vec<u8>> {
    serde_json::to_vec(obj).map_err(map_err!(Serialize))
}

fn decode<R: Resource>(bytes: &[u8]) -> ClusterResult<R> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

fn decode_bucket<R: Resource>(bucket: Option<&Bucket>) -> ClusterResult<Vec<R>> {
    bucket
        .into_iter()
        .flat_map(|b| b.values())
        .map(|bytes| decode(bytes))
        .collect()
}

fn labels_of(bytes: &[u8]) -> warden_core::Labels {
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct MetaOnly {
        metadata: crate::types::ObjectMeta,
    }
    serde_json::from_slice::<MetaOnly>(bytes)
        .map(|m| m.metadata.labels)
        .unwrap_or_default()
}

fn digest(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.finalize().into()
}

/// UUID-shaped identifier derived from kind, key and sequence.
fn generate_uid(kind: ResourceKind, key: &ObjectKey, seq: u64) -> String {
    let hex = hex::encode(digest(&[kind.as_str(), &key.to_string(), &seq.to_string()]));
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn generate_name(prefix: &str, seq: u64) -> String {
    let hash = digest(&[prefix, &seq.to_string()]);
    let suffix: String = hash
        .iter()
        .take(NAME_SUFFIX_LEN)
        .map(|b| NAME_SUFFIX_ALPHABET[usize::from(*b) % NAME_SUFFIX_ALPHABET.len()] as char)
        .collect();
    format!("{prefix}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::PolicyRule;
    use crate::types::{ObjectMeta, PodSpec};
    use warden_core::labels;

    fn cluster_role(name: &str) -> ClusterRole {
        ClusterRole {
            metadata: ObjectMeta::named(name),
            rules: vec![PolicyRule::new("", &["pods"], &["get", "list"])],
        }
    }

    fn launcher_pod(name: &str, node: &str) -> Pod {
        let mut metadata = ObjectMeta::namespaced("default", name);
        metadata.labels = labels([("warden.io", "launcher")]);
        Pod {
            metadata,
            spec: PodSpec {
                node_name: node.to_string(),
            },
        }
    }

    // ── Create / update ────────────────────────────────────────────

    #[test]
    fn create_assigns_identity() {
        let cluster = MemoryCluster::new();
        let created = cluster.create(&cluster_role("reader")).unwrap();

        assert!(!created.metadata.uid.is_empty());
        assert_eq!(created.metadata.generation, 1);
        let cached: Option<ClusterRole> = cluster.get(&ObjectKey::new(None, "reader"));
        assert_eq!(cached, Some(created));
    }

    #[test]
    fn create_existing_fails() {
        let cluster = MemoryCluster::new();
        cluster.create(&cluster_role("reader")).unwrap();
        let err = cluster.create(&cluster_role("reader")).unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyExists { .. }));
    }

    #[test]
    fn create_with_generate_name() {
        let cluster = MemoryCluster::new();
        let mut cr = cluster_role("");
        cr.metadata.generate_name = "reader".to_string();

        let a = cluster.create(&cr).unwrap();
        let b = cluster.create(&cr).unwrap();

        assert!(a.metadata.name.starts_with("reader"));
        assert_eq!(a.metadata.name.len(), "reader".len() + NAME_SUFFIX_LEN);
        assert_ne!(a.metadata.name, b.metadata.name);
        assert_ne!(a.metadata.uid, b.metadata.uid);
    }

    #[test]
    fn create_checks_scope() {
        let cluster = MemoryCluster::new();
        let role = Role {
            metadata: ObjectMeta::named("reader"),
            rules: vec![],
        };
        let err = cluster.create(&role).unwrap_err();
        assert!(matches!(err, ClusterError::Invalid { .. }));

        let mut cr = cluster_role("reader");
        cr.metadata.namespace = Some("ops".to_string());
        assert!(cluster.create(&cr).is_err());
    }

    #[test]
    fn update_keeps_uid_and_bumps_version() {
        let cluster = MemoryCluster::new();
        let created = cluster.create(&cluster_role("reader")).unwrap();

        let mut changed = cluster_role("reader");
        changed.rules.push(PolicyRule::new("", &["nodes"], &["get"]));
        let updated = cluster.update(&changed).unwrap();

        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_ne!(updated.metadata.resource_version, created.metadata.resource_version);
        assert_eq!(updated.rules.len(), 2);
    }

    #[test]
    fn update_missing_fails() {
        let cluster = MemoryCluster::new();
        let err = cluster.update(&cluster_role("ghost")).unwrap_err();
        assert!(matches!(err, ClusterError::NotFound { .. }));
    }

    // ── Cache ──────────────────────────────────────────────────────

    #[test]
    fn lagging_cache_hides_writes_until_sync() {
        let cluster = MemoryCluster::with_lagging_cache();
        cluster.create(&cluster_role("reader")).unwrap();

        let cached: Vec<ClusterRole> = cluster.list();
        assert!(cached.is_empty());

        let events = cluster.sync_cache();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, CacheEventType::Added);
        assert_eq!(events[0].kind, ResourceKind::ClusterRole);

        let cached: Vec<ClusterRole> = cluster.list();
        assert_eq!(cached.len(), 1);
        assert!(cluster.sync_cache().is_empty());
    }

    #[test]
    fn sync_reports_removals() {
        let cluster = MemoryCluster::with_lagging_cache();
        cluster.seed(cluster_role("reader")).unwrap();
        assert!(cluster.remove(ResourceKind::ClusterRole, &ObjectKey::new(None, "reader")));

        let events = cluster.sync_cache();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, CacheEventType::Deleted);
    }

    #[test]
    fn immediate_cache_reports_writes_on_next_sync() {
        let cluster = MemoryCluster::new();
        cluster.seed(cluster_role("seeded")).unwrap();
        cluster.create(&cluster_role("reader")).unwrap();
        cluster.update(&cluster_role("reader")).unwrap();

        let events = cluster.sync_cache();
        let kinds: Vec<CacheEventType> = events.iter().map(|e| e.event).collect();
        assert_eq!(kinds, vec![CacheEventType::Added, CacheEventType::Modified]);
        assert!(events.iter().all(|e| e.key.name == "reader"));
        assert!(cluster.sync_cache().is_empty());
    }

    // ── Failures and actions ───────────────────────────────────────

    #[test]
    fn injected_failure_is_scoped_to_name() {
        let cluster = MemoryCluster::new();
        cluster.fail_on(Verb::Create, ResourceKind::ClusterRole, "broken");

        assert!(cluster.create(&cluster_role("broken")).is_err());
        assert!(cluster.create(&cluster_role("fine")).is_ok());
        assert_eq!(cluster.mutation_count(), 2);

        cluster.clear_failures();
        assert!(cluster.create(&cluster_role("broken")).is_ok());
    }

    #[test]
    fn list_filters_namespace() {
        let cluster = MemoryCluster::new();
        for (ns, name) in [("a", "one"), ("a", "two"), ("b", "three")] {
            cluster
                .create(&Role {
                    metadata: ObjectMeta::namespaced(ns, name),
                    rules: vec![],
                })
                .unwrap();
        }

        let in_a: Vec<Role> = cluster.list_in(Some("a")).unwrap();
        assert_eq!(in_a.len(), 2);
        let all: Vec<Role> = cluster.list_in(None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn pods_filtered_by_node_and_labels() {
        let cluster = MemoryCluster::new();
        cluster.seed(launcher_pod("vm-a", "node01")).unwrap();
        cluster.seed(launcher_pod("vm-b", "node02")).unwrap();
        let mut other = launcher_pod("sidecar", "node01");
        other.metadata.labels.clear();
        cluster.seed(other).unwrap();

        let pods = cluster
            .list_pods(&PodQuery {
                node_name: "node01".to_string(),
                labels: labels([("warden.io", "launcher")]),
            })
            .unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].metadata.name, "vm-a");
    }

    #[test]
    fn snapshot_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.json");

        let cluster = MemoryCluster::new();
        let created = cluster.create(&cluster_role("reader")).unwrap();
        cluster.seed(launcher_pod("vm-a", "node01")).unwrap();
        cluster.save(&path).unwrap();

        let reopened = MemoryCluster::load(&path).unwrap();
        let cached: Option<ClusterRole> = reopened.get(&ObjectKey::new(None, "reader"));
        assert_eq!(cached.map(|c| c.metadata.uid), Some(created.metadata.uid));
        assert_eq!(reopened.snapshot().unwrap().pods.len(), 1);
    }
}
