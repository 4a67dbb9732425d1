//! Version tags on managed objects.
//!
//! Every object the operator writes is stamped with the install strategy
//! that produced it (`imageTag`, `imageRegistry`, install ID) plus the
//! installation generation. The stamp is what tells a later pass whether
//! the object is current, stale, or a backup.

use sha2::{Digest, Sha256};
use warden_cluster::{Installation, ObjectMeta, Resource};
use warden_core::config::InstallConfig;
use warden_core::{
    EPHEMERAL_BACKUP_ANNOTATION, GENERATION_ANNOTATION, INSTALL_STRATEGY_IDENTIFIER_ANNOTATION,
    INSTALL_STRATEGY_REGISTRY_ANNOTATION, INSTALL_STRATEGY_VERSION_ANNOTATION, MANAGED_BY_LABEL,
    MANAGED_BY_OPERATOR,
};

use crate::error::{RbacError, RbacResult};

const INSTALL_ID_LEN: usize = 16;

/// `(imageTag, imageRegistry, installID)` of an install strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionTag {
    pub image_tag: String,
    pub image_registry: String,
    pub install_id: String,
}

impl VersionTag {
    pub fn new(image_tag: &str, image_registry: &str, install_id: &str) -> Self {
        Self {
            image_tag: image_tag.to_string(),
            image_registry: image_registry.to_string(),
            install_id: install_id.to_string(),
        }
    }

    /// Derive the tag for an installation.
    ///
    /// Tag and registry fall back to `defaults` when the installation does
    /// not pin them. The install ID is the leading hex of the SHA-256 of
    /// the installation spec, so any spec change yields a new version.
    pub fn for_installation(installation: &Installation, defaults: &InstallConfig) -> RbacResult<Self> {
        let spec = serde_json::to_vec(&installation.spec)
            .map_err(|e| RbacError::Encode(e.to_string()))?;
        let digest = hex::encode(Sha256::digest(&spec));

        Ok(Self {
            image_tag: installation
                .spec
                .image_tag
                .clone()
                .unwrap_or_else(|| defaults.image_tag.clone()),
            image_registry: installation
                .spec
                .image_registry
                .clone()
                .unwrap_or_else(|| defaults.image_registry.clone()),
            install_id: digest[..INSTALL_ID_LEN].to_string(),
        })
    }

    /// Read the tag an object was stamped with. `None` unless all three
    /// annotations are present.
    pub fn from_meta(meta: &ObjectMeta) -> Option<Self> {
        Some(Self {
            image_tag: meta.annotation(INSTALL_STRATEGY_VERSION_ANNOTATION)?.to_string(),
            image_registry: meta.annotation(INSTALL_STRATEGY_REGISTRY_ANNOTATION)?.to_string(),
            install_id: meta.annotation(INSTALL_STRATEGY_IDENTIFIER_ANNOTATION)?.to_string(),
        })
    }

    fn stamp(&self, meta: &mut ObjectMeta) {
        meta.annotations.insert(
            INSTALL_STRATEGY_VERSION_ANNOTATION.to_string(),
            self.image_tag.clone(),
        );
        meta.annotations.insert(
            INSTALL_STRATEGY_REGISTRY_ANNOTATION.to_string(),
            self.image_registry.clone(),
        );
        meta.annotations.insert(
            INSTALL_STRATEGY_IDENTIFIER_ANNOTATION.to_string(),
            self.install_id.clone(),
        );
    }
}

/// Stamp `meta` as an operator-owned object of `tag` at `generation`.
///
/// Clears the backup marker; only [`make_backup`] sets it.
pub fn inject_operator_metadata(meta: &mut ObjectMeta, tag: &VersionTag, generation: i64) {
    meta.labels
        .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_OPERATOR.to_string());
    tag.stamp(meta);
    meta.annotations
        .insert(GENERATION_ANNOTATION.to_string(), generation.to_string());
    meta.annotations.remove(EPHEMERAL_BACKUP_ANNOTATION);
}

/// True if `meta` carries exactly `tag` and `generation`.
pub fn object_matches_version(meta: &ObjectMeta, tag: &VersionTag, generation: i64) -> bool {
    VersionTag::from_meta(meta).as_ref() == Some(tag)
        && meta.annotation(GENERATION_ANNOTATION) == Some(generation.to_string().as_str())
}

/// UID of the original object if `meta` belongs to an ephemeral backup.
pub fn backup_source(meta: &ObjectMeta) -> Option<&str> {
    meta.annotation(EPHEMERAL_BACKUP_ANNOTATION)
}

/// Build a backup of `original` under a server-generated name.
///
/// The copy keeps the original's content and version tag, drops its
/// identity, and records the original's UID. Returns `None` if the
/// original carries no complete version tag.
pub fn make_backup<R: Resource>(original: &R) -> Option<R> {
    let source = original.metadata();
    let previous = VersionTag::from_meta(source)?;

    let mut backup = original.clone();
    let meta = backup.metadata_mut();
    *meta = ObjectMeta {
        generate_name: source.name.clone(),
        namespace: source.namespace.clone(),
        ..Default::default()
    };
    meta.labels
        .insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_OPERATOR.to_string());
    previous.stamp(meta);
    if let Some(generation) = source.annotation(GENERATION_ANNOTATION) {
        meta.annotations
            .insert(GENERATION_ANNOTATION.to_string(), generation.to_string());
    }
    meta.annotations
        .insert(EPHEMERAL_BACKUP_ANNOTATION.to_string(), source.uid.clone());
    Some(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_cluster::{ClusterRole, InstallationSpec, PolicyRule};

    fn tag(version: &str) -> VersionTag {
        VersionTag::new(version, "registry.local/warden", "0123456789abcdef")
    }

    #[test]
    fn stamp_then_match() {
        let mut meta = ObjectMeta::named("warden-controller");
        meta.annotations
            .insert(EPHEMERAL_BACKUP_ANNOTATION.to_string(), "stale".to_string());

        inject_operator_metadata(&mut meta, &tag("v1"), 3);

        assert!(object_matches_version(&meta, &tag("v1"), 3));
        assert!(!object_matches_version(&meta, &tag("v1"), 4));
        assert!(!object_matches_version(&meta, &tag("v2"), 3));
        assert!(backup_source(&meta).is_none());
        assert!(warden_core::is_managed_by_operator(&meta.labels));
    }

    #[test]
    fn partial_tag_is_not_a_tag() {
        let mut meta = ObjectMeta::named("x");
        meta.annotations.insert(
            INSTALL_STRATEGY_VERSION_ANNOTATION.to_string(),
            "v1".to_string(),
        );
        assert!(VersionTag::from_meta(&meta).is_none());
        assert!(!object_matches_version(&meta, &tag("v1"), 1));
    }

    #[test]
    fn install_id_tracks_spec() {
        let defaults = InstallConfig::default();
        let mut inst = Installation::default();
        let a = VersionTag::for_installation(&inst, &defaults).unwrap();
        let again = VersionTag::for_installation(&inst, &defaults).unwrap();
        assert_eq!(a, again);
        assert_eq!(a.install_id.len(), 16);
        assert_eq!(a.image_tag, "latest");

        inst.spec = InstallationSpec {
            image_tag: Some("v1.2.0".to_string()),
            ..Default::default()
        };
        let b = VersionTag::for_installation(&inst, &defaults).unwrap();
        assert_eq!(b.image_tag, "v1.2.0");
        assert_eq!(b.image_registry, defaults.image_registry);
        assert_ne!(a.install_id, b.install_id);
    }

    #[test]
    fn backup_keeps_content_and_previous_tag() {
        let mut original = ClusterRole {
            metadata: ObjectMeta::named("warden-controller"),
            rules: vec![PolicyRule::new("", &["pods"], &["get", "list"])],
        };
        inject_operator_metadata(&mut original.metadata, &tag("v1"), 2);
        original.metadata.uid = "uid-1".to_string();
        original.metadata.resource_version = "7".to_string();

        let backup = make_backup(&original).unwrap();
        let meta = &backup.metadata;

        assert!(meta.name.is_empty());
        assert_eq!(meta.generate_name, "warden-controller");
        assert!(meta.uid.is_empty());
        assert!(meta.resource_version.is_empty());
        assert_eq!(backup_source(meta), Some("uid-1"));
        assert_eq!(VersionTag::from_meta(meta), Some(tag("v1")));
        assert_eq!(meta.annotation(GENERATION_ANNOTATION), Some("2"));
        assert_eq!(backup.rules, original.rules);
    }

    #[test]
    fn untagged_object_has_no_backup() {
        let role = ClusterRole {
            metadata: ObjectMeta::named("foreign"),
            rules: vec![],
        };
        assert!(make_backup(&role).is_none());
    }
}
