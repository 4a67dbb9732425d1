//! Well-known labels and annotations shared across Warden crates.

use std::collections::BTreeMap;

/// Label set of a cluster object.
///
/// Ordered so that equality is structural and iteration is deterministic.
pub type Labels = BTreeMap<String, String>;

/// Annotation map of a cluster object.
pub type Annotations = BTreeMap<String, String>;

/// Label marking objects owned by the operator.
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on operator-owned objects.
pub const MANAGED_BY_OPERATOR: &str = "warden-operator";

/// Image tag of the install strategy that produced an object.
pub const INSTALL_STRATEGY_VERSION_ANNOTATION: &str = "warden.io/install-strategy-version";

/// Image registry of the install strategy that produced an object.
pub const INSTALL_STRATEGY_REGISTRY_ANNOTATION: &str = "warden.io/install-strategy-registry";

/// Install ID of the install strategy that produced an object.
pub const INSTALL_STRATEGY_IDENTIFIER_ANNOTATION: &str = "warden.io/install-strategy-identifier";

/// Generation of the installation an object was last stamped against.
pub const GENERATION_ANNOTATION: &str = "warden.io/generation";

/// Present on ephemeral backups; the value is the UID of the original object.
pub const EPHEMERAL_BACKUP_ANNOTATION: &str = "warden.io/ephemeral-backup-object";

/// Default label key identifying workload launcher pods.
pub const APP_LABEL: &str = "warden.io";

/// Default [`APP_LABEL`] value of workload launcher pods.
pub const LAUNCHER_APP: &str = "launcher";

/// Name of the monitoring service account and its role/binding.
pub const MONITOR_SERVICE_ACCOUNT_NAME: &str = "warden-prometheus";

/// Build a [`Labels`] map from string pairs.
pub fn labels<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Labels {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// True if the label set marks the object as operator-owned.
pub fn is_managed_by_operator(labels: &Labels) -> bool {
    labels
        .get(MANAGED_BY_LABEL)
        .is_some_and(|v| v == MANAGED_BY_OPERATOR)
}
