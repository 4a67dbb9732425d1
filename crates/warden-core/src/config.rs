//! warden.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::labels::{APP_LABEL, LAUNCHER_APP};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub install: InstallConfig,
    pub admission: AdmissionConfig,
    pub reconcile: ReconcileConfig,
    pub features: FeaturesConfig,
}

/// Fallbacks for installations that don't pin an image tag or registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    pub image_tag: String,
    pub image_registry: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            image_tag: "latest".to_string(),
            image_registry: "registry.local/warden".to_string(),
        }
    }
}

/// Node admission settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Label key selecting workload launcher pods.
    pub launcher_label_key: String,
    /// Label value selecting workload launcher pods.
    pub launcher_label_value: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            launcher_label_key: APP_LABEL.to_string(),
            launcher_label_value: LAUNCHER_APP.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Seconds between reconciliation passes.
    pub interval_secs: u64,
    /// Seconds after which an unobserved expectation is considered satisfied.
    pub expectation_ttl_secs: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            expectation_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// Whether the monitoring stack (and its role/binding) is deployed.
    pub service_monitor: bool,
}

impl WardenConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: WardenConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config: WardenConfig = toml::from_str("").unwrap();
        assert_eq!(config, WardenConfig::default());
        assert_eq!(config.admission.launcher_label_key, "warden.io");
        assert_eq!(config.reconcile.interval_secs, 30);
        assert!(!config.features.service_monitor);
    }

    #[test]
    fn test_parse_partial() {
        let toml_str = r#"
[install]
image_tag = "v1.4.0"

[features]
service_monitor = true
"#;
        let config: WardenConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.install.image_tag, "v1.4.0");
        assert_eq!(config.install.image_registry, "registry.local/warden");
        assert!(config.features.service_monitor);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = WardenConfig::default();
        config.reconcile.interval_secs = 5;
        let toml_str = config.to_toml_string().unwrap();
        let back: WardenConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back, config);
    }
}
