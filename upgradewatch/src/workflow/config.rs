//! Configuration for the cluster-upgrade workflow.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::errors::{ErrorInfo, WorkflowValidationError};
use crate::poll::PollConfig;

/// RFC 1123 label: namespaces.
#[allow(clippy::expect_used)]
static DNS1123_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").expect("valid regex"));

/// RFC 1123 subdomain: object names.
#[allow(clippy::expect_used)]
static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("valid regex")
});

const MAX_SUBDOMAIN_LEN: usize = 253;

/// Interval and timeout for every wait in the upgrade workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeTimings {
    /// All managed charts ready.
    pub managed_charts: PollConfig,
    /// Upgrade image imported.
    pub image_imported: PollConfig,
    /// Upgrade log collection ready.
    pub log_ready: PollConfig,
    /// Upgrade image ready on the cluster.
    pub image_ready: PollConfig,
    /// Package repository ready.
    pub repo_ready: PollConfig,
    /// Nodes prepared.
    pub nodes_prepared: PollConfig,
    /// System services upgraded.
    pub system_services_upgraded: PollConfig,
    /// Nodes upgraded.
    pub nodes_upgraded: PollConfig,
    /// Upgrade completed.
    pub completed: PollConfig,
}

impl Default for UpgradeTimings {
    fn default() -> Self {
        Self {
            managed_charts: PollConfig::from_secs(10, 5 * 60),
            image_imported: PollConfig::from_secs(10, 5 * 60),
            log_ready: PollConfig::from_secs(10, 5 * 60),
            image_ready: PollConfig::from_secs(10, 5 * 60),
            repo_ready: PollConfig::from_secs(10, 10 * 60),
            nodes_prepared: PollConfig::from_secs(30, 30 * 60),
            system_services_upgraded: PollConfig::from_secs(30, 30 * 60),
            nodes_upgraded: PollConfig::from_secs(30, 45 * 60),
            completed: PollConfig::from_secs(10, 3 * 60),
        }
    }
}

impl UpgradeTimings {
    /// Uses the same poll config for every wait. Handy in tests.
    #[must_use]
    pub const fn uniform(config: PollConfig) -> Self {
        Self {
            managed_charts: config,
            image_imported: config,
            log_ready: config,
            image_ready: config,
            repo_ready: config,
            nodes_prepared: config,
            system_services_upgraded: config,
            nodes_upgraded: config,
            completed: config,
        }
    }
}

/// Inputs for [`upgrade_workflow`](super::upgrade_workflow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeWorkflowConfig {
    /// Namespace holding the image, upgrade and version objects.
    pub namespace: String,
    /// Namespace holding the managed charts.
    pub managed_chart_namespace: String,
    /// Target version.
    pub version: String,
    /// Location of the upgrade ISO.
    pub iso_url: String,
    /// Whether to create the `Version` object first.
    pub create_version: bool,
    /// Display name of the upgrade image.
    pub image_display_name: String,
    /// Storage parameters for the upgrade image volume.
    pub storage_class_parameters: BTreeMap<String, String>,
    /// Whether the upgrade collects logs.
    pub log_enabled: bool,
    /// Wait timings.
    pub timings: UpgradeTimings,
}

impl Default for UpgradeWorkflowConfig {
    fn default() -> Self {
        Self {
            namespace: "harvester-system".to_string(),
            managed_chart_namespace: "fleet-local".to_string(),
            version: "v8.8.8".to_string(),
            iso_url: "http://10.10.0.1/harvester/harvester.iso".to_string(),
            create_version: false,
            image_display_name: "upgrade-iso".to_string(),
            storage_class_parameters: BTreeMap::from([
                ("mirroring".to_string(), "true".to_string()),
                ("numberOfReplicas".to_string(), "2".to_string()),
                ("staleReplicaTimeout".to_string(), "30".to_string()),
            ]),
            log_enabled: true,
            timings: UpgradeTimings::default(),
        }
    }
}

impl UpgradeWorkflowConfig {
    /// Creates a config with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the namespace for created objects.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the managed chart namespace.
    #[must_use]
    pub fn with_managed_chart_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.managed_chart_namespace = namespace.into();
        self
    }

    /// Sets the target version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the ISO location.
    #[must_use]
    pub fn with_iso_url(mut self, url: impl Into<String>) -> Self {
        self.iso_url = url.into();
        self
    }

    /// Creates the `Version` object before anything else.
    #[must_use]
    pub const fn with_create_version(mut self, create: bool) -> Self {
        self.create_version = create;
        self
    }

    /// Enables or disables upgrade log collection.
    #[must_use]
    pub const fn with_log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    /// Sets the wait timings.
    #[must_use]
    pub const fn with_timings(mut self, timings: UpgradeTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Checks names and locations before any stage runs.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowValidationError`] with a `CONFIG-*` code naming the
    /// offending field.
    pub fn validate(&self) -> Result<(), WorkflowValidationError> {
        check_label("namespace", &self.namespace)?;
        check_label("managed_chart_namespace", &self.managed_chart_namespace)?;

        if self.version.len() > MAX_SUBDOMAIN_LEN || !DNS1123_SUBDOMAIN.is_match(&self.version) {
            return Err(invalid(
                "CONFIG-INVALID_VERSION",
                "version",
                &self.version,
                "Versions name objects: lowercase letters, digits, '-' and '.' only.",
            ));
        }

        if !(self.iso_url.starts_with("http://") || self.iso_url.starts_with("https://")) {
            return Err(invalid(
                "CONFIG-INVALID_ISO_URL",
                "iso_url",
                &self.iso_url,
                "Provide an http:// or https:// URL the cluster can download from.",
            ));
        }

        Ok(())
    }
}

fn check_label(field: &str, value: &str) -> Result<(), WorkflowValidationError> {
    if DNS1123_LABEL.is_match(value) {
        Ok(())
    } else {
        Err(invalid(
            "CONFIG-INVALID_NAMESPACE",
            field,
            value,
            "Namespaces are DNS-1123 labels: at most 63 lowercase letters, digits and '-'.",
        ))
    }
}

fn invalid(code: &str, field: &str, value: &str, hint: &str) -> WorkflowValidationError {
    WorkflowValidationError::new(format!("Invalid {field} '{value}'")).with_error_info(
        ErrorInfo::new(code, format!("Field '{field}' is invalid"))
            .with_fix_hint(hint)
            .with_context_entry("field", field)
            .with_context_entry("value", value),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults_validate() {
        let config = UpgradeWorkflowConfig::default();
        tokio_test::assert_ok!(config.validate());
        assert_eq!(config.timings.nodes_upgraded.timeout, Duration::from_secs(45 * 60));
        assert_eq!(config.timings.completed.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_bad_namespace() {
        let err = UpgradeWorkflowConfig::new()
            .with_namespace("Harvester_System")
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-INVALID_NAMESPACE"));

        let long = "a".repeat(64);
        let err = UpgradeWorkflowConfig::new()
            .with_managed_chart_namespace(long)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-INVALID_NAMESPACE"));
    }

    #[test]
    fn test_bad_version_and_url() {
        let err = UpgradeWorkflowConfig::new().with_version("V1.2.0").validate().unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-INVALID_VERSION"));

        let err = UpgradeWorkflowConfig::new()
            .with_iso_url("ftp://10.10.0.1/harvester.iso")
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-INVALID_ISO_URL"));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: UpgradeWorkflowConfig = serde_json::from_value(serde_json::json!({
            "version": "v1.3.0",
            "timings": {
                "nodes_upgraded": {
                    "interval": { "secs": 60, "nanos": 0 },
                    "timeout": { "secs": 7200, "nanos": 0 }
                }
            }
        }))
        .unwrap();

        assert_eq!(config.version, "v1.3.0");
        assert_eq!(config.namespace, "harvester-system");
        assert_eq!(config.timings.nodes_upgraded, PollConfig::from_secs(60, 7200));
        assert_eq!(config.timings.repo_ready, PollConfig::from_secs(10, 600));
    }
}
