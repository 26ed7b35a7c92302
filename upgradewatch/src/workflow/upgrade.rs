//! The cluster-upgrade end-to-end workflow.
//!
//! Creates an upgrade image and an upgrade, then follows the upgrade through
//! each of its phases. Every wait on the upgrade also watches for
//! `Completed=false`, which the controller sets when the upgrade fails.

use serde_json::json;

use super::{UpgradeWorkflowConfig, Workflow, WorkflowBuilder};
use crate::core::{CollectionRef, TrackedObject};
use crate::errors::WorkflowValidationError;
use crate::poll::PollConfig;
use crate::predicate::ConditionPredicate;
use crate::stages::{MutateStage, ObjectTarget, WaitAllStage, WaitOneStage};

/// Workflow name.
pub const UPGRADE_WORKFLOW: &str = "upgrade";

/// Binding for the created upgrade image.
pub const UPGRADE_IMAGE_BINDING: &str = "upgrade-image";
/// Binding for the created upgrade.
pub const UPGRADE_BINDING: &str = "upgrade";
/// Binding for the created version.
pub const VERSION_BINDING: &str = "version";

/// Kind of the version object.
pub const VERSION_KIND: &str = "Version";
/// Kind of the upgrade image.
pub const IMAGE_KIND: &str = "VirtualMachineImage";
/// Kind of the upgrade.
pub const UPGRADE_KIND: &str = "Upgrade";
/// Kind of the charts that must be ready first.
pub const MANAGED_CHART_KIND: &str = "ManagedChart";

/// Generated-name prefix of the upgrade image.
pub const IMAGE_NAME_PREFIX: &str = "upgrade-image-";
/// Generated-name prefix of the upgrade.
pub const UPGRADE_NAME_PREFIX: &str = "hvst-upgrade-";
/// Label marking the upgrade image.
pub const UPGRADE_IMAGE_LABEL: &str = "harvesterhci.io/upgrade";

/// Condition types reported by the upgrade controller.
pub mod conditions {
    /// Managed chart is ready.
    pub const READY: &str = "Ready";
    /// Image download finished.
    pub const IMPORTED: &str = "Imported";
    /// Log collection is running.
    pub const LOG_READY: &str = "LogReady";
    /// Upgrade image is ready on the cluster.
    pub const IMAGE_READY: &str = "ImageReady";
    /// Package repository is serving.
    pub const REPO_READY: &str = "RepoReady";
    /// Every node has been prepared.
    pub const NODES_PREPARED: &str = "NodesPrepared";
    /// Cluster services have been upgraded.
    pub const SYSTEM_SERVICES_UPGRADED: &str = "SystemServicesUpgraded";
    /// Every node has been upgraded.
    pub const NODES_UPGRADED: &str = "NodesUpgraded";
    /// Upgrade finished. `False` means it failed.
    pub const COMPLETED: &str = "Completed";
}

fn upgrade_wait(label: &str, condition: &str, config: PollConfig) -> WaitOneStage {
    WaitOneStage::new(
        label,
        ObjectTarget::bound(UPGRADE_BINDING),
        ConditionPredicate::is_true(condition),
    )
    .with_failure(ConditionPredicate::is_false(conditions::COMPLETED))
    .with_config(config)
}

/// Builds the upgrade workflow.
///
/// | stage | waits on | interval | timeout |
/// |-------|----------|----------|---------|
/// | `create version` (optional) | | | |
/// | `wait managed charts` | every `ManagedChart` `Ready` | 10s | 5m |
/// | `create an upgrade image` | | | |
/// | `wait upgrade image imported` | image `Imported` | 10s | 5m |
/// | `create an upgrade` | | | |
/// | `wait log` | `LogReady` | 10s | 5m |
/// | `wait image` | `ImageReady` | 10s | 5m |
/// | `wait repo` | `RepoReady` | 10s | 10m |
/// | `wait node prepared` | `NodesPrepared` | 30s | 30m |
/// | `wait system services upgraded` | `SystemServicesUpgraded` | 30s | 30m |
/// | `wait nodes upgraded` | `NodesUpgraded` | 30s | 45m |
/// | `wait upgrade complete` | `Completed` | 10s | 3m |
///
/// Timings are the defaults of [`UpgradeTimings`](super::UpgradeTimings).
///
/// # Errors
///
/// Returns an error if `config` fails [`UpgradeWorkflowConfig::validate`].
pub fn upgrade_workflow(
    config: &UpgradeWorkflowConfig,
) -> Result<Workflow, WorkflowValidationError> {
    config.validate()?;
    let timings = &config.timings;
    let namespace = config.namespace.clone();
    let mut builder = WorkflowBuilder::new(UPGRADE_WORKFLOW);

    if config.create_version {
        builder = builder.stage(
            MutateStage::from_template(
                "create version",
                TrackedObject::new(VERSION_KIND, &namespace, &config.version)
                    .with_spec(json!({ "isoURL": config.iso_url })),
            )
            .binds(VERSION_BINDING),
        )?;
    }

    let image = TrackedObject::generated(IMAGE_KIND, &namespace, IMAGE_NAME_PREFIX)
        .with_label(UPGRADE_IMAGE_LABEL, "true")
        .with_spec(json!({
            "displayName": config.image_display_name,
            "url": config.iso_url,
            "sourceType": "download",
            "storageClassParameters": config.storage_class_parameters,
        }));

    let version = config.version.clone();
    let log_enabled = config.log_enabled;
    let upgrade_namespace = namespace.clone();
    let create_upgrade = MutateStage::new("create an upgrade", move |ctx| {
        let image = ctx.binding(UPGRADE_IMAGE_BINDING)?;
        Ok(
            TrackedObject::generated(UPGRADE_KIND, &upgrade_namespace, UPGRADE_NAME_PREFIX)
                .with_spec(json!({
                    "version": version,
                    "image": image.namespaced_name(),
                    "logEnabled": log_enabled,
                })),
        )
    })
    .reads(UPGRADE_IMAGE_BINDING)
    .binds(UPGRADE_BINDING);

    builder
        .stage(
            WaitAllStage::new(
                "wait managed charts",
                CollectionRef::new(MANAGED_CHART_KIND, &config.managed_chart_namespace),
                ConditionPredicate::is_true(conditions::READY),
            )
            .with_config(timings.managed_charts),
        )?
        .stage(
            MutateStage::from_template("create an upgrade image", image)
                .binds(UPGRADE_IMAGE_BINDING),
        )?
        .stage(
            WaitOneStage::new(
                "wait upgrade image imported",
                ObjectTarget::bound(UPGRADE_IMAGE_BINDING),
                ConditionPredicate::is_true(conditions::IMPORTED),
            )
            .with_config(timings.image_imported),
        )?
        .stage(create_upgrade)?
        .stage(upgrade_wait("wait log", conditions::LOG_READY, timings.log_ready))?
        .stage(upgrade_wait("wait image", conditions::IMAGE_READY, timings.image_ready))?
        .stage(upgrade_wait("wait repo", conditions::REPO_READY, timings.repo_ready))?
        .stage(upgrade_wait(
            "wait node prepared",
            conditions::NODES_PREPARED,
            timings.nodes_prepared,
        ))?
        .stage(upgrade_wait(
            "wait system services upgraded",
            conditions::SYSTEM_SERVICES_UPGRADED,
            timings.system_services_upgraded,
        ))?
        .stage(upgrade_wait(
            "wait nodes upgraded",
            conditions::NODES_UPGRADED,
            timings.nodes_upgraded,
        ))?
        .stage(upgrade_wait("wait upgrade complete", conditions::COMPLETED, timings.completed))?
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StageAction;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_order() {
        let workflow = upgrade_workflow(&UpgradeWorkflowConfig::default()).unwrap();
        assert_eq!(
            workflow.labels(),
            vec![
                "wait managed charts",
                "create an upgrade image",
                "wait upgrade image imported",
                "create an upgrade",
                "wait log",
                "wait image",
                "wait repo",
                "wait node prepared",
                "wait system services upgraded",
                "wait nodes upgraded",
                "wait upgrade complete",
            ]
        );
        let actions: Vec<StageAction> = workflow.stages().iter().map(|s| s.action()).collect();
        assert_eq!(actions[0], StageAction::WaitAll);
        assert_eq!(actions[1], StageAction::Mutate);
        assert_eq!(actions[3], StageAction::Mutate);
        assert!(actions[4..].iter().all(|a| *a == StageAction::WaitOne));
    }

    #[test]
    fn test_create_version_is_first() {
        let workflow =
            upgrade_workflow(&UpgradeWorkflowConfig::new().with_create_version(true)).unwrap();
        assert_eq!(workflow.len(), 12);
        assert_eq!(workflow.labels()[0], "create version");
        assert_eq!(workflow.stages()[0].provides(), Some(VERSION_BINDING));
    }

    #[test]
    fn test_upgrade_waits_require_upgrade_binding() {
        let workflow = upgrade_workflow(&UpgradeWorkflowConfig::default()).unwrap();
        for stage in &workflow.stages()[4..] {
            assert_eq!(stage.requires(), vec![UPGRADE_BINDING], "{}", stage.label());
        }
        assert_eq!(workflow.stages()[3].requires(), vec![UPGRADE_IMAGE_BINDING]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = upgrade_workflow(&UpgradeWorkflowConfig::new().with_namespace("")).unwrap_err();
        assert_eq!(err.code(), Some("CONFIG-INVALID_NAMESPACE"));
    }
}
