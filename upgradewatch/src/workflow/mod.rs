//! Workflow definition and execution.
//!
//! - [`WorkflowBuilder`] assembles and validates an ordered list of stages
//! - [`Sequencer`] runs a [`Workflow`] fail-fast and produces a report
//! - [`upgrade_workflow`] is the concrete cluster-upgrade pipeline

mod builder;
mod config;
mod sequencer;
mod upgrade;

pub use builder::{Workflow, WorkflowBuilder};
pub use config::{UpgradeTimings, UpgradeWorkflowConfig};
pub use sequencer::Sequencer;
pub use upgrade::{
    conditions, upgrade_workflow, IMAGE_KIND, IMAGE_NAME_PREFIX, MANAGED_CHART_KIND,
    UPGRADE_BINDING, UPGRADE_IMAGE_BINDING, UPGRADE_IMAGE_LABEL, UPGRADE_KIND,
    UPGRADE_NAME_PREFIX, UPGRADE_WORKFLOW, VERSION_BINDING, VERSION_KIND,
};
