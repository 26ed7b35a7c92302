//! Testing utilities for upgradewatch workflows.
//!
//! This module provides:
//! - A scripted object store that replays snapshots per fetch
//! - Stand-in stages for sequencer tests
//! - Object fixtures and a run harness
//! - Assertions over run reports

mod assertions;
mod fixtures;
mod stages;
mod store;

pub use assertions::{
    assert_run_failed_at, assert_run_succeeded, assert_stage_status, assert_stopped_at,
};
pub use fixtures::{managed_chart, ticks, with_status, TestRun, TICK};
pub use stages::{FailingStage, RecordingStage};
pub use store::ScriptedObjectStore;
