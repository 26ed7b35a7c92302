//! Test assertions for run reports.

use crate::core::{RunStatus, StageStatus};
use crate::errors::ErrorKind;
use crate::report::RunReport;

/// Asserts that every stage succeeded.
pub fn assert_run_succeeded(report: &RunReport) {
    assert_eq!(
        report.status,
        RunStatus::Succeeded,
        "Expected run to succeed, failed with: {:?}",
        report.failure
    );
}

/// Asserts that the run failed at `label` with an error of `kind`.
pub fn assert_run_failed_at(report: &RunReport, label: &str, kind: ErrorKind) {
    assert_eq!(report.status, RunStatus::Failed, "Expected run to fail, but it succeeded");
    let failure = report
        .failure
        .as_ref()
        .unwrap_or_else(|| panic!("Failed run has no failure entry"));
    assert_eq!(failure.label, label, "Run failed at an unexpected stage: {failure}");
    assert_eq!(failure.kind, kind, "Unexpected error kind: {failure}");
}

/// Asserts the status of the stage labelled `label`.
pub fn assert_stage_status(report: &RunReport, label: &str, expected: StageStatus) {
    let stage = report
        .stage(label)
        .unwrap_or_else(|| panic!("No stage labelled '{label}' in report"));
    assert_eq!(
        stage.status, expected,
        "Expected stage '{}' to be {:?}, got {:?}",
        label, expected, stage.status
    );
}

/// Asserts that stages `0..=index` are terminal and every later stage is
/// still pending.
pub fn assert_stopped_at(report: &RunReport, index: usize) {
    for stage in &report.stages {
        if stage.index <= index {
            assert!(
                stage.status.is_terminal(),
                "Expected stage {} '{}' to have run, got {:?}",
                stage.index,
                stage.label,
                stage.status
            );
        } else {
            assert!(
                stage.status.is_pending(),
                "Expected stage {} '{}' to be pending, got {:?}",
                stage.index,
                stage.label,
                stage.status
            );
        }
    }
}
