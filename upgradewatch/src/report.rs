//! Run reports.
//!
//! A [`RunReport`] is the sequencer's single output. It lists every stage of
//! the workflow, including the ones that never ran, and names the stage that
//! stopped the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::core::{ObjectRef, RunStatus, StageAction, StageStatus};
use crate::errors::{ErrorKind, WatchError};
use crate::stages::StageOutcome;

/// Per-stage entry in a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    /// Position in the workflow.
    pub index: usize,
    /// Stage label.
    pub label: String,
    /// Stage action.
    pub action: StageAction,
    /// Final status.
    pub status: StageStatus,
    /// Time spent executing. `None` if the stage never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<Duration>,
    /// Evaluations performed, for waits that succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Object created, for mutations that succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectRef>,
    /// Error text, for the failed stage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageReport {
    /// Creates a pending entry.
    #[must_use]
    pub fn pending(index: usize, label: impl Into<String>, action: StageAction) -> Self {
        Self {
            index,
            label: label.into(),
            action,
            status: StageStatus::Pending,
            elapsed: None,
            attempts: None,
            object: None,
            error: None,
        }
    }

    pub(crate) fn record_success(&mut self, outcome: &StageOutcome, elapsed: Duration) {
        self.status = StageStatus::Succeeded;
        self.elapsed = Some(elapsed);
        self.attempts = outcome.attempts();
        self.object = outcome.object().cloned();
    }

    pub(crate) fn record_failure(&mut self, error: &WatchError, elapsed: Duration) {
        self.status = StageStatus::Failed;
        self.elapsed = Some(elapsed);
        self.error = Some(error.to_string());
    }
}

/// The stage that ended a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    /// Position in the workflow.
    pub index: usize,
    /// Stage label.
    pub label: String,
    /// Time spent in the stage before it failed.
    pub elapsed: Duration,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error text.
    pub error: String,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage {} '{}' failed after {:.1}s ({}): {}",
            self.index,
            self.label,
            self.elapsed.as_secs_f64(),
            self.kind,
            self.error
        )
    }
}

/// Outcome of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Workflow name.
    pub workflow: String,
    /// Overall status.
    pub status: RunStatus,
    /// Every stage, in workflow order.
    pub stages: Vec<StageReport>,
    /// The stage that ended the run, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
    /// Wall-clock end.
    pub finished_at: DateTime<Utc>,
    /// Run duration on the runtime clock.
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns true if every stage succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Finds a stage entry by label.
    #[must_use]
    pub fn stage(&self, label: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.label == label)
    }

    /// Statuses in workflow order.
    #[must_use]
    pub fn statuses(&self) -> Vec<StageStatus> {
        self.stages.iter().map(|s| s.status).collect()
    }

    /// Number of stages that reached a terminal status.
    #[must_use]
    pub fn executed(&self) -> usize {
        self.stages.iter().filter(|s| s.status.is_terminal()).count()
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "workflow '{}' {} in {:.1}s (run {})",
            self.workflow,
            self.status,
            self.elapsed.as_secs_f64(),
            self.run_id
        )?;
        for stage in &self.stages {
            write!(f, "  [{:>2}] {:<10} {}", stage.index, stage.status.to_string(), stage.label)?;
            if let Some(elapsed) = stage.elapsed {
                write!(f, " ({:.1}s)", elapsed.as_secs_f64())?;
            }
            writeln!(f)?;
        }
        if let Some(failure) = &self.failure {
            writeln!(f, "{failure}")?;
        }
        Ok(())
    }
}
