//! Fail-fast stage sequencer.

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, info_span, Instrument};

use super::Workflow;
use crate::context::RunContext;
use crate::core::{RunStatus, StageStatus};
use crate::errors::WatchError;
use crate::events::{
    STAGE_FAILED, STAGE_STARTED, STAGE_SUCCEEDED, WORKFLOW_COMPLETED, WORKFLOW_STARTED,
};
use crate::observability::StageTimer;
use crate::report::{RunReport, StageFailure, StageReport};

/// Runs a workflow's stages strictly in order.
///
/// The first stage error ends the run. Stages after it are never executed
/// and stay `Pending` in the report. A cancelled token is checked before each
/// stage starts, so a run cancelled between stages fails at the next one with
/// a cancellation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequencer;

impl Sequencer {
    /// Creates a new sequencer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Runs `workflow` against `ctx` and reports the outcome.
    ///
    /// Never returns an error: failures are recorded in the report.
    pub async fn run(&self, workflow: &Workflow, ctx: &mut RunContext) -> RunReport {
        let started_at = Utc::now();
        let run_timer = StageTimer::start();
        let run_id = ctx.run_id();

        let mut stages: Vec<StageReport> = workflow
            .stages()
            .iter()
            .enumerate()
            .map(|(index, stage)| StageReport::pending(index, stage.label(), stage.action()))
            .collect();
        let mut failure: Option<StageFailure> = None;

        info!(
            workflow = %workflow.name(),
            run_id = %run_id,
            stages = workflow.len(),
            "Workflow started"
        );
        ctx.events()
            .emit(
                WORKFLOW_STARTED,
                Some(json!({
                    "workflow": workflow.name(),
                    "run_id": run_id,
                    "stages": workflow.labels(),
                })),
            )
            .await;

        for (index, stage) in workflow.stages().iter().enumerate() {
            let label = stage.label();
            stages[index].status = StageStatus::Running;
            ctx.events()
                .emit(
                    STAGE_STARTED,
                    Some(json!({
                        "stage": label,
                        "index": index,
                        "action": stage.action(),
                    })),
                )
                .await;

            let timer = StageTimer::start();
            let result = if ctx.cancellation().is_cancelled() {
                Err(WatchError::cancelled(
                    ctx.cancellation().reason().unwrap_or_else(|| "cancelled".to_string()),
                ))
            } else {
                ctx.enter_stage(label);
                let span = info_span!("stage", label = %label, index);
                let result = stage.execute(ctx).instrument(span).await;
                ctx.leave_stage();
                result
            };
            let elapsed = timer.elapsed();

            match result {
                Ok(outcome) => {
                    stages[index].record_success(&outcome, elapsed);
                    info!(
                        stage = %label,
                        index,
                        elapsed_ms = timer.elapsed_ms(),
                        "Stage succeeded"
                    );
                    ctx.events()
                        .emit(
                            STAGE_SUCCEEDED,
                            Some(json!({
                                "stage": label,
                                "index": index,
                                "elapsed_ms": timer.elapsed_ms(),
                                "outcome": outcome,
                            })),
                        )
                        .await;
                }
                Err(err) => {
                    stages[index].record_failure(&err, elapsed);
                    error!(
                        stage = %label,
                        index,
                        kind = %err.kind(),
                        elapsed_ms = timer.elapsed_ms(),
                        error = %err,
                        "Stage failed"
                    );
                    ctx.events()
                        .emit(
                            STAGE_FAILED,
                            Some(json!({
                                "stage": label,
                                "index": index,
                                "kind": err.kind(),
                                "error": err.to_string(),
                                "elapsed_ms": timer.elapsed_ms(),
                            })),
                        )
                        .await;
                    failure = Some(StageFailure {
                        index,
                        label: label.to_string(),
                        elapsed,
                        kind: err.kind(),
                        error: err.to_string(),
                    });
                    break;
                }
            }
        }

        let status = if failure.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        info!(
            workflow = %workflow.name(),
            run_id = %run_id,
            status = %status,
            elapsed_ms = run_timer.elapsed_ms(),
            "Workflow finished"
        );
        ctx.events()
            .emit(
                WORKFLOW_COMPLETED,
                Some(json!({
                    "workflow": workflow.name(),
                    "run_id": run_id,
                    "status": status,
                    "failed_stage": failure.as_ref().map(|f| f.label.clone()),
                })),
            )
            .await;

        RunReport {
            run_id,
            workflow: workflow.name().to_string(),
            status,
            stages,
            failure,
            started_at,
            finished_at: Utc::now(),
            elapsed: run_timer.elapsed(),
        }
    }
}
