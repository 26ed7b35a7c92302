//! Stage trait and implementations.
//!
//! A stage is one step of a workflow: either a single mutation against the
//! store or a condition wait. Stages declare the bindings they read and write
//! so a workflow can be checked before it runs.

mod mutate;
mod wait;

pub use mutate::{MutateStage, ObjectBuilder};
pub use wait::{ObjectTarget, WaitAllStage, WaitOneStage};

use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Debug;

use crate::context::RunContext;
use crate::core::{ObjectRef, StageAction};
use crate::errors::WatchError;
use crate::poll::PollReport;

/// What a successful stage produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageOutcome {
    /// An object was created.
    Mutated {
        /// The created object.
        object: ObjectRef,
    },
    /// A wait succeeded.
    Waited {
        /// How long the wait took.
        report: PollReport,
    },
}

impl StageOutcome {
    /// The created object, for mutations.
    #[must_use]
    pub const fn object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Mutated { object } => Some(object),
            Self::Waited { .. } => None,
        }
    }

    /// Number of evaluations, for waits.
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::Mutated { .. } => None,
            Self::Waited { report } => Some(report.attempts),
        }
    }
}

/// Trait for workflow stages.
///
/// Stage definitions are immutable; all per-run state lives in the
/// [`RunContext`] handed to [`execute`](Self::execute).
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    /// Human-readable label, unique within a workflow.
    fn label(&self) -> &str;

    /// The kind of step this is.
    fn action(&self) -> StageAction;

    /// Bindings this stage reads. Each must be provided by an earlier stage.
    fn requires(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Binding this stage writes on success, if any.
    fn provides(&self) -> Option<&str> {
        None
    }

    /// Executes the stage.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The run context; its bindings reflect every earlier stage
    ///
    /// # Errors
    ///
    /// Any [`WatchError`]; the sequencer treats all of them as terminal.
    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError>;
}
