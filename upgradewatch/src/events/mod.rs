//! Workflow lifecycle events.
//!
//! The sequencer reports progress through the [`EventSink`] held by the run
//! context. Event names are the constants below.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Emitted once before the first stage runs.
pub const WORKFLOW_STARTED: &str = "workflow.started";
/// Emitted once after the run finishes, successfully or not.
pub const WORKFLOW_COMPLETED: &str = "workflow.completed";
/// Emitted when a stage moves to `Running`.
pub const STAGE_STARTED: &str = "stage.started";
/// Emitted when a stage moves to `Succeeded`.
pub const STAGE_SUCCEEDED: &str = "stage.succeeded";
/// Emitted when a stage moves to `Failed`.
pub const STAGE_FAILED: &str = "stage.failed";
