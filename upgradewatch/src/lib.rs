//! # Upgradewatch
//!
//! Condition polling and staged orchestration for cluster-upgrade
//! end-to-end checks.
//!
//! A workflow is an ordered list of stages. Each stage either creates one
//! object or waits for objects to report a condition, and the run stops at
//! the first stage that fails:
//!
//! - **Pollers**: [`poll::wait_for`] and [`poll::wait_for_all`] re-fetch on a
//!   fixed interval until a condition holds, a failure condition holds, or a
//!   deadline passes
//! - **Stages**: [`stages::MutateStage`], [`stages::WaitOneStage`] and
//!   [`stages::WaitAllStage`]
//! - **Workflows**: [`workflow::WorkflowBuilder`] validates stage bindings up
//!   front, [`workflow::Sequencer`] runs them fail-fast
//! - **Store boundary**: every read and create goes through
//!   [`store::ObjectStore`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use upgradewatch::prelude::*;
//!
//! let workflow = upgrade_workflow(&UpgradeWorkflowConfig::default())?;
//! let mut ctx = RunContext::new(store).with_event_sink(Arc::new(LoggingEventSink::default()));
//! let report = Sequencer::new().run(&workflow, &mut ctx).await;
//! println!("{report}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cancellation;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod poll;
pub mod predicate;
pub mod report;
pub mod stages;
pub mod store;
pub mod testing;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{Bindings, RunContext};
    pub use crate::core::{
        CollectionRef, Condition, ConditionStatus, HasConditions, ObjectRef, RunStatus,
        StageAction, StageStatus, TrackedObject,
    };
    pub use crate::errors::{
        BindingConflictError, ContractViolationError, ErrorKind, StoreError, WatchError,
        WorkflowValidationError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_logging, LogFormat, StageTimer};
    pub use crate::poll::{wait_for, wait_for_all, PollConfig, PollReport};
    pub use crate::predicate::ConditionPredicate;
    pub use crate::report::{RunReport, StageFailure, StageReport};
    pub use crate::stages::{
        MutateStage, ObjectTarget, Stage, StageOutcome, WaitAllStage, WaitOneStage,
    };
    pub use crate::store::{InMemoryObjectStore, ObjectStore};
    pub use crate::workflow::{
        upgrade_workflow, Sequencer, UpgradeTimings, UpgradeWorkflowConfig, Workflow,
        WorkflowBuilder,
    };
}
