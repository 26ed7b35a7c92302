//! Object fixtures and a run harness.

use std::sync::Arc;
use std::time::Duration;

use crate::context::RunContext;
use crate::core::{Condition, TrackedObject};
use crate::events::CollectingEventSink;
use crate::report::RunReport;
use crate::store::ObjectStore;
use crate::workflow::{Sequencer, Workflow};

/// One poll tick in scenario tests.
pub const TICK: Duration = Duration::from_secs(1);

/// `n` ticks.
#[must_use]
pub fn ticks(n: u32) -> Duration {
    TICK * n
}

/// A snapshot reporting `condition` as true or false.
#[must_use]
pub fn with_status(object: TrackedObject, condition: &str, status: bool) -> TrackedObject {
    let condition = if status {
        Condition::truthy(condition)
    } else {
        Condition::falsy(condition)
    };
    object.with_condition(condition)
}

/// A managed chart with its `Ready` condition.
#[must_use]
pub fn managed_chart(namespace: &str, name: &str, ready: bool) -> TrackedObject {
    with_status(TrackedObject::new("ManagedChart", namespace, name), "Ready", ready)
}

/// Runs workflows against one store and records their events.
pub struct TestRun {
    store: Arc<dyn ObjectStore>,
    events: Arc<CollectingEventSink>,
}

impl TestRun {
    /// Creates a harness over `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            events: Arc::new(CollectingEventSink::new()),
        }
    }

    /// The events emitted so far.
    #[must_use]
    pub fn events(&self) -> &CollectingEventSink {
        &self.events
    }

    /// A fresh context over the store, emitting into this harness.
    #[must_use]
    pub fn context(&self) -> RunContext {
        RunContext::new(self.store.clone()).with_event_sink(self.events.clone())
    }

    /// Runs `workflow` in a fresh context and returns the report and context.
    pub async fn run(&self, workflow: &Workflow) -> (RunReport, RunContext) {
        let mut ctx = self.context();
        let report = Sequencer::new().run(workflow, &mut ctx).await;
        (report, ctx)
    }
}

impl std::fmt::Debug for TestRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRun")
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}
