//! Stand-in stages for sequencer tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::context::RunContext;
use crate::core::{ObjectRef, StageAction};
use crate::errors::WatchError;
use crate::poll::PollReport;
use crate::stages::{Stage, StageOutcome};

/// A stage that succeeds, recording each call.
///
/// It can sleep on the runtime clock, read bindings and write one binding,
/// which is enough to exercise the sequencer without a store.
#[derive(Debug)]
pub struct RecordingStage {
    label: String,
    delay: Duration,
    reads: Vec<String>,
    provides: Option<(String, ObjectRef)>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ObjectRef>>,
}

impl RecordingStage {
    /// Creates a stage that succeeds immediately.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            delay: Duration::ZERO,
            reads: Vec::new(),
            provides: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Sleeps for `delay` before succeeding.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Reads binding `name` on every call.
    #[must_use]
    pub fn reading(mut self, name: impl Into<String>) -> Self {
        self.reads.push(name.into());
        self
    }

    /// Binds `value` under `name` on success.
    #[must_use]
    pub fn providing(mut self, name: impl Into<String>, value: ObjectRef) -> Self {
        self.provides = Some((name.into(), value));
        self
    }

    /// Number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Binding values read, in order.
    #[must_use]
    pub fn seen_bindings(&self) -> Vec<ObjectRef> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Stage for RecordingStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn action(&self) -> StageAction {
        if self.provides.is_some() {
            StageAction::Mutate
        } else {
            StageAction::WaitOne
        }
    }

    fn requires(&self) -> Vec<&str> {
        self.reads.iter().map(String::as_str).collect()
    }

    fn provides(&self) -> Option<&str> {
        self.provides.as_ref().map(|(name, _)| name.as_str())
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for name in &self.reads {
            let value = ctx.binding(name)?;
            self.seen.lock().push(value);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.provides {
            Some((name, value)) => {
                ctx.bind(name, value.clone())?;
                Ok(StageOutcome::Mutated { object: value.clone() })
            }
            None => Ok(StageOutcome::Waited {
                report: PollReport {
                    attempts: 1,
                    elapsed: self.delay,
                },
            }),
        }
    }
}

/// A stage that always fails with the error its closure builds.
pub struct FailingStage {
    label: String,
    error: Box<dyn Fn(&RunContext) -> WatchError + Send + Sync>,
    calls: AtomicUsize,
}

impl FailingStage {
    /// Creates a failing stage.
    pub fn new<F>(label: impl Into<String>, error: F) -> Self
    where
        F: Fn(&RunContext) -> WatchError + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            error: Box::new(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times the stage ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for FailingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailingStage")
            .field("label", &self.label)
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for FailingStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn action(&self) -> StageAction {
        StageAction::WaitOne
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.error)(&*ctx))
    }
}
