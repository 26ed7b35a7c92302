//! The context threaded through every stage of a run.

use std::sync::Arc;
use uuid::Uuid;

use super::Bindings;
use crate::cancellation::CancellationToken;
use crate::core::ObjectRef;
use crate::errors::WatchError;
use crate::events::{EventSink, NoOpEventSink};
use crate::store::ObjectStore;

/// Run-scoped state: identity, services and bindings.
///
/// Stages receive `&mut RunContext` one at a time, in workflow order. The
/// sequencer records which stage is current so binding errors can name it.
pub struct RunContext {
    run_id: Uuid,
    store: Arc<dyn ObjectStore>,
    cancellation: Arc<CancellationToken>,
    events: Arc<dyn EventSink>,
    bindings: Bindings,
    current_stage: Option<String>,
}

impl RunContext {
    /// Creates a context over `store` with a fresh run id, a fresh token and
    /// no event sink.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            store,
            cancellation: Arc::new(CancellationToken::new()),
            events: Arc::new(NoOpEventSink),
            bindings: Bindings::new(),
            current_stage: None,
        }
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the run id.
    #[must_use]
    pub const fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Returns the run id.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the object store.
    #[must_use]
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the event sink.
    #[must_use]
    pub fn events(&self) -> &dyn EventSink {
        self.events.as_ref()
    }

    /// Returns the bindings written so far.
    #[must_use]
    pub const fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Returns the label of the stage currently executing.
    #[must_use]
    pub fn current_stage(&self) -> Option<&str> {
        self.current_stage.as_deref()
    }

    /// Marks `label` as the executing stage.
    pub(crate) fn enter_stage(&mut self, label: &str) {
        self.current_stage = Some(label.to_string());
    }

    /// Clears the executing stage.
    pub(crate) fn leave_stage(&mut self) {
        self.current_stage = None;
    }

    /// Reads a binding on behalf of the current stage.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ContractViolation`] if no earlier stage wrote it.
    pub fn binding(&self, name: &str) -> Result<ObjectRef, WatchError> {
        let stage = self.current_stage.as_deref().unwrap_or("<outside stage>");
        Ok(self.bindings.require(stage, name)?.clone())
    }

    /// Writes a binding on behalf of the current stage.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::BindingConflict`] if the name is already bound.
    pub fn bind(&mut self, name: &str, value: ObjectRef) -> Result<(), WatchError> {
        self.bindings.bind(name, value)?;
        Ok(())
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("cancellation", &self.cancellation)
            .field("bindings", &self.bindings)
            .field("current_stage", &self.current_stage)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::store::InMemoryObjectStore;

    fn ctx() -> RunContext {
        RunContext::new(Arc::new(InMemoryObjectStore::new()))
    }

    #[test]
    fn test_binding_round_trip_through_context() {
        let mut ctx = ctx();
        ctx.enter_stage("create an upgrade image");
        let img = ObjectRef::new("VirtualMachineImage", "harvester-system", "upgrade-image-b4k2z");
        ctx.bind("upgrade-image", img.clone()).unwrap();
        ctx.leave_stage();

        ctx.enter_stage("create an upgrade");
        assert_eq!(ctx.binding("upgrade-image").unwrap(), img);
        assert_eq!(ctx.current_stage(), Some("create an upgrade"));
    }

    #[test]
    fn test_unset_binding_names_current_stage() {
        let mut ctx = ctx();
        ctx.enter_stage("wait log");
        let err = ctx.binding("upgrade").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
        assert!(err.to_string().contains("stage 'wait log'"));
    }

    #[test]
    fn test_double_bind_is_conflict() {
        let mut ctx = ctx();
        let u = ObjectRef::new("Upgrade", "harvester-system", "hvst-upgrade-1");
        ctx.bind("upgrade", u.clone()).unwrap();
        let err = ctx.bind("upgrade", u).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BindingConflict);
    }

    #[test]
    fn test_run_ids_are_time_ordered() {
        let first = ctx().run_id();
        let second = ctx().run_id();
        assert_eq!(first.get_version_num(), 7);
        assert_ne!(first, second);
        assert!(first < second);
    }

    #[test]
    fn test_shared_cancellation_token() {
        let token = Arc::new(CancellationToken::new());
        let ctx = ctx().with_cancellation(token.clone());
        token.cancel("ctrl-c");
        assert!(ctx.cancellation().is_cancelled());
    }
}
