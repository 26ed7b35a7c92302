//! Condition-wait stages.

use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info};

use super::{Stage, StageOutcome};
use crate::context::RunContext;
use crate::core::{CollectionRef, ObjectRef, StageAction};
use crate::errors::WatchError;
use crate::poll::{wait_for, wait_for_all, PollConfig};
use crate::predicate::ConditionPredicate;

/// The object a [`WaitOneStage`] watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectTarget {
    /// A reference known when the workflow is defined.
    Fixed(ObjectRef),
    /// A reference written by an earlier stage.
    Bound(String),
}

impl ObjectTarget {
    /// Targets the object bound under `name`.
    #[must_use]
    pub fn bound(name: impl Into<String>) -> Self {
        Self::Bound(name.into())
    }

    fn resolve(&self, ctx: &RunContext) -> Result<ObjectRef, WatchError> {
        match self {
            Self::Fixed(target) => Ok(target.clone()),
            Self::Bound(name) => ctx.binding(name),
        }
    }
}

impl From<ObjectRef> for ObjectTarget {
    fn from(target: ObjectRef) -> Self {
        Self::Fixed(target)
    }
}

impl fmt::Display for ObjectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(target) => write!(f, "{target}"),
            Self::Bound(name) => write!(f, "<{name}>"),
        }
    }
}

/// Waits for one object to satisfy a condition.
#[derive(Debug, Clone)]
pub struct WaitOneStage {
    label: String,
    target: ObjectTarget,
    success: ConditionPredicate,
    failure: Option<ConditionPredicate>,
    config: PollConfig,
}

impl WaitOneStage {
    /// Creates a wait with the default poll config and no failure condition.
    pub fn new(
        label: impl Into<String>,
        target: impl Into<ObjectTarget>,
        success: ConditionPredicate,
    ) -> Self {
        Self {
            label: label.into(),
            target: target.into(),
            success,
            failure: None,
            config: PollConfig::default(),
        }
    }

    /// Ends the wait early when `failure` holds.
    #[must_use]
    pub fn with_failure(mut self, failure: ConditionPredicate) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Sets the poll config.
    #[must_use]
    pub const fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the poll config.
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }
}

#[async_trait]
impl Stage for WaitOneStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn action(&self) -> StageAction {
        StageAction::WaitOne
    }

    fn requires(&self) -> Vec<&str> {
        match &self.target {
            ObjectTarget::Bound(name) => vec![name.as_str()],
            ObjectTarget::Fixed(_) => Vec::new(),
        }
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError> {
        let target = self.target.resolve(ctx)?;
        info!(
            target_object = %target,
            condition = %self.success,
            interval_s = self.config.interval.as_secs_f64(),
            timeout_s = self.config.timeout.as_secs_f64(),
            "Waiting for condition"
        );

        let report = wait_for(
            ctx.store(),
            &target,
            &self.success,
            self.failure.as_ref(),
            &self.config,
            ctx.cancellation(),
        )
        .await?;
        Ok(StageOutcome::Waited { report })
    }
}

/// Waits for every member of a collection to satisfy a condition.
#[derive(Debug, Clone)]
pub struct WaitAllStage {
    label: String,
    collection: CollectionRef,
    predicate: ConditionPredicate,
    expected_count: Option<usize>,
    config: PollConfig,
}

impl WaitAllStage {
    /// Creates a wait whose expected member count is captured at stage start.
    pub fn new(
        label: impl Into<String>,
        collection: CollectionRef,
        predicate: ConditionPredicate,
    ) -> Self {
        Self {
            label: label.into(),
            collection,
            predicate,
            expected_count: None,
            config: PollConfig::default(),
        }
    }

    /// Uses a fixed expected member count instead of capturing one.
    #[must_use]
    pub const fn with_expected_count(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }

    /// Sets the poll config.
    #[must_use]
    pub const fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the poll config.
    #[must_use]
    pub const fn config(&self) -> &PollConfig {
        &self.config
    }
}

#[async_trait]
impl Stage for WaitAllStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn action(&self) -> StageAction {
        StageAction::WaitAll
    }

    async fn execute(&self, ctx: &mut RunContext) -> Result<StageOutcome, WatchError> {
        let expected = match self.expected_count {
            Some(count) => count,
            None => ctx
                .store()
                .list(&self.collection)
                .await
                .map_err(|e| WatchError::fetch(&self.collection, e))?
                .len(),
        };
        info!(
            collection = %self.collection,
            condition = %self.predicate,
            expected,
            "Waiting for all members"
        );
        debug!(
            collection = %self.collection,
            "Collection waits have no failure condition; a stuck member ends in timeout"
        );

        let report = wait_for_all(
            ctx.store(),
            &self.collection,
            &self.predicate,
            expected,
            &self.config,
            ctx.cancellation(),
        )
        .await?;
        Ok(StageOutcome::Waited { report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Condition, TrackedObject};
    use crate::errors::ErrorKind;
    use crate::store::InMemoryObjectStore;
    use crate::testing::ScriptedObjectStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_wait_one_resolves_binding() {
        let store = Arc::new(InMemoryObjectStore::new());
        let image =
            TrackedObject::new("VirtualMachineImage", "harvester-system", "upgrade-image-m4n7p")
                .with_condition(Condition::truthy("Imported"));
        store.upsert(image.clone());

        let mut ctx = RunContext::new(store);
        ctx.bind("upgrade-image", image.object_ref()).unwrap();

        let stage = WaitOneStage::new(
            "wait upgrade image imported",
            ObjectTarget::bound("upgrade-image"),
            ConditionPredicate::is_true("Imported"),
        );
        assert_eq!(stage.requires(), vec!["upgrade-image"]);

        let outcome = tokio_test::assert_ok!(stage.execute(&mut ctx).await);
        assert_eq!(outcome.attempts(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_one_unbound_target() {
        let mut ctx = RunContext::new(Arc::new(InMemoryObjectStore::new()));
        let stage = WaitOneStage::new(
            "wait log",
            ObjectTarget::bound("upgrade"),
            ConditionPredicate::is_true("LogReady"),
        );
        ctx.enter_stage(stage.label());

        let err = tokio_test::assert_err!(stage.execute(&mut ctx).await);
        assert_eq!(err.kind(), ErrorKind::ContractViolation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_all_captures_count_at_start() {
        let charts = CollectionRef::new("ManagedChart", "fleet-local");
        let chart = |name: &str, ready: bool| {
            let c = if ready { Condition::truthy("Ready") } else { Condition::falsy("Ready") };
            TrackedObject::new("ManagedChart", "fleet-local", name).with_condition(c)
        };

        let store = Arc::new(ScriptedObjectStore::new());
        store.script_collection(
            &charts,
            vec![
                // Captured at stage start.
                vec![chart("harvester", false), chart("harvester-crd", false)],
                // One member vanished and the rest look ready: not done.
                vec![chart("harvester", true)],
                vec![chart("harvester", true), chart("harvester-crd", true)],
            ],
        );

        let mut ctx = RunContext::new(store.clone());
        let stage = WaitAllStage::new(
            "wait managed charts",
            charts.clone(),
            ConditionPredicate::is_true("Ready"),
        )
        .with_config(PollConfig::from_secs(10, 300));

        let outcome = stage.execute(&mut ctx).await.unwrap();
        assert_eq!(
            outcome,
            StageOutcome::Waited {
                report: crate::poll::PollReport {
                    attempts: 2,
                    elapsed: Duration::from_secs(10),
                },
            }
        );
        assert_eq!(store.list_calls(&charts), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_all_explicit_count_skips_capture() {
        let charts = CollectionRef::new("ManagedChart", "fleet-local");
        let store = Arc::new(ScriptedObjectStore::new());
        store.script_collection(
            &charts,
            vec![vec![TrackedObject::new("ManagedChart", "fleet-local", "harvester")
                .with_condition(Condition::truthy("Ready"))]],
        );

        let mut ctx = RunContext::new(store.clone());
        let stage = WaitAllStage::new(
            "wait managed charts",
            charts.clone(),
            ConditionPredicate::is_true("Ready"),
        )
        .with_expected_count(1);

        stage.execute(&mut ctx).await.unwrap();
        assert_eq!(store.list_calls(&charts), 1);
    }
}
