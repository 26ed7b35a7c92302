//! Waiting on one object's conditions.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{drive, PollConfig, PollReport, Probe, Verdict};
use crate::cancellation::CancellationToken;
use crate::core::ObjectRef;
use crate::errors::WatchError;
use crate::predicate::ConditionPredicate;
use crate::store::ObjectStore;

struct ObjectProbe<'a> {
    store: &'a dyn ObjectStore,
    target: &'a ObjectRef,
    success: &'a ConditionPredicate,
    failure: Option<&'a ConditionPredicate>,
}

#[async_trait]
impl Probe for ObjectProbe<'_> {
    async fn evaluate(&mut self, attempt: u32) -> Result<Verdict, WatchError> {
        let object = self
            .store
            .get(self.target)
            .await
            .map_err(|e| WatchError::fetch(self.target, e))?;

        if let Some(failure) = self.failure {
            if failure.matches(&object) {
                let detail = failure.detail(&object);
                warn!(
                    target_object = %self.target,
                    condition = %failure,
                    detail = %detail,
                    attempt,
                    "Failure condition observed"
                );
                return Err(WatchError::PredicateFailure {
                    target: self.target.to_string(),
                    condition: failure.to_string(),
                    detail,
                });
            }
        }

        if self.success.matches(&object) {
            info!(
                target_object = %self.target,
                condition = %self.success,
                attempt,
                "Condition satisfied"
            );
            return Ok(Verdict::Satisfied);
        }

        debug!(
            target_object = %self.target,
            condition = %self.success,
            observed = %self.success.detail(&object),
            attempt,
            "Condition not yet satisfied"
        );
        Ok(Verdict::Pending)
    }

    fn target(&self) -> String {
        self.target.to_string()
    }

    fn predicate(&self) -> String {
        self.success.to_string()
    }
}

/// Waits until `target` satisfies `success`.
///
/// The object is re-fetched on every evaluation. When `failure` is given it is
/// checked first, so an object reporting both ends the wait as a failure.
///
/// # Errors
///
/// - [`WatchError::Fetch`] if the object cannot be read, including when it
///   does not exist
/// - [`WatchError::PredicateFailure`] if `failure` holds
/// - [`WatchError::Timeout`] if neither holds before `config.timeout`
/// - [`WatchError::Cancelled`] if `cancel` fires
pub async fn wait_for(
    store: &dyn ObjectStore,
    target: &ObjectRef,
    success: &ConditionPredicate,
    failure: Option<&ConditionPredicate>,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollReport, WatchError> {
    let mut probe = ObjectProbe {
        store,
        target,
        success,
        failure,
    };
    drive(&mut probe, config, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Condition, TrackedObject};
    use crate::errors::{ErrorKind, StoreError};
    use crate::store::MockObjectStore;
    use crate::testing::ScriptedObjectStore;
    use std::time::Duration;

    fn upgrade_ref() -> ObjectRef {
        ObjectRef::new("Upgrade", "harvester-system", "hvst-upgrade-7xk2p")
    }

    fn upgrade() -> TrackedObject {
        TrackedObject::new("Upgrade", "harvester-system", "hvst-upgrade-7xk2p")
    }

    #[tokio::test(start_paused = true)]
    async fn test_satisfied_on_first_fetch() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![upgrade().with_condition(Condition::truthy("LogReady"))]);

        let report = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("LogReady"),
            None,
            &PollConfig::from_secs(10, 300),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(report.elapsed, Duration::ZERO);
        assert_eq!(store.get_calls(&upgrade_ref()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_timeout_still_evaluates() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![upgrade().with_condition(Condition::truthy("LogReady"))]);

        let report = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("LogReady"),
            None,
            &PollConfig::new(Duration::from_secs(10), Duration::MAX),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(store.get_calls(&upgrade_ref()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_condition_keeps_waiting() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![
            upgrade(),
            upgrade(),
            upgrade().with_condition(Condition::truthy("ImageReady")),
        ]);

        let report = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("ImageReady"),
            Some(&ConditionPredicate::is_false("Completed")),
            &PollConfig::from_secs(10, 300),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.elapsed, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_predicate_wins_before_deadline() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![
            upgrade().with_condition(Condition::falsy("RepoReady")),
            upgrade().with_condition(
                Condition::falsy("Completed")
                    .with_reason("Failed")
                    .with_message("repo vm failed to boot"),
            ),
        ]);

        let err = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("RepoReady"),
            Some(&ConditionPredicate::is_false("Completed")),
            &PollConfig::from_secs(10, 600),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            WatchError::PredicateFailure { condition, detail, .. } => {
                assert_eq!(condition, "Completed=false");
                assert_eq!(detail, "Failed: repo vm failed to boot");
            }
            other => panic!("expected predicate failure, got {other:?}"),
        }
        assert_eq!(store.get_calls(&upgrade_ref()), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_checked_before_success() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![upgrade()
            .with_condition(Condition::truthy("NodesUpgraded"))
            .with_condition(Condition::falsy("Completed"))]);

        let err = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("NodesUpgraded"),
            Some(&ConditionPredicate::is_false("Completed")),
            &PollConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PredicateFailure);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_deadline() {
        let store = ScriptedObjectStore::new();
        store.script_object(vec![upgrade().with_condition(Condition::falsy("Completed"))]);

        let err = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("Completed"),
            None,
            &PollConfig::from_secs(10, 180),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            WatchError::Timeout { waited, attempts, target, .. } => {
                assert_eq!(waited, Duration::from_secs(180));
                assert_eq!(attempts, 19);
                assert_eq!(target, "Upgrade harvester-system/hvst-upgrade-7xk2p");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_object_is_fetch_error() {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|target| Err(StoreError::NotFound(target.clone())));

        let err = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("LogReady"),
            None,
            &PollConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_ends_wait() {
        let mut store = MockObjectStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Err(StoreError::Backend(anyhow::anyhow!("connection refused"))));

        let err = wait_for(
            &store,
            &upgrade_ref(),
            &ConditionPredicate::is_true("LogReady"),
            None,
            &PollConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fetch);
    }
}
