//! Waiting on every member of a collection.

use async_trait::async_trait;
use tracing::info;

use super::{drive, PollConfig, PollReport, Probe, Verdict};
use crate::cancellation::CancellationToken;
use crate::core::CollectionRef;
use crate::errors::WatchError;
use crate::predicate::ConditionPredicate;
use crate::store::ObjectStore;

struct CollectionProbe<'a> {
    store: &'a dyn ObjectStore,
    collection: &'a CollectionRef,
    predicate: &'a ConditionPredicate,
    expected_count: usize,
}

#[async_trait]
impl Probe for CollectionProbe<'_> {
    async fn evaluate(&mut self, attempt: u32) -> Result<Verdict, WatchError> {
        let members = self
            .store
            .list(self.collection)
            .await
            .map_err(|e| WatchError::fetch(self.collection, e))?;

        let pending: Vec<&str> = members
            .iter()
            .filter(|m| !self.predicate.matches(*m))
            .map(|m| m.name.as_str())
            .collect();

        if pending.is_empty() && members.len() >= self.expected_count {
            info!(
                collection = %self.collection,
                condition = %self.predicate,
                members = members.len(),
                attempt,
                "All members satisfy condition"
            );
            return Ok(Verdict::Satisfied);
        }

        info!(
            collection = %self.collection,
            condition = %self.predicate,
            pending = ?pending,
            listed = members.len(),
            expected = self.expected_count,
            attempt,
            "Members not yet ready"
        );
        Ok(Verdict::Pending)
    }

    fn target(&self) -> String {
        self.collection.to_string()
    }

    fn predicate(&self) -> String {
        format!("{} on every member", self.predicate)
    }
}

/// Waits until every member of `collection` satisfies `predicate`.
///
/// The collection is re-listed on every evaluation. A tick succeeds only if
/// all listed members match on that listing and at least `expected_count`
/// members are listed, so a member disappearing mid-rollout does not count as
/// progress. There is no failure short-circuit: a member that never becomes
/// ready ends in a timeout.
///
/// # Errors
///
/// - [`WatchError::Fetch`] if a listing fails
/// - [`WatchError::Timeout`] if the collection is not ready before
///   `config.timeout`
/// - [`WatchError::Cancelled`] if `cancel` fires
pub async fn wait_for_all(
    store: &dyn ObjectStore,
    collection: &CollectionRef,
    predicate: &ConditionPredicate,
    expected_count: usize,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollReport, WatchError> {
    let mut probe = CollectionProbe {
        store,
        collection,
        predicate,
        expected_count,
    };
    drive(&mut probe, config, cancel).await
}
