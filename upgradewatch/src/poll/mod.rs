//! Condition polling.
//!
//! Both pollers share one loop, modelled as an explicit state machine:
//!
//! ```text
//! Evaluate --pending--> Sleep(min(interval, deadline - now)) --> Evaluate
//!     |                     |
//!     +--satisfied/error--> Done <--cancelled--+
//! ```
//!
//! The first evaluation happens immediately. After a pending evaluation at or
//! past the deadline the wait ends with [`WatchError::Timeout`]. The token is
//! checked before every evaluation and raced against every sleep.

mod config;
mod list;
mod single;

pub use config::{PollConfig, MIN_INTERVAL};
pub use list::wait_for_all;
pub use single::wait_for;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::cancellation::CancellationToken;
use crate::errors::WatchError;
use crate::observability::StageTimer;

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Number of evaluations performed, including the successful one.
    pub attempts: u32,
    /// Time from the first evaluation to success.
    pub elapsed: Duration,
}

/// Result of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Satisfied,
    Pending,
}

/// One fresh observation of the remote state per call.
#[async_trait]
pub(crate) trait Probe: Send {
    /// Fetches and evaluates. Errors end the wait.
    async fn evaluate(&mut self, attempt: u32) -> Result<Verdict, WatchError>;

    /// What is being watched, for errors and logs.
    fn target(&self) -> String;

    /// The success condition, for errors and logs.
    fn predicate(&self) -> String;
}

enum PollState {
    Evaluate,
    Sleep(Duration),
    Done(Result<PollReport, WatchError>),
}

fn cancelled(cancel: &CancellationToken) -> WatchError {
    WatchError::cancelled(cancel.reason().unwrap_or_else(|| "cancelled".to_string()))
}

/// Runs `probe` until it is satisfied, fails, times out, or is cancelled.
pub(crate) async fn drive<P: Probe>(
    probe: &mut P,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<PollReport, WatchError> {
    let timer = StageTimer::start();
    // A timeout past the clock's range waits without a deadline.
    let deadline = timer.started().checked_add(config.timeout);
    let interval = config.effective_interval();
    let mut attempts: u32 = 0;
    let mut state = PollState::Evaluate;

    loop {
        state = match state {
            PollState::Evaluate => {
                if cancel.is_cancelled() {
                    PollState::Done(Err(cancelled(cancel)))
                } else {
                    attempts += 1;
                    match probe.evaluate(attempts).await {
                        Ok(Verdict::Satisfied) => PollState::Done(Ok(PollReport {
                            attempts,
                            elapsed: timer.elapsed(),
                        })),
                        Ok(Verdict::Pending) => match deadline {
                            Some(deadline) if Instant::now() >= deadline => {
                                PollState::Done(Err(WatchError::Timeout {
                                    target: probe.target(),
                                    predicate: probe.predicate(),
                                    waited: timer.elapsed(),
                                    attempts,
                                }))
                            }
                            Some(deadline) => PollState::Sleep(
                                interval.min(deadline.saturating_duration_since(Instant::now())),
                            ),
                            None => PollState::Sleep(interval),
                        },
                        Err(err) => PollState::Done(Err(err)),
                    }
                }
            }
            PollState::Sleep(delay) => {
                debug!(
                    target_object = %probe.target(),
                    attempt = attempts,
                    delay_ms = delay.as_millis(),
                    "Waiting before next evaluation"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => PollState::Done(Err(cancelled(cancel))),
                    () = tokio::time::sleep(delay) => PollState::Evaluate,
                }
            }
            PollState::Done(result) => return result,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::sync::Arc;

    /// Becomes satisfied on the given attempt, or never.
    struct CountingProbe {
        satisfied_on: Option<u32>,
        calls: u32,
    }

    impl CountingProbe {
        fn new(satisfied_on: Option<u32>) -> Self {
            Self {
                satisfied_on,
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn evaluate(&mut self, attempt: u32) -> Result<Verdict, WatchError> {
            self.calls += 1;
            assert_eq!(attempt, self.calls);
            if self.satisfied_on == Some(attempt) {
                Ok(Verdict::Satisfied)
            } else {
                Ok(Verdict::Pending)
            }
        }

        fn target(&self) -> String {
            "Upgrade harvester-system/hvst-upgrade-test".to_string()
        }

        fn predicate(&self) -> String {
            "Completed=true".to_string()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_evaluation_is_immediate() {
        let mut probe = CountingProbe::new(Some(1));
        let report = drive(&mut probe, &PollConfig::from_secs(10, 60), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            report,
            PollReport {
                attempts: 1,
                elapsed: Duration::ZERO,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_later_tick() {
        let mut probe = CountingProbe::new(Some(4));
        let report = drive(&mut probe, &PollConfig::from_secs(10, 60), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.attempts, 4);
        assert_eq!(report.elapsed, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_attempts() {
        let config = PollConfig::from_secs(10, 25);
        let mut probe = CountingProbe::new(None);
        let err = drive(&mut probe, &config, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            WatchError::Timeout { waited, attempts, ref predicate, .. } => {
                // Evaluations at 0s, 10s, 20s and the clamped 25s.
                assert_eq!(attempts, 4);
                assert_eq!(attempts, config.max_attempts());
                assert_eq!(waited, Duration::from_secs(25));
                assert_eq!(predicate, "Completed=true");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_timeout_keeps_polling() {
        let config = PollConfig::new(Duration::from_secs(10), Duration::MAX);

        let mut probe = CountingProbe::new(Some(1));
        let report = drive(&mut probe, &config, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.attempts, 1);

        let mut probe = CountingProbe::new(Some(3));
        let report = drive(&mut probe, &config, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            report,
            PollReport {
                attempts: 3,
                elapsed: Duration::from_secs(20),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_evaluates_once() {
        let mut probe = CountingProbe::new(None);
        let err = drive(&mut probe, &PollConfig::from_secs(10, 0), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(probe.calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_evaluation() {
        let cancel = CancellationToken::new();
        cancel.cancel("operator abort");
        let mut probe = CountingProbe::new(Some(1));
        let err = drive(&mut probe, &PollConfig::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cancelled: operator abort");
        assert_eq!(probe.calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let cancel = Arc::new(CancellationToken::new());
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(15)).await;
                cancel.cancel("shutdown");
            })
        };

        let timer = StageTimer::start();
        let mut probe = CountingProbe::new(None);
        let err = drive(&mut probe, &PollConfig::from_secs(10, 300), &cancel)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        // Evaluated at 0s and 10s, then woken mid-sleep at 15s.
        assert_eq!(probe.calls, 2);
        assert_eq!(timer.elapsed(), Duration::from_secs(15));
    }
}
