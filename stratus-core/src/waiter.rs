//! Waiter - Poll a resource until it reaches a target state
//!
//! Cloud APIs are eventually consistent: a create or delete call returns
//! before the resource settles. A [`StateChangeConf`] describes which status
//! strings mean "still working" (pending) and which mean "done" (target),
//! and [`StateChangeConf::wait_for_state`] polls a refresh function with
//! exponential backoff until one of them is final.

use std::future::Future;
use std::time::Duration;

use crate::provider::{ProviderError, ProviderErrorKind, ProviderResult};

/// Upper bound for the exponential backoff between refreshes
const MAX_BACKOFF: Duration = Duration::from_secs(10);
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const DEFAULT_NOT_FOUND_CHECKS: usize = 20;
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Error returned by [`StateChangeConf::wait_for_state`]
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})",
        expected.join(", ")
    )]
    Timeout {
        last_state: String,
        expected: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", expected.join(", "))]
    UnexpectedState {
        state: String,
        expected: Vec<String>,
    },

    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: usize },

    #[error(transparent)]
    Refresh(ProviderError),
}

impl From<WaitError> for ProviderError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Refresh(inner) => inner,
            other => {
                let kind = match other {
                    WaitError::Timeout { .. } => ProviderErrorKind::Timeout,
                    WaitError::UnexpectedState { .. } => ProviderErrorKind::UnexpectedState,
                    _ => ProviderErrorKind::NotFound,
                };
                ProviderError::new(other.to_string()).with_kind(kind)
            }
        }
    }
}

/// Operation timeouts for one resource type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            create: timeout,
            update: timeout,
            delete: timeout,
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::uniform(DEFAULT_OPERATION_TIMEOUT)
    }
}

/// Description of a state transition to wait for
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// States that mean the operation is still in progress
    pub pending: Vec<String>,
    /// States that mean the operation finished; empty means "wait until gone"
    pub target: Vec<String>,
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// Smallest wait between refreshes
    pub min_timeout: Duration,
    /// Fixed wait between refreshes, replacing the backoff
    pub poll_interval: Option<Duration>,
    /// Consecutive "not found" refreshes tolerated while waiting for a target
    pub not_found_checks: usize,
    /// Consecutive target observations required
    pub continuous_target_occurence: usize,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: None,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurence: 1,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn with_not_found_checks(mut self, checks: usize) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn with_continuous_target_occurence(mut self, occurences: usize) -> Self {
        self.continuous_target_occurence = occurences.max(1);
        self
    }

    /// Poll `refresh` until the resource reaches a target state.
    ///
    /// `refresh` returns `Ok(None)` when the resource does not exist, or the
    /// current object with its status string. With an empty `target`, a missing
    /// resource ends the wait successfully with `None`.
    pub async fn wait_for_state<T, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Option<(T, String)>>>,
    {
        let mut last_state = String::new();
        let polled = self.poll(&mut refresh, &mut last_state);
        match tokio::time::timeout(self.timeout, polled).await {
            Ok(result) => result,
            Err(_) => Err(WaitError::Timeout {
                last_state,
                expected: self.target.clone(),
                timeout: self.timeout,
            }),
        }
    }

    async fn poll<T, F, Fut>(
        &self,
        refresh: &mut F,
        last_state: &mut String,
    ) -> Result<Option<T>, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<Option<(T, String)>>>,
    {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut wait = INITIAL_BACKOFF;
        let mut target_occurence = 0;
        let mut not_found_tick = 0;

        loop {
            match refresh().await.map_err(WaitError::Refresh)? {
                None => {
                    if self.target.is_empty() {
                        target_occurence += 1;
                        if target_occurence >= self.continuous_target_occurence {
                            return Ok(None);
                        }
                    } else {
                        target_occurence = 0;
                        not_found_tick += 1;
                        log::debug!(
                            "resource not found while waiting for '{}' ({}/{})",
                            self.target.join(", "),
                            not_found_tick,
                            self.not_found_checks
                        );
                        if not_found_tick > self.not_found_checks {
                            return Err(WaitError::NotFound {
                                checks: self.not_found_checks,
                            });
                        }
                    }
                }
                Some((value, state)) => {
                    not_found_tick = 0;
                    log::debug!(
                        "waiting for '{}', current state '{}'",
                        self.target.join(", "),
                        state
                    );

                    if self.target.contains(&state) {
                        target_occurence += 1;
                        if target_occurence >= self.continuous_target_occurence {
                            return Ok(Some(value));
                        }
                    } else if self.pending.contains(&state) || self.pending.is_empty() {
                        target_occurence = 0;
                    } else {
                        return Err(WaitError::UnexpectedState {
                            state,
                            expected: self.target.clone(),
                        });
                    }
                    *last_state = state;
                }
            }

            // Re-check quickly while waiting for a target state to reoccur
            if target_occurence == 0 {
                wait *= 2;
            }
            wait = match self.poll_interval {
                Some(interval) => interval,
                None if wait < self.min_timeout => self.min_timeout,
                None => wait.min(MAX_BACKOFF),
            };
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn script(
        states: Vec<Option<&'static str>>,
    ) -> impl FnMut() -> std::future::Ready<ProviderResult<Option<(u32, String)>>> {
        let mut states = states.into_iter();
        let mut calls = 0;
        move || {
            calls += 1;
            let next = states.next().flatten().map(|s| (calls, s.to_string()));
            std::future::ready(Ok(next))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_pending() {
        let conf = StateChangeConf::new(&["CREATING"], &["RUNNING"], Duration::from_secs(60));
        let result = conf
            .wait_for_state(script(vec![
                Some("CREATING"),
                Some("CREATING"),
                Some("RUNNING"),
            ]))
            .await
            .unwrap();
        assert_eq!(result, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails_immediately() {
        let conf = StateChangeConf::new(&["CREATING"], &["RUNNING"], Duration::from_secs(60));
        let err = conf
            .wait_for_state(script(vec![Some("CREATING"), Some("CREATE_FAILED")]))
            .await
            .unwrap_err();
        match err {
            WaitError::UnexpectedState { state, expected } => {
                assert_eq!(state, "CREATE_FAILED");
                assert_eq!(expected, vec!["RUNNING".to_string()]);
            }
            other => panic!("expected UnexpectedState, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn empty_target_treats_not_found_as_deleted() {
        let conf = StateChangeConf::new(&["DELETING"], &[], Duration::from_secs(60));
        let result = conf
            .wait_for_state(script(vec![Some("DELETING"), None]))
            .await
            .unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_exhausts_checks() {
        let conf = StateChangeConf::new(&["CREATING"], &["RUNNING"], Duration::from_secs(3600))
            .with_not_found_checks(2);
        let err = conf
            .wait_for_state(script(vec![None, None, None, Some("RUNNING")]))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_last_state() {
        let conf = StateChangeConf::new(&["UPDATING"], &["RUNNING"], Duration::from_secs(30));
        let err = conf
            .wait_for_state(|| std::future::ready(Ok(Some(((), "UPDATING".to_string())))))
            .await
            .unwrap_err();
        match err {
            WaitError::Timeout { last_state, .. } => assert_eq!(last_state, "UPDATING"),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_error_is_returned() {
        let conf = StateChangeConf::new(&["CREATING"], &["RUNNING"], Duration::from_secs(30));
        let err = conf
            .wait_for_state(|| {
                std::future::ready(Err::<Option<((), String)>, _>(ProviderError::api(
                    "throttled",
                )))
            })
            .await
            .unwrap_err();
        let err: ProviderError = err.into();
        assert_eq!(err.kind, ProviderErrorKind::Api);
        assert_eq!(err.message, "throttled");
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_target_requires_repeated_observations() {
        let conf = StateChangeConf::new(&["PENDING"], &["ACTIVE"], Duration::from_secs(60))
            .with_continuous_target_occurence(2);
        let result = conf
            .wait_for_state(script(vec![
                Some("ACTIVE"),
                Some("PENDING"),
                Some("ACTIVE"),
                Some("ACTIVE"),
            ]))
            .await
            .unwrap();
        assert_eq!(result, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn poll_interval_replaces_backoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let conf = StateChangeConf::new(&["PENDING"], &["DONE"], Duration::from_secs(35))
            .with_poll_interval(Duration::from_secs(10));
        let start = tokio::time::Instant::now();
        let _ = conf
            .wait_for_state(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                std::future::ready(Ok(Some(((), "PENDING".to_string()))))
            })
            .await;
        // Refreshes at 0s, 10s, 20s and 30s before the 35s timeout
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_secs(35));
    }

    #[test]
    fn timeout_converts_to_provider_error() {
        let err: ProviderError = WaitError::Timeout {
            last_state: "CREATING".to_string(),
            expected: vec!["RUNNING".to_string()],
            timeout: Duration::from_secs(1),
        }
        .into();
        assert_eq!(err.kind, ProviderErrorKind::Timeout);
        assert!(err.message.contains("last state: 'CREATING'"));
    }
}
