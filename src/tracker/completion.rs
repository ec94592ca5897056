//! Aggregate completion signal for a [`MatchTracker`](super::MatchTracker)
//!
//! The handle counts settlements on a `tokio::sync::watch` channel. A waiter
//! subscribes, checks the current count and only then parks, all under the
//! channel's lock, so a waiter arriving after the last settlement still sees it.

use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::watch;

const UNRESOLVED: u8 = 0;
const RESOLVED: u8 = 1;
const TIMED_OUT: u8 = 2;

/// Observable state of a completion handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// Some slots are still pending and nobody has given up waiting
    Unresolved,
    /// Every slot has settled (terminal)
    Resolved,
    /// A bounded wait elapsed before every slot settled
    ///
    /// Not terminal: if the remaining slots settle later the handle moves to
    /// `Resolved`.
    TimedOut,
}

impl CompletionState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            RESOLVED => Self::Resolved,
            TIMED_OUT => Self::TimedOut,
            _ => Self::Unresolved,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Resolved => "resolved",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Completion handle owned by a tracker
///
/// Observers borrow it through [`MatchTracker::completion`](super::MatchTracker::completion);
/// it lives exactly as long as its tracker.
#[derive(Debug)]
pub struct CompletionHandle {
    expected: usize,
    state: AtomicU8,
    progress: watch::Sender<usize>,
}

impl CompletionHandle {
    pub(crate) fn new(expected: usize) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            expected,
            state: AtomicU8::new(UNRESOLVED),
            progress,
        }
    }

    /// Number of slots that must settle
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Settlements observed so far
    pub fn settled(&self) -> usize {
        *self.progress.borrow()
    }

    pub fn state(&self) -> CompletionState {
        CompletionState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_resolved(&self) -> bool {
        self.state() == CompletionState::Resolved
    }

    /// Signal that one more slot settled
    ///
    /// Called exactly once per slot transition by the tracker.
    pub(crate) fn record_settlement(&self) {
        let mut reached = false;
        let expected = self.expected;
        self.progress.send_modify(|count| {
            *count += 1;
            reached = *count >= expected;
        });
        if reached {
            self.resolve();
        }
    }

    /// Move to `Resolved`; returns true only for the call that made the transition
    pub(crate) fn resolve(&self) -> bool {
        let transitioned = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != RESOLVED).then_some(RESOLVED)
            })
            .is_ok();

        if transitioned {
            tracing::info!(
                expected = self.expected,
                "All expected patterns settled, completion resolved"
            );
        }
        transitioned
    }

    fn mark_timed_out(&self) {
        // A concurrent resolve wins
        let _ = self.state.compare_exchange(
            UNRESOLVED,
            TIMED_OUT,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Wait until every slot settled or `timeout` elapses
    ///
    /// Returns `Ok(true)` when resolved, `Ok(false)` on timeout. Producers are
    /// never blocked by a waiter.
    pub async fn wait(&self, timeout: Duration) -> AppResult<bool> {
        let mut progress = self.progress.subscribe();
        let expected = self.expected;
        let outcome = tokio::time::timeout(timeout, async move {
            progress
                .wait_for(|count| *count >= expected)
                .await
                .map(|_| ())
        })
        .await;

        match outcome {
            Ok(Ok(())) => {
                self.resolve();
                Ok(true)
            }
            Ok(Err(_)) => Err(AppError::Internal(
                "completion signal closed while waiting".to_string(),
            )),
            Err(_) => {
                self.mark_timed_out();
                Ok(false)
            }
        }
    }
}
