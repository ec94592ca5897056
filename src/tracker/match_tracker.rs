//! Per-pattern settlement tracking
//!
//! Each pattern owns a slot with its own `AtomicBool`. Recording a name walks the
//! slots and compare-and-sets the matching pending ones, so concurrent producers
//! only contend on the slots they actually settle.

use super::completion::{CompletionHandle, CompletionState};
use super::pattern::{MatchKind, Pattern};
use super::pattern_set::PatternSet;
use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug)]
struct Slot {
    pattern: Pattern,
    settled: AtomicBool,
    /// First notification name that settled this slot
    settled_by: OnceLock<String>,
}

impl Slot {
    fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            settled: AtomicBool::new(false),
            settled_by: OnceLock::new(),
        }
    }

    fn is_settled(&self) -> bool {
        self.settled.load(Ordering::Acquire)
    }

    /// Pending → Settled; true only for the caller that won the transition
    fn try_settle(&self, name: &str) -> bool {
        if self
            .settled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let _ = self.settled_by.set(name.to_string());
            true
        } else {
            false
        }
    }
}

/// Tracks which expected patterns have been seen at least once
///
/// The pattern set is fixed at construction. All methods take `&self` and are
/// safe to call from any number of threads.
#[derive(Debug)]
pub struct MatchTracker {
    slots: Box<[Slot]>,
    settled: AtomicUsize,
    completion: CompletionHandle,
}

impl MatchTracker {
    pub fn new(patterns: &PatternSet) -> Self {
        let slots: Box<[Slot]> = patterns.iter().cloned().map(Slot::new).collect();
        let completion = CompletionHandle::new(slots.len());
        Self {
            slots,
            settled: AtomicUsize::new(0),
            completion,
        }
    }

    /// Record a notification name
    ///
    /// Settles every pending slot whose pattern matches and returns the
    /// patterns settled by this call. Names matching nothing, or only
    /// already-settled slots, return an empty vector.
    pub fn record(&self, name: &str) -> Vec<Pattern> {
        let mut newly_settled = Vec::new();

        for slot in self.slots.iter() {
            if slot.is_settled() || !slot.pattern.matches(name) {
                continue;
            }
            if !slot.try_settle(name) {
                continue;
            }

            let settled = self.settled.fetch_add(1, Ordering::AcqRel) + 1;
            tracing::debug!(
                pattern = %slot.pattern,
                name = %name,
                settled,
                total = self.slots.len(),
                "Pattern settled"
            );
            self.completion.record_settlement();
            newly_settled.push(slot.pattern.clone());
        }

        if newly_settled.is_empty() {
            tracing::trace!(name = %name, "Notification settled no pending pattern");
        }

        newly_settled
    }

    pub fn is_fully_settled(&self) -> bool {
        self.settled_count() == self.slots.len()
    }

    pub fn settled_count(&self) -> usize {
        self.settled.load(Ordering::Acquire)
    }

    /// Number of patterns tracked
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the pattern with this text has settled (`None` if not tracked)
    pub fn is_settled(&self, pattern: &str) -> Option<bool> {
        self.slots
            .iter()
            .find(|slot| slot.pattern.as_str() == pattern)
            .map(Slot::is_settled)
    }

    pub fn pending_patterns(&self) -> Vec<Pattern> {
        self.slots
            .iter()
            .filter(|slot| !slot.is_settled())
            .map(|slot| slot.pattern.clone())
            .collect()
    }

    pub fn settled_patterns(&self) -> Vec<Pattern> {
        self.slots
            .iter()
            .filter(|slot| slot.is_settled())
            .map(|slot| slot.pattern.clone())
            .collect()
    }

    pub fn completion(&self) -> &CompletionHandle {
        &self.completion
    }

    /// Wait for every pattern to settle, bounded by `timeout`
    ///
    /// Returns immediately if everything already settled. On timeout the
    /// tracker keeps its state and stays queryable.
    ///
    /// # Errors
    /// `AppError::TimeoutExceeded` listing the patterns still pending.
    pub async fn await_all(&self, timeout: Duration) -> AppResult<()> {
        if self.is_fully_settled() {
            self.completion.resolve();
            return Ok(());
        }

        let resolved = self.completion.wait(timeout).await?;

        // A settlement can land between the deadline and this check
        if resolved || self.is_fully_settled() {
            self.completion.resolve();
            return Ok(());
        }

        let unsettled: Vec<String> = self
            .pending_patterns()
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        tracing::warn!(
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            settled = self.settled_count(),
            total = self.slots.len(),
            unsettled = ?unsettled,
            "Timed out waiting for expected patterns"
        );

        Err(AppError::TimeoutExceeded { timeout, unsettled })
    }

    /// Point-in-time snapshot for display or serialization
    ///
    /// `settled_by` can briefly lag `settled` for a slot being settled concurrently.
    pub fn report(&self) -> TrackerReport {
        TrackerReport {
            state: self.completion.state(),
            total: self.slots.len(),
            settled: self.settled_count(),
            patterns: self
                .slots
                .iter()
                .map(|slot| PatternReport {
                    pattern: slot.pattern.as_str().to_string(),
                    kind: slot.pattern.kind(),
                    settled: slot.is_settled(),
                    settled_by: slot.settled_by.get().cloned(),
                })
                .collect(),
        }
    }
}

/// Serializable snapshot of a tracker
#[derive(Debug, Clone, Serialize)]
pub struct TrackerReport {
    pub state: CompletionState,
    pub total: usize,
    pub settled: usize,
    pub patterns: Vec<PatternReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub pattern: String,
    pub kind: MatchKind,
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settled_by: Option<String>,
}

impl fmt::Display for TrackerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} ({}/{} patterns settled)",
            self.state.as_str(),
            self.settled,
            self.total
        )?;
        for entry in &self.patterns {
            match (&entry.settled_by, entry.settled) {
                (Some(name), _) => writeln!(f, "  [x] {} <- {}", entry.pattern, name)?,
                (None, true) => writeln!(f, "  [x] {}", entry.pattern)?,
                (None, false) => writeln!(f, "  [ ] {}", entry.pattern)?,
            }
        }
        Ok(())
    }
}
