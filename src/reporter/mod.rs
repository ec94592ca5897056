//! Reporter instances and their lifecycle
//!
//! A [`Reporter`] is one producer-side observer owning its own
//! [`MatchTracker`]. It becomes visible in a [`ReporterRegistry`] when
//! activated and disappears when deactivated. Identity is a UUID, so two
//! reporters built from identical configuration are still distinct entries.

pub mod factory;
pub mod notification;
pub mod registry;

pub use factory::{FactoryCatalog, PATTERN_FACTORY, PatternReporterFactory, ReporterFactory, ReporterProperties};
pub use notification::{LabelPath, MetricValue, Notification, SCOPE_DELIMITER};
pub use registry::ReporterRegistry;

use crate::error::{AppError, AppResult};
use crate::tracker::{MatchTracker, Pattern, PatternSet};
use registry::RegistryMembership;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const CREATED: u8 = 0;
const ACTIVATED: u8 = 1;
const DEACTIVATED: u8 = 2;

/// Lifecycle position of a reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Created,
    Activated,
    Deactivated,
}

impl Lifecycle {
    fn from_raw(raw: u8) -> Self {
        match raw {
            ACTIVATED => Self::Activated,
            DEACTIVATED => Self::Deactivated,
            _ => Self::Created,
        }
    }
}

/// A producer-side observer tracking its own expected pattern set
#[derive(Debug)]
pub struct Reporter {
    id: Uuid,
    label: String,
    tracker: MatchTracker,
    lifecycle: AtomicU8,
    membership: Mutex<Option<RegistryMembership>>,
}

impl Reporter {
    pub fn new(label: impl Into<String>, patterns: &PatternSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            tracker: MatchTracker::new(patterns),
            lifecycle: AtomicU8::new(CREATED),
            membership: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tracker(&self) -> &MatchTracker {
        &self.tracker
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_raw(self.lifecycle.load(Ordering::Acquire))
    }

    /// Register in `registry` and start accepting notifications
    ///
    /// The reporter stays bound to `registry` until it is deactivated.
    /// Activating an already-active reporter is a no-op.
    ///
    /// # Errors
    /// `AppError::ReporterClosed` if the reporter was deactivated; build a new
    /// reporter from the factory instead.
    pub fn activate(self: &Arc<Self>, registry: &ReporterRegistry) -> AppResult<()> {
        let mut membership = self.lock_membership();
        match self.lifecycle.load(Ordering::Acquire) {
            CREATED => {
                registry.insert(Arc::clone(self));
                *membership = Some(registry.membership());
                self.lifecycle.store(ACTIVATED, Ordering::Release);
                tracing::info!(
                    reporter_id = %self.id,
                    label = %self.label,
                    patterns = self.tracker.len(),
                    "Reporter activated"
                );
                Ok(())
            }
            ACTIVATED => {
                tracing::debug!(reporter_id = %self.id, "Reporter already active");
                Ok(())
            }
            _ => Err(AppError::ReporterClosed { id: self.id }),
        }
    }

    /// Leave the registry joined at activation; the tracker stays queryable
    pub fn deactivate(&self) {
        let mut membership = self.lock_membership();
        let previous = self.lifecycle.swap(DEACTIVATED, Ordering::AcqRel);
        let Some(registry) = membership.take().and_then(|m| m.registry()) else {
            return;
        };
        if previous == ACTIVATED {
            registry.remove(self.id);
            tracing::info!(
                reporter_id = %self.id,
                label = %self.label,
                settled = self.tracker.settled_count(),
                total = self.tracker.len(),
                "Reporter deactivated"
            );
        }
    }

    /// Mark deactivated once the registry already dropped this reporter
    pub(crate) fn mark_deactivated(&self) {
        let mut membership = self.lock_membership();
        self.lifecycle.store(DEACTIVATED, Ordering::Release);
        membership.take();
    }

    fn lock_membership(&self) -> MutexGuard<'_, Option<RegistryMembership>> {
        self.membership
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle a newly added metric; returns the patterns it settled
    pub fn on_notify(&self, notification: &Notification) -> Vec<Pattern> {
        let identifier = notification.identifier();
        let settled = self.tracker.record(&identifier);
        if !settled.is_empty() {
            tracing::trace!(
                reporter_id = %self.id,
                identifier = %identifier,
                value = %notification.value(),
                settled = settled.len(),
                "Notification settled patterns"
            );
        }
        settled
    }

    /// Handle a removed metric; settlement is one-way so nothing changes
    pub fn on_removed(&self, notification: &Notification) {
        tracing::trace!(
            reporter_id = %self.id,
            identifier = %notification.identifier(),
            "Metric removed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> PatternSet {
        PatternSet::new(vec![Pattern::exact("taskmanager.System.CPU.Idle")]).unwrap()
    }

    #[test]
    fn test_new_reporter_is_created() {
        let reporter = Reporter::new("test", &patterns());
        assert_eq!(reporter.lifecycle(), Lifecycle::Created);
        assert_eq!(reporter.label(), "test");
    }

    #[test]
    fn test_on_notify_uses_qualified_identifier() {
        let reporter = Reporter::new("test", &patterns());
        let bare = Notification::new(
            LabelPath::default(),
            "System.CPU.Idle",
            MetricValue::Gauge(1.0),
        );
        assert!(reporter.on_notify(&bare).is_empty());

        let scoped = Notification::new(
            LabelPath::new(["taskmanager"]),
            "System.CPU.Idle",
            MetricValue::Gauge(1.0),
        );
        assert_eq!(reporter.on_notify(&scoped).len(), 1);
        assert!(reporter.tracker().is_fully_settled());
    }

    #[test]
    fn test_on_removed_does_not_unsettle() {
        let reporter = Reporter::new("test", &patterns());
        let n = Notification::new(
            LabelPath::new(["taskmanager"]),
            "System.CPU.Idle",
            MetricValue::Gauge(1.0),
        );
        reporter.on_notify(&n);
        reporter.on_removed(&n);
        assert!(reporter.tracker().is_fully_settled());
    }

    #[test]
    fn test_activate_after_deactivate_is_rejected() {
        let registry = ReporterRegistry::new();
        let reporter = Arc::new(Reporter::new("test", &patterns()));
        reporter.activate(&registry).unwrap();
        reporter.deactivate();

        let err = reporter.activate(&registry).unwrap_err();
        assert!(matches!(err, AppError::ReporterClosed { id } if id == reporter.id()));
        assert!(!registry.contains(reporter.id()));
    }

    #[test]
    fn test_double_activate_is_noop() {
        let registry = ReporterRegistry::new();
        let reporter = Arc::new(Reporter::new("test", &patterns()));
        reporter.activate(&registry).unwrap();
        reporter.activate(&registry).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_deactivate_without_activation_closes_reporter() {
        let reporter = Reporter::new("test", &patterns());
        reporter.deactivate();
        assert_eq!(reporter.lifecycle(), Lifecycle::Deactivated);
    }

    #[test]
    fn test_deactivate_after_registry_dropped() {
        let registry = ReporterRegistry::new();
        let reporter = Arc::new(Reporter::new("test", &patterns()));
        reporter.activate(&registry).unwrap();
        drop(registry);

        reporter.deactivate();
        assert_eq!(reporter.lifecycle(), Lifecycle::Deactivated);
    }
}
