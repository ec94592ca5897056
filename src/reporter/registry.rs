//! Registry of currently active reporters
//!
//! An explicit object owned by whoever runs a verification, never a global, so
//! independent runs cannot observe each other's reporters.

use super::Reporter;
use super::notification::Notification;
use crate::error::{AppError, AppResult};
use crate::metrics::HarnessMetrics;
use crate::tracker::Pattern;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Concurrent set of active reporters keyed by identity
///
/// Cloning shares the underlying set.
#[derive(Clone, Default)]
pub struct ReporterRegistry {
    reporters: Arc<DashMap<Uuid, Arc<Reporter>>>,
    metrics: Option<HarnessMetrics>,
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that reports deliveries and membership to `metrics`
    pub fn with_metrics(metrics: HarnessMetrics) -> Self {
        Self {
            reporters: Arc::new(DashMap::new()),
            metrics: Some(metrics),
        }
    }

    /// Non-owning handle a reporter keeps to the registry it joined
    pub(crate) fn membership(&self) -> RegistryMembership {
        RegistryMembership {
            reporters: Arc::downgrade(&self.reporters),
            metrics: self.metrics.clone(),
        }
    }

    pub(crate) fn insert(&self, reporter: Arc<Reporter>) {
        self.reporters.insert(reporter.id(), reporter);
        self.publish_membership();
    }

    pub(crate) fn remove(&self, id: Uuid) -> Option<Arc<Reporter>> {
        let removed = self.reporters.remove(&id).map(|(_, reporter)| reporter);
        self.publish_membership();
        removed
    }

    fn publish_membership(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.set_active_reporters(self.reporters.len());
        }
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.reporters.contains_key(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Reporter>> {
        self.reporters.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of the active reporters
    pub fn active(&self) -> Vec<Arc<Reporter>> {
        self.reporters
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.reporters.iter().map(|entry| *entry.key()).collect()
    }

    /// The only active reporter
    ///
    /// # Errors
    /// `AppError::UnexpectedReporterCount` unless exactly one reporter is active.
    pub fn single_active(&self) -> AppResult<Arc<Reporter>> {
        let active = self.active();
        match <[Arc<Reporter>; 1]>::try_from(active) {
            Ok([reporter]) => Ok(reporter),
            Err(active) => Err(AppError::UnexpectedReporterCount {
                expected: 1,
                actual: active.len(),
            }),
        }
    }

    /// Deliver to one reporter; `None` if it is not active
    pub fn dispatch(&self, id: Uuid, notification: &Notification) -> Option<Vec<Pattern>> {
        let Some(reporter) = self.get(id) else {
            tracing::debug!(
                reporter_id = %id,
                identifier = %notification.identifier(),
                "Dropping notification for inactive reporter"
            );
            return None;
        };
        let settled = reporter.on_notify(notification);
        self.record_delivery(settled.len());
        Some(settled)
    }

    /// Deliver to every active reporter; returns the total slots settled
    pub fn broadcast(&self, notification: &Notification) -> usize {
        self.active()
            .iter()
            .map(|reporter| {
                let settled = reporter.on_notify(notification).len();
                self.record_delivery(settled);
                settled
            })
            .sum()
    }

    /// Deliver a removal to every active reporter
    pub fn broadcast_removed(&self, notification: &Notification) {
        for reporter in self.active() {
            reporter.on_removed(notification);
        }
    }

    fn record_delivery(&self, settled: usize) {
        if let Some(metrics) = &self.metrics {
            metrics.record_delivery(settled);
        }
    }

    /// Deactivate and drop every reporter
    pub fn clear(&self) {
        let ids = self.ids();
        for id in ids {
            if let Some((_, reporter)) = self.reporters.remove(&id) {
                reporter.mark_deactivated();
            }
        }
        self.publish_membership();
        tracing::debug!("Reporter registry cleared");
    }
}

/// Weak link from a reporter back to its registry
///
/// Does not keep the registry alive, so registry and reporters never form a cycle.
#[derive(Clone)]
pub(crate) struct RegistryMembership {
    reporters: Weak<DashMap<Uuid, Arc<Reporter>>>,
    metrics: Option<HarnessMetrics>,
}

impl RegistryMembership {
    /// The registry, if anything still holds it
    pub(crate) fn registry(&self) -> Option<ReporterRegistry> {
        self.reporters.upgrade().map(|reporters| ReporterRegistry {
            reporters,
            metrics: self.metrics.clone(),
        })
    }
}

impl std::fmt::Debug for RegistryMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryMembership")
            .field("live", &(self.reporters.strong_count() > 0))
            .finish()
    }
}

impl std::fmt::Debug for ReporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterRegistry")
            .field("active", &self.reporters.len())
            .finish()
    }
}
