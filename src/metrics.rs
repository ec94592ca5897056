//! Prometheus self-instrumentation for the harness
//!
//! These metrics describe the harness itself (how many notifications it saw,
//! how many slots settled, how many reporters are live). The measurements being
//! verified are never exported.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Outcome of delivering one notification to one reporter
///
/// Restricting the label to an enum keeps cardinality at two series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Settled at least one pending pattern
    Matched,
    /// Matched nothing still pending
    Unmatched,
}

impl Outcome {
    /// Convert outcome to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Matched => "matched",
            Outcome::Unmatched => "unmatched",
        }
    }
}

/// Metrics collector for the verification harness
#[derive(Clone)]
pub struct HarnessMetrics {
    pub registry: Arc<Registry>,
    notifications_total: IntCounterVec,
    settlements_total: IntCounter,
    active_reporters: IntGauge,
    timeouts_total: IntCounter,
}

impl HarnessMetrics {
    /// Create a new HarnessMetrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "metricwatch_notifications_total",
                "Notifications delivered to reporters by outcome",
            ),
            &["outcome"],
        )?;

        let settlements_total = IntCounter::with_opts(Opts::new(
            "metricwatch_settlements_total",
            "Pattern slots moved from pending to settled",
        ))?;

        let active_reporters = IntGauge::with_opts(Opts::new(
            "metricwatch_active_reporters",
            "Reporters currently registered as active",
        ))?;

        let timeouts_total = IntCounter::with_opts(Opts::new(
            "metricwatch_timeouts_total",
            "Bounded waits that elapsed with patterns still pending",
        ))?;

        registry.register(Box::new(notifications_total.clone()))?;
        registry.register(Box::new(settlements_total.clone()))?;
        registry.register(Box::new(active_reporters.clone()))?;
        registry.register(Box::new(timeouts_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            notifications_total,
            settlements_total,
            active_reporters,
            timeouts_total,
        })
    }

    /// Record one delivery and the number of slots it settled
    pub fn record_delivery(&self, newly_settled: usize) {
        let outcome = if newly_settled > 0 {
            Outcome::Matched
        } else {
            Outcome::Unmatched
        };
        self.notifications_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.settlements_total.inc_by(newly_settled as u64);
    }

    pub fn set_active_reporters(&self, count: usize) {
        self.active_reporters.set(count as i64);
    }

    pub fn record_timeout(&self) {
        self.timeouts_total.inc();
    }

    pub fn notifications_count(&self, outcome: Outcome) -> u64 {
        self.notifications_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    pub fn settlements_count(&self) -> u64 {
        self.settlements_total.get()
    }

    pub fn active_reporters(&self) -> i64 {
        self.active_reporters.get()
    }

    pub fn timeouts_count(&self) -> u64 {
        self.timeouts_total.get()
    }

    /// Gather and encode all metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        tracing::debug!(
            metric_family_count = metric_families.len(),
            "Encoding metrics to Prometheus text format"
        );

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "Failed to convert metrics to UTF-8 at byte {}: {}",
                e.utf8_error().valid_up_to(),
                e
            ))
        })
    }
}
