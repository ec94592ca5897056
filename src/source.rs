//! Simulated notification source
//!
//! Stands in for a running cluster: for every expected host and gauge it emits
//! one notification, interleaved with unrelated ones, from several concurrent
//! producer tasks in random order. Values are random; only names matter.

use crate::config::ExpectationsConfig;
use crate::reporter::{LabelPath, MetricValue, Notification, ReporterRegistry};
use crate::tracker::WILDCARD;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Device names substituted for the wildcard in gauges like `System.Network.*ReceiveRate`
pub const DEFAULT_DEVICES: &[&str] = &["eth0", "lo"];

/// Names emitted alongside the expected ones; they never match anything
const NOISE: &[&str] = &[
    "Status.JVM.Memory.Heap.Used",
    "Status.JVM.Threads.Count",
    "numRegisteredTaskManagers",
];

/// Producer plan: notifications and the delay before each one
type Plan = Vec<(Duration, Notification)>;

#[derive(Debug, Clone)]
pub struct SimulatedSource {
    hosts: Vec<LabelPath>,
    gauges: Vec<String>,
    devices: Vec<String>,
    omit: Vec<String>,
    producers: usize,
    max_jitter: Duration,
    seed: u64,
}

impl SimulatedSource {
    /// Source emitting every configured host × gauge
    ///
    /// Hosts such as `taskmanager.` become the scope `taskmanager`.
    pub fn from_expectations(expectations: &ExpectationsConfig) -> Self {
        Self {
            hosts: expectations.scopes(),
            gauges: expectations.gauges().to_vec(),
            devices: DEFAULT_DEVICES.iter().map(|d| d.to_string()).collect(),
            omit: Vec::new(),
            producers: 2,
            max_jitter: Duration::from_millis(20),
            seed: rand::random(),
        }
    }

    /// Never emit these gauges (exact gauge text as configured)
    pub fn omit<I, S>(mut self, gauges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit.extend(gauges.into_iter().map(Into::into));
        self
    }

    /// Number of concurrent producer tasks (at least one)
    pub fn producers(mut self, producers: usize) -> Self {
        self.producers = producers.max(1);
        self
    }

    pub fn max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Device names substituted into wildcard gauges
    ///
    /// An empty list falls back to [`DEFAULT_DEVICES`]; a wildcard gauge always
    /// needs at least one concrete name.
    pub fn devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let devices: Vec<String> = devices.into_iter().map(Into::into).collect();
        self.devices = if devices.is_empty() {
            DEFAULT_DEVICES.iter().map(|d| d.to_string()).collect()
        } else {
            devices
        };
        self
    }

    /// Concrete metric names for a gauge, expanding the wildcard per device
    fn concrete_names(&self, gauge: &str) -> Vec<String> {
        if !gauge.contains(WILDCARD) {
            return vec![gauge.to_string()];
        }
        self.devices
            .iter()
            .map(|device| gauge.replace(WILDCARD, &format!("{}.", device)))
            .collect()
    }

    /// Every notification this source will emit, unshuffled
    pub fn notifications(&self) -> Vec<Notification> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut notifications = Vec::new();

        for host in &self.hosts {
            for gauge in self.gauges.iter().filter(|g| !self.omit.contains(*g)) {
                for name in self.concrete_names(gauge) {
                    notifications.push(Notification::new(
                        host.clone(),
                        name,
                        MetricValue::Gauge(rng.random_range(0.0..100.0)),
                    ));
                }
            }
            for noise in NOISE {
                notifications.push(Notification::new(
                    host.clone(),
                    *noise,
                    MetricValue::Counter(rng.random_range(0..1000)),
                ));
            }
        }

        notifications
    }

    /// Shuffle and deal notifications to producers, with a delay before each
    fn plans(&self) -> Vec<Plan> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(1));
        let mut notifications = self.notifications();
        notifications.shuffle(&mut rng);

        let jitter_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let mut plans: Vec<Plan> = vec![Vec::new(); self.producers];
        for (i, notification) in notifications.into_iter().enumerate() {
            let delay = Duration::from_millis(rng.random_range(0..=jitter_ms));
            plans[i % self.producers].push((delay, notification));
        }
        plans
    }

    /// Start the producers; each handle yields the number of slots it settled
    pub fn spawn(&self, registry: ReporterRegistry) -> Vec<JoinHandle<usize>> {
        self.plans()
            .into_iter()
            .enumerate()
            .map(|(producer, plan)| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let mut settled = 0;
                    for (delay, notification) in plan {
                        tokio::time::sleep(delay).await;
                        settled += registry.broadcast(&notification);
                    }
                    tracing::debug!(producer, settled, "Producer finished");
                    settled
                })
            })
            .collect()
    }
}
