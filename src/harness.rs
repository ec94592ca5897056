//! Verification harness
//!
//! Owns the reporter registry for one verification run. Setup reads the
//! configuration, builds reporters through their factories and activates them;
//! teardown deactivates them and clears the registry so a later run starts
//! from an empty set.

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::metrics::HarnessMetrics;
use crate::reporter::{FactoryCatalog, Notification, Reporter, ReporterRegistry};
use crate::tracker::TrackerReport;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    config: Arc<Config>,
    registry: ReporterRegistry,
    metrics: HarnessMetrics,
    installed: Vec<Arc<Reporter>>,
}

impl Harness {
    /// Set up with the built-in pattern factory
    pub fn setup(config: Config) -> AppResult<Self> {
        let catalog = FactoryCatalog::with_pattern_factory(config.expectations.pattern_set()?);
        Self::setup_with_catalog(config, &catalog)
    }

    /// Set up using factories from `catalog`
    ///
    /// Installs nothing when system resource metrics are disabled or no
    /// reporter is listed.
    ///
    /// # Errors
    /// `AppError::UnknownFactory` when a reporter names a factory missing from
    /// the catalog, or any error returned by a factory.
    pub fn setup_with_catalog(config: Config, catalog: &FactoryCatalog) -> AppResult<Self> {
        let metrics = HarnessMetrics::new()
            .map_err(|e| AppError::Internal(format!("failed to register harness metrics: {}", e)))?;
        let registry = ReporterRegistry::with_metrics(metrics.clone());
        let mut harness = Self {
            config: Arc::new(config),
            registry,
            metrics,
            installed: Vec::new(),
        };

        if !harness.config.is_tracking_enabled() {
            tracing::info!(
                system_resource_metrics = harness.config.metrics.system_resource_metrics,
                reporters = harness.config.metrics.reporters.len(),
                "Tracking disabled, no reporters installed"
            );
            return Ok(harness);
        }

        for name in &harness.config.metrics.reporters {
            let reporter_config = harness.config.metrics.reporter.get(name).ok_or_else(|| {
                AppError::Config(format!("reporter '{}' has no configuration table", name))
            })?;
            let factory = catalog
                .get(reporter_config.factory())
                .ok_or_else(|| AppError::UnknownFactory {
                    reporter: name.clone(),
                    factory: reporter_config.factory().to_string(),
                })?;

            let reporter = factory.create(name, &reporter_config.properties())?;
            reporter.activate(&harness.registry)?;
            harness.installed.push(reporter);
        }

        tracing::info!(
            reporters = harness.installed.len(),
            timeout_seconds = harness.config.expectations.timeout().as_secs(),
            "Harness set up"
        );

        Ok(harness)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ReporterRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &HarnessMetrics {
        &self.metrics
    }

    /// Reporters installed by setup, in configuration order
    pub fn installed(&self) -> &[Arc<Reporter>] {
        &self.installed
    }

    pub fn is_installed(&self) -> bool {
        !self.installed.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        self.config.expectations.timeout()
    }

    /// Fan a notification out to every active reporter
    pub fn publish(&self, notification: &Notification) -> usize {
        self.registry.broadcast(notification)
    }

    /// Wait on the only active reporter, bounded by the configured timeout
    pub async fn await_single(&self) -> AppResult<Arc<Reporter>> {
        let reporter = self.registry.single_active()?;
        self.await_reporter(&reporter).await?;
        Ok(reporter)
    }

    /// Wait on one reporter, bounded by the configured timeout
    pub async fn await_reporter(&self, reporter: &Reporter) -> AppResult<()> {
        let result = reporter.tracker().await_all(self.timeout()).await;
        if matches!(result, Err(AppError::TimeoutExceeded { .. })) {
            self.metrics.record_timeout();
        }
        result
    }

    /// Wait on every active reporter concurrently; the first failure is returned
    pub async fn await_all_reporters(&self) -> AppResult<()> {
        let active = self.registry.active();
        let results = join_all(active.iter().map(|r| self.await_reporter(r))).await;
        results.into_iter().collect()
    }

    /// Snapshot of every installed reporter's tracker
    pub fn reports(&self) -> Vec<(String, TrackerReport)> {
        self.installed
            .iter()
            .map(|r| (r.label().to_string(), r.tracker().report()))
            .collect()
    }

    /// Deactivate installed reporters and clear the registry
    pub fn teardown(self) {
        drop(self);
    }

    fn shutdown(&mut self) {
        for reporter in self.installed.drain(..) {
            reporter.deactivate();
        }
        self.registry.clear();
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{LabelPath, MetricValue, PatternReporterFactory, ReporterFactory};
    use std::str::FromStr;

    const CONFIG: &str = r#"
[metrics]
system_resource_metrics = true
reporters = ["test_reporter"]

[metrics.reporter.test_reporter]
factory = "pattern"

[expectations]
hosts = ["taskmanager."]
gauges = ["System.CPU.Idle", "System.Memory.Total"]
timeout_seconds = 1
"#;

    fn gauge(host: &str, name: &str) -> Notification {
        Notification::new(LabelPath::new([host]), name, MetricValue::Gauge(1.0))
    }

    #[test]
    fn test_setup_activates_configured_reporter() {
        let harness = Harness::setup(Config::from_str(CONFIG).unwrap()).unwrap();
        assert!(harness.is_installed());
        assert_eq!(harness.registry().len(), 1);
        assert_eq!(harness.installed()[0].label(), "test_reporter");
    }

    #[test]
    fn test_disabled_tracking_installs_nothing() {
        let toml = CONFIG.replace(
            "system_resource_metrics = true",
            "system_resource_metrics = false",
        );
        let harness = Harness::setup(Config::from_str(&toml).unwrap()).unwrap();
        assert!(!harness.is_installed());
        assert!(harness.registry().is_empty());
    }

    #[test]
    fn test_unknown_factory_fails_setup() {
        let toml = CONFIG.replace("factory = \"pattern\"", "factory = \"jmx\"");
        let result = Harness::setup(Config::from_str(&toml).unwrap());
        assert!(matches!(
            result,
            Err(AppError::UnknownFactory { ref factory, .. }) if factory == "jmx"
        ));
    }

    #[test]
    fn test_teardown_clears_registry() {
        let harness = Harness::setup(Config::from_str(CONFIG).unwrap()).unwrap();
        let registry = harness.registry().clone();
        let reporter = Arc::clone(&harness.installed()[0]);

        harness.teardown();
        assert!(registry.is_empty());
        assert_eq!(reporter.lifecycle(), crate::reporter::Lifecycle::Deactivated);
    }

    #[test]
    fn test_custom_catalog_is_used() {
        let config = Config::from_str(CONFIG).unwrap();
        let patterns = crate::tracker::PatternSet::new(vec![crate::tracker::Pattern::exact("x")]).unwrap();
        let factory = PatternReporterFactory::new(patterns);
        let mut catalog = FactoryCatalog::new();
        catalog.register(Arc::new(factory.clone()));
        assert_eq!(factory.name(), "pattern");

        let harness = Harness::setup_with_catalog(config, &catalog).unwrap();
        assert_eq!(harness.installed()[0].tracker().len(), 1);
    }

    #[tokio::test]
    async fn test_publish_then_await_single() {
        let harness = Harness::setup(Config::from_str(CONFIG).unwrap()).unwrap();
        harness.publish(&gauge("taskmanager", "System.CPU.Idle"));
        harness.publish(&gauge("taskmanager", "System.Memory.Total"));

        let reporter = harness.await_single().await.unwrap();
        assert!(reporter.tracker().is_fully_settled());
        assert_eq!(harness.metrics().timeouts_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_counted() {
        let harness = Harness::setup(Config::from_str(CONFIG).unwrap()).unwrap();
        harness.publish(&gauge("taskmanager", "System.CPU.Idle"));

        let err = harness.await_single().await.unwrap_err();
        assert_eq!(
            err.unsettled_patterns(),
            ["taskmanager.System.Memory.Total".to_string()]
        );
        assert_eq!(harness.metrics().timeouts_count(), 1);
    }
}
