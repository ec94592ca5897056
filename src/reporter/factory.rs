//! Producer-factory boundary
//!
//! The surrounding system names a factory per reporter in its configuration and
//! hands it a bag of reporter-scoped settings. The factory returns a fresh
//! [`Reporter`]; activation is left to the caller.

use super::Reporter;
use crate::error::{AppError, AppResult};
use crate::tracker::PatternSet;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name under which [`PatternReporterFactory`] is registered
pub const PATTERN_FACTORY: &str = "pattern";

/// Reporter-scoped key/value settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReporterProperties(BTreeMap<String, toml::Value>);

impl ReporterProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<toml::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(toml::Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(toml::Value::as_bool)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(toml::Value::as_integer)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &toml::Value)> {
        self.0.iter()
    }
}

impl From<toml::Table> for ReporterProperties {
    fn from(table: toml::Table) -> Self {
        Self(table.into_iter().collect())
    }
}

/// Builds reporters from a properties bag
pub trait ReporterFactory: Send + Sync {
    /// Name used to reference this factory from configuration
    fn name(&self) -> &str;

    /// Build a new, not yet activated reporter
    ///
    /// `reporter_name` is the configured reporter name; implementations may use
    /// it as a default label.
    fn create(
        &self,
        reporter_name: &str,
        properties: &ReporterProperties,
    ) -> AppResult<Arc<Reporter>>;
}

/// Factory producing reporters that track a shared [`PatternSet`]
///
/// Every reporter gets its own tracker; settlement never crosses reporters.
/// Recognised properties:
/// - `label` (string): overrides the reporter label, defaults to the reporter name
#[derive(Debug, Clone)]
pub struct PatternReporterFactory {
    patterns: PatternSet,
}

impl PatternReporterFactory {
    pub fn new(patterns: PatternSet) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }
}

impl ReporterFactory for PatternReporterFactory {
    fn name(&self) -> &str {
        PATTERN_FACTORY
    }

    fn create(
        &self,
        reporter_name: &str,
        properties: &ReporterProperties,
    ) -> AppResult<Arc<Reporter>> {
        let label = match properties.get("label") {
            None => reporter_name.to_string(),
            Some(value) => value
                .as_str()
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "metrics.reporter.{}.label must be a string, got {}",
                        reporter_name,
                        value.type_str()
                    ))
                })?
                .to_string(),
        };

        let reporter = Reporter::new(label, &self.patterns);
        tracing::debug!(
            reporter_id = %reporter.id(),
            reporter_name = %reporter_name,
            settings = properties.len(),
            "Pattern reporter created"
        );
        Ok(Arc::new(reporter))
    }
}

/// Lookup table from factory name to factory
#[derive(Default, Clone)]
pub struct FactoryCatalog {
    factories: HashMap<String, Arc<dyn ReporterFactory>>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog containing the built-in pattern factory for `patterns`
    pub fn with_pattern_factory(patterns: PatternSet) -> Self {
        let mut catalog = Self::new();
        catalog.register(Arc::new(PatternReporterFactory::new(patterns)));
        catalog
    }

    /// Add a factory, replacing any factory with the same name
    pub fn register(&mut self, factory: Arc<dyn ReporterFactory>) {
        self.factories.insert(factory.name().to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ReporterFactory>> {
        self.factories.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for FactoryCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryCatalog")
            .field("factories", &self.names())
            .finish()
    }
}
