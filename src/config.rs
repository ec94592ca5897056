//! Configuration management for metricwatch
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::reporter::{LabelPath, ReporterProperties};
use crate::tracker::{MatchKind, PatternSet, WILDCARD};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the completion timeout
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub metrics: MetricsConfig,
    pub expectations: ExpectationsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Which reporters the surrounding system installs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Whether system resource measurements are emitted at all
    #[serde(default)]
    pub system_resource_metrics: bool,
    /// Names of the active reporters, each needing a `[metrics.reporter.<name>]` table
    #[serde(default)]
    pub reporters: Vec<String>,
    #[serde(default)]
    pub reporter: BTreeMap<String, ReporterConfig>,
}

/// Per-reporter settings: the factory name plus arbitrary keys for the factory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReporterConfig {
    factory: String,
    #[serde(flatten)]
    settings: toml::Table,
}

impl ReporterConfig {
    pub fn new(factory: impl Into<String>, settings: toml::Table) -> Self {
        Self {
            factory: factory.into(),
            settings,
        }
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn settings(&self) -> &toml::Table {
        &self.settings
    }

    /// Settings as the properties bag handed to the factory
    pub fn properties(&self) -> ReporterProperties {
        ReporterProperties::from(self.settings.clone())
    }
}

/// What the reporters must observe, and for how long to wait
///
/// Patterns are every gauge qualified by every host scope, joined the same way
/// notification identifiers are. `taskmanager` and `taskmanager.` name the same
/// scope. An empty host list uses the gauges as-is.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExpectationsConfig {
    #[serde(default)]
    hosts: Vec<String>,
    gauges: Vec<String>,
    #[serde(default)]
    match_kind: MatchKind,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl ExpectationsConfig {
    pub fn new(hosts: Vec<String>, gauges: Vec<String>, match_kind: MatchKind, timeout_seconds: u64) -> Self {
        Self {
            hosts,
            gauges,
            match_kind,
            timeout_seconds,
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn gauges(&self) -> &[String] {
        &self.gauges
    }

    pub fn match_kind(&self) -> MatchKind {
        self.match_kind
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Host scopes as label paths; one empty scope when no host is configured
    pub fn scopes(&self) -> Vec<LabelPath> {
        if self.hosts.is_empty() {
            return vec![LabelPath::default()];
        }
        self.hosts.iter().map(|h| LabelPath::from_dotted(h)).collect()
    }

    /// Build the expected pattern set (host-major order)
    pub fn pattern_set(&self) -> crate::error::AppResult<PatternSet> {
        let prefixes: Vec<String> = self.scopes().iter().map(|scope| scope.qualify("")).collect();
        PatternSet::from_cross_product(&prefixes, &self.gauges, self.match_kind)
    }
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Whether the tracking apparatus should be installed at all
    pub fn is_tracking_enabled(&self) -> bool {
        self.metrics.system_resource_metrics && !self.metrics.reporters.is_empty()
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()` and `from_str()`; call it explicitly when
    /// constructing Config in code.
    pub fn validate(&self) -> crate::error::AppResult<()> {
        let mut seen = HashSet::new();
        for name in &self.metrics.reporters {
            if name.trim().is_empty() {
                return Err(crate::error::AppError::Config(
                    "Configuration error: metrics.reporters contains an empty reporter name"
                        .to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: reporter '{}' is listed more than once in metrics.reporters",
                    name
                )));
            }
            let Some(reporter) = self.metrics.reporter.get(name) else {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: reporter '{}' is listed in metrics.reporters but has no \
                    [metrics.reporter.{}] table.\n\n\
                    Example fix - add to config.toml:\n\
                    [metrics.reporter.{}]\n\
                    factory = \"pattern\"",
                    name, name, name
                )));
            };
            if reporter.factory.trim().is_empty() {
                return Err(crate::error::AppError::Config(format!(
                    "Configuration error: metrics.reporter.{}.factory must not be empty",
                    name
                )));
            }
        }

        if self.expectations.gauges.is_empty() {
            return Err(crate::error::AppError::Config(
                "Configuration error: expectations.gauges has no entries. \
                At least one expected measurement is required; an empty expectation \
                set would be satisfied before any measurement arrives."
                    .to_string(),
            ));
        }
        if let Some(blank) = self.expectations.gauges.iter().find(|g| g.is_empty()) {
            return Err(crate::error::AppError::Config(format!(
                "Configuration error: expectations.gauges contains an empty entry ({:?})",
                blank
            )));
        }

        if self.expectations.match_kind != MatchKind::Glob
            && let Some(wild) = self
                .expectations
                .gauges
                .iter()
                .find(|g| g.contains(WILDCARD))
        {
            return Err(crate::error::AppError::Config(format!(
                "Configuration error: expectations.gauges entry {:?} contains '{}', which only \
                acts as a wildcard when match_kind = \"glob\" (got \"{}\")",
                wild,
                WILDCARD,
                self.expectations.match_kind.as_str()
            )));
        }

        if self.expectations.timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "Configuration error: expectations.timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }
        if self.expectations.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(crate::error::AppError::Config(format!(
                "Configuration error: expectations.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.expectations.timeout_seconds
            )));
        }

        // Surfaces uncompilable globs at load time rather than at harness setup
        self.expectations.pattern_set()?;

        Ok(())
    }
}

impl FromStr for Config {
    type Err = crate::error::AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(toml_str).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            }
        })?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const TEST_CONFIG: &str = r#"
[metrics]
system_resource_metrics = true
reporters = ["test_reporter"]

[metrics.reporter.test_reporter]
factory = "pattern"
label = "system-resources"
interval_ms = 250

[expectations]
hosts = ["taskmanager.", "jobmanager."]
gauges = ["System.CPU.Idle", "System.Network.*ReceiveRate"]
timeout_seconds = 5

[observability]
log_level = "debug"
"#;

    #[test]
    fn test_config_from_str_parses_successfully() {
        let config = Config::from_str(TEST_CONFIG).expect("should parse config");
        assert!(config.metrics.system_resource_metrics);
        assert_eq!(config.metrics.reporters, vec!["test_reporter"]);
        assert_eq!(config.expectations.timeout(), Duration::from_secs(5));
        assert_eq!(config.expectations.match_kind(), MatchKind::Glob);
        assert_eq!(config.observability.log_level, "debug");
    }

    #[test]
    fn test_reporter_settings_are_flattened() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        let reporter = &config.metrics.reporter["test_reporter"];
        assert_eq!(reporter.factory(), "pattern");

        let properties = reporter.properties();
        assert_eq!(properties.get_str("label"), Some("system-resources"));
        assert_eq!(properties.get_integer("interval_ms"), Some(250));
        assert!(properties.get("factory").is_none());
    }

    #[test]
    fn test_pattern_set_is_host_major_cross_product() {
        let config = Config::from_str(TEST_CONFIG).unwrap();
        let set = config.expectations.pattern_set().unwrap();
        let texts: Vec<&str> = set.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "taskmanager.System.CPU.Idle",
                "taskmanager.System.Network.*ReceiveRate",
                "jobmanager.System.CPU.Idle",
                "jobmanager.System.Network.*ReceiveRate",
            ]
        );
    }

    #[test]
    fn test_empty_hosts_use_gauges_verbatim() {
        let toml = r#"
[metrics]
[expectations]
gauges = ["System.CPU.Idle"]
"#;
        let config = Config::from_str(toml).unwrap();
        let set = config.expectations.pattern_set().unwrap();
        assert_eq!(set.as_slice()[0].as_str(), "System.CPU.Idle");
        assert!(!config.is_tracking_enabled());
    }

    #[test]
    fn test_host_without_trailing_delimiter_is_qualified() {
        let toml = r#"
[metrics]
[expectations]
hosts = ["taskmanager", "jobmanager.", "cluster.taskmanager"]
gauges = ["System.CPU.Idle"]
"#;
        let config = Config::from_str(toml).unwrap();
        let set = config.expectations.pattern_set().unwrap();
        let texts: Vec<&str> = set.iter().map(|p| p.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "taskmanager.System.CPU.Idle",
                "jobmanager.System.CPU.Idle",
                "cluster.taskmanager.System.CPU.Idle",
            ]
        );

        let scopes = config.expectations.scopes();
        assert_eq!(scopes[0].qualify("System.CPU.Idle"), texts[0]);
    }

    #[test]
    fn test_wildcard_gauge_requires_glob_kind() {
        for kind in ["exact", "prefix"] {
            let toml = format!(
                "[metrics]\n[expectations]\ngauges = [\"System.Network.*ReceiveRate\"]\nmatch_kind = \"{}\"\n",
                kind
            );
            let err = Config::from_str(&toml).unwrap_err();
            assert!(
                err.to_string().contains("System.Network.*ReceiveRate"),
                "match_kind = {}: {}",
                kind,
                err
            );
        }

        let exact_literal = "[metrics]\n[expectations]\ngauges = [\"System.CPU.Idle\"]\nmatch_kind = \"exact\"\n";
        assert!(Config::from_str(exact_literal).is_ok());
    }

    #[test]
    fn test_missing_reporter_table_is_rejected() {
        let toml = r#"
[metrics]
system_resource_metrics = true
reporters = ["ghost"]

[expectations]
gauges = ["System.CPU.Idle"]
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, AppError::Config(ref msg) if msg.contains("[metrics.reporter.ghost]")));
    }

    #[test]
    fn test_duplicate_reporter_names_are_rejected() {
        let toml = r#"
[metrics]
reporters = ["a", "a"]

[metrics.reporter.a]
factory = "pattern"

[expectations]
gauges = ["System.CPU.Idle"]
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_empty_gauges_are_rejected() {
        let toml = r#"
[metrics]
[expectations]
gauges = []
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("expectations.gauges"));
    }

    #[test]
    fn test_timeout_bounds() {
        for (value, ok) in [(0, false), (1, true), (300, true), (301, false)] {
            let toml = format!(
                "[metrics]\n[expectations]\ngauges = [\"a\"]\ntimeout_seconds = {}\n",
                value
            );
            assert_eq!(Config::from_str(&toml).is_ok(), ok, "timeout_seconds = {}", value);
        }
    }

    #[test]
    fn test_unknown_match_kind_is_parse_error() {
        let toml = r#"
[metrics]
[expectations]
gauges = ["a"]
match_kind = "regex"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, AppError::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_tracking_disabled_without_flag() {
        let toml = r#"
[metrics]
system_resource_metrics = false
reporters = ["r"]

[metrics.reporter.r]
factory = "pattern"

[expectations]
gauges = ["a"]
"#;
        let config = Config::from_str(toml).unwrap();
        assert!(!config.is_tracking_enabled());
    }
}
