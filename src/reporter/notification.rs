//! Notifications delivered from producers to reporters

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between scope components and the metric name
pub const SCOPE_DELIMITER: char = '.';

/// Current value carried by a notification
///
/// The tracker only looks at names; the value is kept for logging and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetricValue {
    Gauge(f64),
    Counter(u64),
    Text(String),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gauge(v) => write!(f, "{}", v),
            Self::Counter(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Ordered scope components identifying the owner of a metric
///
/// `["taskmanager"]` or `["host-1", "Status", "JVM"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelPath(Vec<String>);

impl LabelPath {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(components.into_iter().map(Into::into).collect())
    }

    /// Split a dotted scope such as `taskmanager.Status`; empty segments are dropped
    pub fn from_dotted(scope: &str) -> Self {
        Self::new(
            scope
                .split(SCOPE_DELIMITER)
                .filter(|segment| !segment.is_empty()),
        )
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fully qualified identifier for `name` within this scope
    pub fn qualify(&self, name: &str) -> String {
        let mut identifier = String::with_capacity(
            self.0.iter().map(|c| c.len() + 1).sum::<usize>() + name.len(),
        );
        for component in &self.0 {
            identifier.push_str(component);
            identifier.push(SCOPE_DELIMITER);
        }
        identifier.push_str(name);
        identifier
    }
}

impl fmt::Display for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SCOPE_DELIMITER)?;
            }
            f.write_str(component)?;
        }
        Ok(())
    }
}

/// "Named measurement now has a value"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    name: String,
    value: MetricValue,
    owner: LabelPath,
}

impl Notification {
    pub fn new(owner: LabelPath, name: impl Into<String>, value: MetricValue) -> Self {
        Self {
            name: name.into(),
            value,
            owner,
        }
    }

    /// Metric name relative to its owner
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn owner(&self) -> &LabelPath {
        &self.owner
    }

    /// Name the tracker matches against: owner scope plus metric name
    pub fn identifier(&self) -> String {
        self.owner.qualify(&self.name)
    }
}
