//! Immutable, ordered set of expected patterns

use super::pattern::{MatchKind, Pattern};
use crate::error::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Arc;

/// An ordered, deduplicated collection of [`Pattern`]s
///
/// Built once at startup and shared between reporters. Never empty: a tracker
/// with nothing to wait for would resolve immediately, which is a configuration
/// mistake rather than a useful check.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Arc<[Pattern]>,
}

impl PatternSet {
    /// Build from an arbitrary list, keeping the first occurrence of each pattern
    ///
    /// # Errors
    /// Returns `AppError::Config` if the input is empty.
    pub fn new<I>(patterns: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = Pattern>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<Pattern> = patterns
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();

        if unique.is_empty() {
            return Err(AppError::Config(
                "expected pattern set is empty; at least one pattern is required".to_string(),
            ));
        }

        Ok(Self {
            patterns: unique.into(),
        })
    }

    /// Build `prefix + name` for every prefix and name, prefix-major
    ///
    /// `["taskmanager.", "jobmanager."] × ["System.CPU.Idle"]` yields
    /// `taskmanager.System.CPU.Idle`, then `jobmanager.System.CPU.Idle`.
    pub fn from_cross_product<P, N>(prefixes: &[P], names: &[N], kind: MatchKind) -> AppResult<Self>
    where
        P: AsRef<str>,
        N: AsRef<str>,
    {
        let mut patterns = Vec::with_capacity(prefixes.len() * names.len());
        for prefix in prefixes {
            for name in names {
                patterns.push(Pattern::new(
                    kind,
                    format!("{}{}", prefix.as_ref(), name.as_ref()),
                )?);
            }
        }
        Self::new(patterns)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Always false for a constructed set; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pattern> {
        self.patterns.iter()
    }

    pub fn as_slice(&self) -> &[Pattern] {
        &self.patterns
    }
}

impl<'a> IntoIterator for &'a PatternSet {
    type Item = &'a Pattern;
    type IntoIter = std::slice::Iter<'a, Pattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
