//! Expected-name patterns
//!
//! A [`Pattern`] wraps a [`NameMatcher`] so the tracker never depends on a
//! particular matching strategy. Three strategies ship with the crate:
//! - [`GlobMatcher`]: `*` matches any substring, everything else is literal
//! - [`ExactMatcher`]: string equality
//! - [`PrefixMatcher`]: `starts_with`

use crate::error::{AppError, AppResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Wildcard token recognised by [`GlobMatcher`]
pub const WILDCARD: char = '*';

/// Matching strategy selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    #[default]
    Glob,
    Exact,
    Prefix,
}

impl MatchKind {
    /// Convert to string representation for logging and serialization
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glob => "glob",
            Self::Exact => "exact",
            Self::Prefix => "prefix",
        }
    }
}

/// Predicate over notification names
///
/// Implementations must be case-sensitive and side-effect free; the tracker
/// calls `matches` from arbitrary producer threads.
pub trait NameMatcher: Send + Sync + fmt::Debug {
    /// Returns true if `name` satisfies this matcher
    fn matches(&self, name: &str) -> bool;

    /// The pattern text this matcher was built from
    fn source(&self) -> &str;

    /// Which strategy this matcher implements
    fn kind(&self) -> MatchKind;
}

/// Glob matcher backed by an anchored regex
///
/// `System.Network.*ReceiveRate` becomes `^System\.Network\..*ReceiveRate$`.
#[derive(Debug)]
pub struct GlobMatcher {
    source: String,
    regex: Regex,
}

impl GlobMatcher {
    /// Compile a glob into an anchored regex
    ///
    /// # Errors
    /// Returns `AppError::InvalidPattern` if the translated regex fails to compile
    /// (in practice only when it exceeds the regex size limit).
    pub fn new(source: impl Into<String>) -> AppResult<Self> {
        let source = source.into();
        let regex = Regex::new(&glob_to_regex(&source)).map_err(|e| AppError::InvalidPattern {
            pattern: source.clone(),
            source: e,
        })?;
        Ok(Self { source, regex })
    }

    /// The compiled regex, exposed for diagnostics
    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl NameMatcher for GlobMatcher {
    fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Glob
    }
}

/// Translate a glob into an anchored regex, escaping every literal fragment
pub fn glob_to_regex(glob: &str) -> String {
    let body = glob
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("^{}$", body)
}

#[derive(Debug)]
pub struct ExactMatcher(String);

impl ExactMatcher {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

impl NameMatcher for ExactMatcher {
    fn matches(&self, name: &str) -> bool {
        name == self.0
    }

    fn source(&self) -> &str {
        &self.0
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Exact
    }
}

#[derive(Debug)]
pub struct PrefixMatcher(String);

impl PrefixMatcher {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

impl NameMatcher for PrefixMatcher {
    fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.0)
    }

    fn source(&self) -> &str {
        &self.0
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Prefix
    }
}

/// An immutable expected-name pattern
///
/// Cheap to clone. Two patterns are equal when they share both kind and text,
/// so `"a.*"` as a glob and `"a.*"` as an exact string are distinct.
#[derive(Clone)]
pub struct Pattern {
    matcher: Arc<dyn NameMatcher>,
}

impl Pattern {
    /// Build a pattern of the given kind
    pub fn new(kind: MatchKind, source: impl Into<String>) -> AppResult<Self> {
        match kind {
            MatchKind::Glob => Self::glob(source),
            MatchKind::Exact => Ok(Self::exact(source)),
            MatchKind::Prefix => Ok(Self::prefix(source)),
        }
    }

    pub fn glob(source: impl Into<String>) -> AppResult<Self> {
        Ok(Self::from_matcher(GlobMatcher::new(source)?))
    }

    pub fn exact(source: impl Into<String>) -> Self {
        Self::from_matcher(ExactMatcher::new(source))
    }

    pub fn prefix(source: impl Into<String>) -> Self {
        Self::from_matcher(PrefixMatcher::new(source))
    }

    /// Wrap a custom matching strategy
    pub fn from_matcher(matcher: impl NameMatcher + 'static) -> Self {
        Self {
            matcher: Arc::new(matcher),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.matcher.matches(name)
    }

    pub fn as_str(&self) -> &str {
        self.matcher.source()
    }

    pub fn kind(&self) -> MatchKind {
        self.matcher.kind()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.as_str().hash(state);
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern")
            .field(&self.kind().as_str())
            .field(&self.as_str())
            .finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
