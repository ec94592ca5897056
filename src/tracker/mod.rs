//! Multi-pattern completion tracking
//!
//! A [`PatternSet`] defines what must be seen, a [`MatchTracker`] records what
//! has been seen, and its [`CompletionHandle`] resolves once everything has.

pub mod completion;
pub mod match_tracker;
pub mod pattern;
pub mod pattern_set;

pub use completion::{CompletionHandle, CompletionState};
pub use match_tracker::{MatchTracker, PatternReport, TrackerReport};
pub use pattern::{
    ExactMatcher, GlobMatcher, MatchKind, NameMatcher, Pattern, PrefixMatcher, WILDCARD,
};
pub use pattern_set::PatternSet;
