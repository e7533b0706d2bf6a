//! Rule evaluation engine for logsieve
//!
//! This crate provides pattern matching, rule sets, per-line evaluation,
//! filter file persistence, and the shared filter store.

mod error;
mod evaluator;
mod matcher;
mod persist;
mod process_colors;
mod rule;
mod rule_set;
mod store;

pub use error::{FilterError, PatternError, StoreError};
pub use evaluator::{EvalStats, Highlight, evaluate, evaluate_counted, highlights};
pub use matcher::Matcher;
pub use persist::{Format, read_file, write_file};
pub use process_colors::ProcessColors;
pub use rule::Rule;
pub use rule_set::{RuleList, RuleSet};
pub use store::FilterStore;

// Re-export types used in our public API
pub use logsieve_types::{
    Decision, HIGHLIGHT_COLORS, LogLine, MatchType, Rgb, RuleDef, RuleKind, Target,
};
