//! Shelfmark Classify — the category resolution engine.
//!
//! A deterministic regex-weighted scorer (`scorer`) is arbitrated against a
//! language-model classifier through a fixed nine-step conflict policy
//! (`resolver`). Rules come from JSON configuration (`rules`), LLM free-text
//! output is mapped into the rule vocabulary by an alias table (`alias`).

pub mod alias;
pub mod cache;
pub mod resolver;
pub mod rules;
pub mod scorer;

pub use alias::AliasTable;
pub use cache::ScorerCache;
pub use resolver::{resolve_category, ResolveOptions};
pub use rules::{load_rules, load_rules_for_language, Rule, RuleSet};
pub use scorer::{display_category, Classification, ScoreOptions, Scorer, UNKNOWN_CATEGORY};
