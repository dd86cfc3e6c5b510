//! Weighted regex rule store.
//!
//! Rules are loaded from a JSON file of the form
//! `{"patterns": [{"regex": "...", "category": "...", "score": 2.0,
//! "language": "de", "parent": "insurance"}, ...]}`.
//! A single bad regex is skipped with a warning; an unreadable file or a
//! malformed top level is a fatal configuration error.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::warn;

use shelfmark_core::{Error, Language, Result};

/// Compiled-pattern size limit. Rules come from external configuration, so
/// cap what a single pattern may expand to.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// One weighted classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    pub category: String,
    pub score: f64,
    pub language: Option<Language>,
    pub parent: Option<String>,
}

/// Ordered rule sequence with derived category views.
///
/// Order matters for the parent map: later rules overwrite earlier parent
/// assignments for the same category.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    parent_map: HashMap<String, String>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut parent_map = HashMap::new();
        for rule in &rules {
            if let Some(parent) = &rule.parent {
                parent_map.insert(rule.category.clone(), parent.clone());
            }
        }
        Self { rules, parent_map }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Category → parent mapping (a category has 0 or 1 parent).
    pub fn parent_map(&self) -> &HashMap<String, String> {
        &self.parent_map
    }

    pub fn parent_of(&self, category: &str) -> Option<&str> {
        self.parent_map.get(category).map(String::as_str)
    }

    /// Every configured category, zero-weight rules included.
    pub fn all_categories(&self) -> BTreeSet<String> {
        self.rules.iter().map(|r| r.category.clone()).collect()
    }
}

#[derive(Deserialize)]
struct RawRuleFile {
    #[serde(default)]
    patterns: Vec<RawRuleEntry>,
}

#[derive(Deserialize)]
struct RawRuleEntry {
    regex: Option<String>,
    category: Option<String>,
    #[serde(default)]
    score: serde_json::Value,
    language: Option<String>,
    parent: Option<String>,
}

/// Parse a score value tolerantly: number or numeric string. Anything else
/// (including a missing field) defaults to 0.0 — the rule still participates
/// in category-existence checks.
fn parse_score(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_entries(entries: Vec<RawRuleEntry>, source: &Path) -> Vec<Rule> {
    let mut rules = Vec::with_capacity(entries.len());
    for entry in entries {
        let (Some(regex_src), Some(category)) = (entry.regex, entry.category) else {
            continue;
        };
        let pattern = match RegexBuilder::new(&regex_src)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
        {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    "Invalid regex skipped in {}: {:?} ({})",
                    source.display(),
                    regex_src,
                    e
                );
                continue;
            }
        };
        let language = entry.language.as_deref().and_then(Language::parse);
        let parent = entry
            .parent
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        rules.push(Rule {
            pattern,
            category,
            score: parse_score(&entry.score),
            language,
            parent,
        });
    }
    rules
}

/// Load rules from a JSON file. Fatal on unreadable file or malformed top
/// level; a renamer cannot proceed with zero classification rules in a way
/// that silently looks like "everything is unknown".
pub fn load_rules(path: &Path) -> Result<RuleSet> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("could not read rule file {}: {}", path.display(), e))
    })?;
    let file: RawRuleFile = serde_json::from_str(&raw).map_err(|e| {
        Error::Config(format!("invalid JSON in rule file {}: {}", path.display(), e))
    })?;
    Ok(RuleSet::new(parse_entries(file.patterns, path)))
}

/// Load the base rule file plus a `<stem>.<lang>.json` overlay when present.
///
/// Overlay rules are appended after the base rules, so they win ties in the
/// parent-map derivation.
pub fn load_rules_for_language(path: &Path, language: Language) -> Result<RuleSet> {
    let base = load_rules(path)?;
    let overlay_path = overlay_path_for(path, language);
    if !overlay_path.is_file() {
        return Ok(base);
    }
    let overlay = load_rules(&overlay_path)?;
    let mut rules = base.rules;
    rules.extend(overlay.rules);
    Ok(RuleSet::new(rules))
}

fn overlay_path_for(path: &Path, language: Language) -> std::path::PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.json", stem, language.as_str()))
}
