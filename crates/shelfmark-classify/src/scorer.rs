//! Heuristic scorer — regex-weighted category scoring with confidence gap.

use std::collections::HashMap;

use tracing::debug;

use shelfmark_core::{DisplayStyle, Language};

use crate::rules::RuleSet;

/// Sentinel for "no rule matched" or "confidence gap requirement not met".
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Knobs for one scoring pass.
#[derive(Debug, Clone, Default)]
pub struct ScoreOptions {
    pub language: Option<Language>,
    /// Matches starting within the first N chars get `title_weight_factor`.
    pub title_weight_region: usize,
    pub title_weight_factor: f64,
    /// Per-category ceiling, applied after accumulation.
    pub max_score_per_category: Option<f64>,
}

/// Best / runner-up outcome for one scored text.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub category: String,
    pub score: f64,
    pub runner_up_category: String,
    pub runner_up_score: f64,
}

impl Classification {
    fn unknown() -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            score: 0.0,
            runner_up_category: UNKNOWN_CATEGORY.to_string(),
            runner_up_score: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }

    /// Confidence gap between best and runner-up (0 when unknown).
    pub fn gap(&self) -> f64 {
        if self.is_unknown() {
            0.0
        } else {
            self.score - self.runner_up_score
        }
    }
}

/// Byte offset of the char at index `chars` (text length when shorter).
/// Region limits are configured in characters; regex matches report bytes.
fn char_boundary(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

/// Heuristic scorer over a loaded rule set. Read-only after construction,
/// safe to share across worker threads.
#[derive(Debug, Clone)]
pub struct Scorer {
    rules: RuleSet,
}

impl Scorer {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Score a text against every rule. First match only — repeated
    /// occurrences of the same phrase do not multiply the score.
    pub fn score_text(&self, text: &str, options: &ScoreOptions) -> HashMap<String, f64> {
        let mut scores: HashMap<String, f64> = HashMap::new();
        let region_end = if options.title_weight_region > 0 {
            char_boundary(text, options.title_weight_region)
        } else {
            0
        };
        for rule in self.rules.rules() {
            if let (Some(requested), Some(rule_lang)) = (options.language, rule.language) {
                if requested != rule_lang {
                    continue;
                }
            }
            let Some(m) = rule.pattern.find(text) else {
                continue;
            };
            let weight = if options.title_weight_region > 0 && m.start() < region_end {
                options.title_weight_factor
            } else {
                1.0
            };
            *scores.entry(rule.category.clone()).or_insert(0.0) += rule.score * weight;
        }
        if let Some(cap) = options.max_score_per_category {
            for score in scores.values_mut() {
                if *score > cap {
                    *score = cap;
                }
            }
        }
        scores
    }

    /// Categories ranked best-first: score descending, parent-attached
    /// before parentless at equal score, then name for determinism.
    fn ranked_categories(&self, text: &str, options: &ScoreOptions) -> Vec<(String, f64)> {
        let scores = self.score_text(text, options);
        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_has_parent = self.rules.parent_of(&a.0).is_some();
                    let b_has_parent = self.rules.parent_of(&b.0).is_some();
                    b_has_parent.cmp(&a_has_parent)
                })
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked
    }

    /// Best category with confidence. When `min_score_gap > 0` and the
    /// best-to-runner-up gap falls short, the whole result is downgraded to
    /// the unknown sentinel: a close call is worse than admitting ignorance.
    pub fn best_category_with_confidence(
        &self,
        text: &str,
        options: &ScoreOptions,
        min_score_gap: f64,
    ) -> Classification {
        let ranked = self.ranked_categories(text, options);
        if ranked.is_empty() {
            return Classification::unknown();
        }
        let (best_cat, best_score) = ranked[0].clone();
        let (runner_cat, runner_score) = ranked
            .get(1)
            .cloned()
            .unwrap_or_else(|| (UNKNOWN_CATEGORY.to_string(), 0.0));
        if min_score_gap > 0.0 && (best_score - runner_score) < min_score_gap {
            debug!(
                "Heuristic gap {:.2} below minimum {:.2} (best={}, runner_up={}); returning unknown",
                best_score - runner_score,
                min_score_gap,
                best_cat,
                runner_cat
            );
            return Classification::unknown();
        }
        debug!(
            "Heuristic best={} ({:.2}), runner_up={} ({:.2})",
            best_cat, best_score, runner_cat, runner_score
        );
        Classification {
            category: best_cat,
            score: best_score,
            runner_up_category: runner_cat,
            runner_up_score: runner_score,
        }
    }

    /// Top-N category names, most confident first. No gap suppression: these
    /// are candidate suggestions for the LLM, where more context is better.
    pub fn top_n_categories(&self, text: &str, n: usize, options: &ScoreOptions) -> Vec<String> {
        self.ranked_categories(text, options)
            .into_iter()
            .take(n)
            .map(|(cat, _)| cat)
            .collect()
    }
}

/// Render a category for display according to the configured style.
///
/// Unknown / empty / placeholder categories pass through unchanged.
pub fn display_category(category: &str, style: DisplayStyle, rules: &RuleSet) -> String {
    if category.is_empty() || category == UNKNOWN_CATEGORY || crate::alias::is_placeholder(category)
    {
        return category.to_string();
    }
    match style {
        DisplayStyle::Specific => category.to_string(),
        DisplayStyle::ParentOnly => rules
            .parent_of(category)
            .unwrap_or(category)
            .to_string(),
        DisplayStyle::WithParent => match rules.parent_of(category) {
            Some(parent) => format!("{}_{}", parent, category),
            None => category.to_string(),
        },
    }
}
