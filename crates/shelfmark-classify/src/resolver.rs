//! Category resolver — arbitration between the heuristic and LLM classifiers.
//!
//! A pure function over an options bundle. The nine decision rules are
//! evaluated in a fixed order and the first applicable one wins; each rule
//! assumes the earlier ones did not fire. Agreement and override detectors
//! (rules 4–7) run before any voting heuristic gets a chance to contradict a
//! confident or structurally-compatible signal.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use shelfmark_embed::SimilarityBackend;

use crate::alias::{is_placeholder, AliasTable};
use crate::scorer::UNKNOWN_CATEGORY;

/// Per-call options for category resolution.
pub struct ResolveOptions<'a> {
    /// Last-resort preference when nothing else decides (rule 9).
    pub prefer_llm_on_conflict: bool,
    /// Heuristic best score / gap, when the heuristic had an opinion.
    pub heuristic_score: Option<f64>,
    pub heuristic_gap: Option<f64>,
    /// Below this score the heuristic forfeits the conflict (rule 2).
    pub min_heuristic_score: f64,
    /// High-confidence override thresholds (rule 4). Both must be set.
    pub override_min_score: Option<f64>,
    pub override_min_gap: Option<f64>,
    /// Bonus factor for the heuristic in keyword-overlap voting.
    pub score_weight: f64,
    /// Summary + keywords text used for overlap / similarity voting.
    pub overlap_context: Option<&'a str>,
    pub use_keyword_overlap: bool,
    pub use_embedding_similarity: bool,
    pub parent_map: &'a HashMap<String, String>,
    pub aliases: &'a AliasTable,
    /// Injected optional capability; absence degrades to keyword overlap.
    pub similarity: Option<&'a dyn SimilarityBackend>,
}

impl Default for ResolveOptions<'_> {
    fn default() -> Self {
        static EMPTY_MAP: std::sync::OnceLock<HashMap<String, String>> = std::sync::OnceLock::new();
        static EMPTY_ALIASES: std::sync::OnceLock<AliasTable> = std::sync::OnceLock::new();
        Self {
            prefer_llm_on_conflict: true,
            heuristic_score: None,
            heuristic_gap: None,
            min_heuristic_score: 0.0,
            override_min_score: None,
            override_min_gap: None,
            score_weight: 0.15,
            overlap_context: None,
            use_keyword_overlap: false,
            use_embedding_similarity: false,
            parent_map: EMPTY_MAP.get_or_init(HashMap::new),
            aliases: EMPTY_ALIASES.get_or_init(AliasTable::default),
            similarity: None,
        }
    }
}

/// Resolve the final category from the raw LLM guess and the heuristic best.
pub fn resolve_category(llm_raw: &str, heuristic: &str, options: &ResolveOptions) -> String {
    let llm = options.aliases.normalize(llm_raw);

    // 1. Heuristic has no opinion: take the LLM answer. If even the
    //    normalized answer is a placeholder, preserve whatever the caller
    //    originally passed rather than fabricating "unknown".
    if heuristic == UNKNOWN_CATEGORY {
        let result = if !is_placeholder(&llm) {
            llm
        } else {
            llm_raw.to_string()
        };
        debug!("Resolve: heuristic unknown, using LLM category {:?}", result);
        return result;
    }

    // 2. Heuristic confidence floor not met: forfeit the conflict entirely.
    if let Some(score) = options.heuristic_score {
        if score < options.min_heuristic_score {
            debug!(
                "Resolve: heuristic score {:.2} below floor {:.2}, using LLM category {:?}",
                score, options.min_heuristic_score, llm
            );
            return llm;
        }
    }

    // 3. LLM has no opinion.
    if is_placeholder(&llm) {
        debug!("Resolve: LLM declined, using heuristic category {:?}", heuristic);
        return heuristic.to_string();
    }

    // 4. High-confidence heuristic override, independent of the
    //    prefer-LLM switch.
    if let (Some(min_score), Some(min_gap)) = (options.override_min_score, options.override_min_gap)
    {
        let score = options.heuristic_score.unwrap_or(0.0);
        let gap = options.heuristic_gap.unwrap_or(0.0);
        if score >= min_score && gap >= min_gap {
            debug!(
                "Resolve: heuristic override (score {:.2} >= {:.2}, gap {:.2} >= {:.2}), using {:?}",
                score, min_score, gap, min_gap, heuristic
            );
            return heuristic.to_string();
        }
    }

    // 5. Exact agreement.
    if llm == heuristic {
        debug!("Resolve: exact agreement on {:?}", llm);
        return llm;
    }

    // 6. Parent/child agreement: one named the general case, the other the
    //    specific case. Return the more specific (heuristic) category.
    let heuristic_parent = options.parent_map.get(heuristic);
    let llm_parent = options.parent_map.get(&llm);
    if heuristic_parent.map(String::as_str) == Some(llm.as_str())
        || llm_parent.map(String::as_str) == Some(heuristic)
    {
        debug!(
            "Resolve: parent/child agreement (llm={:?}, heuristic={:?}), using heuristic",
            llm, heuristic
        );
        return heuristic.to_string();
    }

    // 7. Sibling agreement: same family, different leaf.
    if let (Some(hp), Some(lp)) = (heuristic_parent, llm_parent) {
        if hp == lp {
            debug!(
                "Resolve: sibling agreement under {:?} (llm={:?}, heuristic={:?}), using heuristic",
                hp, llm, heuristic
            );
            return heuristic.to_string();
        }
    }

    // 8. Context voting: embedding similarity first (when enabled and
    //    available), then keyword overlap.
    let context = options.overlap_context.unwrap_or("").trim();
    if !context.is_empty() && (options.use_embedding_similarity || options.use_keyword_overlap) {
        if options.use_embedding_similarity {
            if let Some(winner) = embedding_vote(context, &llm, heuristic, options.similarity) {
                return winner;
            }
        }
        if options.use_keyword_overlap {
            return keyword_overlap_vote(context, &llm, heuristic, options);
        }
    }

    // 9. Fallback preference.
    let result = if options.prefer_llm_on_conflict {
        llm
    } else {
        heuristic.to_string()
    };
    debug!(
        "Resolve: unresolved conflict, prefer_llm={}, using {:?}",
        options.prefer_llm_on_conflict, result
    );
    result
}

/// Embedding-similarity vote. None when the backend is unavailable or the
/// similarities tie — callers fall through to keyword overlap.
fn embedding_vote(
    context: &str,
    llm: &str,
    heuristic: &str,
    similarity: Option<&dyn SimilarityBackend>,
) -> Option<String> {
    let backend = similarity.filter(|b| b.is_available())?;
    let sim_llm = backend.similarity(context, llm)?;
    let sim_heuristic = backend.similarity(context, heuristic)?;
    if sim_llm > sim_heuristic {
        debug!(
            "Resolve: embedding vote llm {:.3} > heuristic {:.3}, using {:?}",
            sim_llm, sim_heuristic, llm
        );
        return Some(llm.to_string());
    }
    if sim_heuristic > sim_llm {
        debug!(
            "Resolve: embedding vote heuristic {:.3} > llm {:.3}, using {:?}",
            sim_heuristic, sim_llm, heuristic
        );
        return Some(heuristic.to_string());
    }
    None
}

/// Keyword-overlap vote: set-intersection counts between the context and
/// each candidate's token set, with a score-proportional bonus for the
/// heuristic. Strictly higher wins; an exact tie defaults to the heuristic.
fn keyword_overlap_vote(
    context: &str,
    llm: &str,
    heuristic: &str,
    options: &ResolveOptions,
) -> String {
    let context_tokens = tokenize(context);
    let llm_tokens = tokenize(llm);
    let heuristic_tokens = tokenize(heuristic);

    let llm_overlap = llm_tokens.intersection(&context_tokens).count() as f64;
    let heuristic_overlap = heuristic_tokens.intersection(&context_tokens).count() as f64
        + options.score_weight * options.heuristic_score.unwrap_or(0.0);

    debug!(
        "Resolve: keyword overlap llm={:.2} heuristic={:.2}",
        llm_overlap, heuristic_overlap
    );
    if llm_overlap > heuristic_overlap {
        llm.to_string()
    } else {
        heuristic.to_string()
    }
}

/// Lowercase alphanumeric token set, split on whitespace and underscores.
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| c.is_whitespace() || c == '_')
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfmark_embed::NoopSimilarity;

    fn parent_map() -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("motor_insurance".to_string(), "insurance".to_string());
        m.insert("health_insurance".to_string(), "insurance".to_string());
        m
    }

    fn aliases() -> AliasTable {
        let mut m = HashMap::new();
        m.insert("rechnung".to_string(), "invoice".to_string());
        AliasTable::new(m)
    }

    #[test]
    fn test_heuristic_unknown_uses_llm() {
        let options = ResolveOptions {
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(resolve_category("invoice", "unknown", &options), "invoice");
    }

    #[test]
    fn test_heuristic_unknown_llm_placeholder_preserves_raw() {
        let options = ResolveOptions::default();
        assert_eq!(resolve_category("Document", "unknown", &options), "Document");
        assert_eq!(resolve_category("", "unknown", &options), "");
    }

    #[test]
    fn test_heuristic_unknown_normalizes_through_aliases() {
        let aliases = aliases();
        let options = ResolveOptions {
            aliases: &aliases,
            ..Default::default()
        };
        assert_eq!(resolve_category("Rechnung", "unknown", &options), "invoice");
    }

    #[test]
    fn test_score_floor_forfeits_to_llm() {
        let options = ResolveOptions {
            heuristic_score: Some(1.0),
            min_heuristic_score: 2.0,
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "contract");

        let options = ResolveOptions {
            heuristic_score: Some(3.0),
            min_heuristic_score: 2.0,
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "invoice");
    }

    #[test]
    fn test_llm_placeholder_uses_heuristic() {
        let options = ResolveOptions::default();
        assert_eq!(resolve_category("na", "invoice", &options), "invoice");
        assert_eq!(resolve_category("document", "invoice", &options), "invoice");
        assert_eq!(resolve_category("", "invoice", &options), "invoice");
    }

    #[test]
    fn test_high_confidence_override_beats_prefer_llm() {
        let options = ResolveOptions {
            heuristic_score: Some(6.0),
            heuristic_gap: Some(3.0),
            override_min_score: Some(5.0),
            override_min_gap: Some(2.0),
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "invoice");
    }

    #[test]
    fn test_override_requires_both_thresholds_met() {
        let options = ResolveOptions {
            heuristic_score: Some(6.0),
            heuristic_gap: Some(1.0), // below min_gap
            override_min_score: Some(5.0),
            override_min_gap: Some(2.0),
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "contract");
    }

    #[test]
    fn test_exact_agreement_always_wins() {
        let options = ResolveOptions {
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(resolve_category("invoice", "invoice", &options), "invoice");
    }

    #[test]
    fn test_parent_child_agreement_returns_heuristic() {
        let map = parent_map();
        let options = ResolveOptions {
            parent_map: &map,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        // LLM named the general case, heuristic the specific one
        assert_eq!(
            resolve_category("insurance", "motor_insurance", &options),
            "motor_insurance"
        );
        // And the reverse orientation
        assert_eq!(
            resolve_category("motor_insurance", "insurance", &options),
            "insurance"
        );
    }

    #[test]
    fn test_sibling_agreement_returns_heuristic() {
        let map = parent_map();
        let options = ResolveOptions {
            parent_map: &map,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(
            resolve_category("health_insurance", "motor_insurance", &options),
            "motor_insurance"
        );
    }

    #[test]
    fn test_keyword_overlap_favors_heuristic() {
        let options = ResolveOptions {
            overlap_context: Some("Rechnungsnummer invoice total"),
            use_keyword_overlap: true,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(
            resolve_category("motor_insurance", "invoice", &options),
            "invoice"
        );
    }

    #[test]
    fn test_keyword_overlap_favors_llm_when_strictly_higher() {
        let options = ResolveOptions {
            overlap_context: Some("Kfz Versicherung premium motor insurance document"),
            use_keyword_overlap: true,
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(
            resolve_category("motor_insurance", "invoice", &options),
            "motor_insurance"
        );
    }

    #[test]
    fn test_keyword_overlap_tie_defaults_to_heuristic() {
        let options = ResolveOptions {
            overlap_context: Some("completely unrelated words"),
            use_keyword_overlap: true,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "invoice");
    }

    #[test]
    fn test_heuristic_score_bonus_tips_overlap() {
        // One overlapping token each; the score bonus breaks the tie the
        // heuristic's way even without it, so check the LLM needs a strictly
        // higher count to win.
        let options = ResolveOptions {
            overlap_context: Some("insurance invoice"),
            use_keyword_overlap: true,
            heuristic_score: Some(4.0),
            score_weight: 0.5,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(resolve_category("insurance", "invoice", &options), "invoice");
    }

    #[test]
    fn test_unavailable_embedding_degrades_to_overlap() {
        let noop = NoopSimilarity;
        let options = ResolveOptions {
            overlap_context: Some("Rechnungsnummer invoice total"),
            use_embedding_similarity: true,
            use_keyword_overlap: true,
            similarity: Some(&noop),
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(
            resolve_category("motor_insurance", "invoice", &options),
            "invoice"
        );
    }

    #[test]
    fn test_no_voting_without_context() {
        let options = ResolveOptions {
            overlap_context: Some("   "),
            use_keyword_overlap: true,
            prefer_llm_on_conflict: true,
            ..Default::default()
        };
        assert_eq!(resolve_category("contract", "invoice", &options), "contract");
    }

    #[test]
    fn test_fallback_preference_switch() {
        let prefer_llm = ResolveOptions::default();
        assert_eq!(resolve_category("contract", "invoice", &prefer_llm), "contract");

        let prefer_heuristic = ResolveOptions {
            prefer_llm_on_conflict: false,
            ..Default::default()
        };
        assert_eq!(
            resolve_category("contract", "invoice", &prefer_heuristic),
            "invoice"
        );
    }

    #[test]
    fn test_tokenize_splits_underscores_and_strips_punctuation() {
        let tokens = tokenize("Motor_Insurance premium, 2024!");
        assert!(tokens.contains("motor"));
        assert!(tokens.contains("insurance"));
        assert!(tokens.contains("premium"));
        assert!(tokens.contains("2024"));
    }
}
