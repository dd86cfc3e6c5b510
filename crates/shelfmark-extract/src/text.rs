//! Token utilities for filename assembly.

use once_cell::sync::Lazy;
use regex::Regex;

use shelfmark_core::CaseStyle;

static FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,_-]+").expect("static regex"));

/// Keyword values that are filler, not content.
const FILLER_KEYWORDS: [&str; 5] = ["...", "…", "na", "xxx", "w1"];
const MAX_KEYWORDS: usize = 7;

/// Normalize a token for filenames: trim, transliterate German umlauts,
/// strip forbidden characters, whitespace → underscores, lowercase.
/// Empty input becomes "na".
pub fn clean_token(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "na".to_string();
    }
    let text = text
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('Ä', "Ae")
        .replace('Ö', "Oe")
        .replace('Ü', "Ue")
        .replace('ß', "ss");
    let text = FORBIDDEN_CHARS.replace_all(&text, "");
    let text = WHITESPACE.replace_all(&text, "_");
    text.to_lowercase()
}

/// Join cleaned tokens in the desired case style.
pub fn convert_case(tokens: &[String], style: CaseStyle) -> String {
    let mut words: Vec<String> = tokens
        .iter()
        .map(|t| clean_token(t))
        .filter(|w| !w.is_empty() && w != "na")
        .collect();
    if style == CaseStyle::Camel {
        words = words
            .iter()
            .flat_map(|w| w.split('_'))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
    }
    if words.is_empty() {
        return String::new();
    }
    match style {
        CaseStyle::Camel => {
            let mut out = words[0].to_lowercase();
            for word in &words[1..] {
                let mut chars = word.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
            out
        }
        CaseStyle::Snake => words.join("_"),
        CaseStyle::Kebab => words.join("-"),
    }
}

/// Split on whitespace, commas, underscores, and hyphens.
pub fn split_to_tokens(text: &str) -> Vec<String> {
    TOKEN_SPLIT
        .split(text)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Two tokens are similar when equal, or one prefixes the other within a
/// 2-char length difference (catches singular/plural and case variants).
pub fn tokens_similar(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    if a == b {
        return true;
    }
    (a.starts_with(&b) || b.starts_with(&a)) && a.len().abs_diff(b.len()) <= 2
}

/// Drop tokens from `main` that are similar to any token in `remove`.
/// Used to keep summary tokens from repeating keyword tokens.
pub fn subtract_tokens(main: &[String], remove: &[String]) -> Vec<String> {
    let remove: Vec<&str> = remove
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    main.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| !remove.iter().any(|r| tokens_similar(t, r)))
        .map(str::to_string)
        .collect()
}

/// Strip filler keywords, dedupe case-insensitively, cap at 7.
pub fn normalize_keywords(raw: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for token in raw {
        let t = token.trim();
        if t.is_empty() {
            continue;
        }
        let lower = t.to_lowercase();
        if FILLER_KEYWORDS.contains(&lower.as_str()) || lower == "w2" {
            continue;
        }
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        out.push(t.to_string());
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_token_umlauts() {
        assert_eq!(clean_token("Überweisung"), "ueberweisung");
        assert_eq!(clean_token("Straße"), "strasse");
        assert_eq!(clean_token("Gehälter"), "gehaelter");
    }

    #[test]
    fn test_clean_token_forbidden_chars_and_whitespace() {
        assert_eq!(clean_token(r#"a/b\c:d"#), "abcd");
        assert_eq!(clean_token("two  words"), "two_words");
        assert_eq!(clean_token("  "), "na");
        assert_eq!(clean_token(""), "na");
    }

    #[test]
    fn test_convert_case() {
        let tokens = strings(&["Motor", "Insurance", "2024"]);
        assert_eq!(convert_case(&tokens, CaseStyle::Kebab), "motor-insurance-2024");
        assert_eq!(convert_case(&tokens, CaseStyle::Snake), "motor_insurance_2024");
        assert_eq!(convert_case(&tokens, CaseStyle::Camel), "motorInsurance2024");
    }

    #[test]
    fn test_convert_case_splits_underscores_for_camel() {
        let tokens = strings(&["motor_insurance", "claim"]);
        assert_eq!(convert_case(&tokens, CaseStyle::Camel), "motorInsuranceClaim");
    }

    #[test]
    fn test_convert_case_drops_na() {
        assert_eq!(convert_case(&strings(&["", "  "]), CaseStyle::Kebab), "");
    }

    #[test]
    fn test_split_to_tokens() {
        assert_eq!(
            split_to_tokens("a,b_c-d e"),
            strings(&["a", "b", "c", "d", "e"])
        );
        assert!(split_to_tokens("").is_empty());
    }

    #[test]
    fn test_tokens_similar() {
        assert!(tokens_similar("invoice", "Invoice"));
        assert!(tokens_similar("invoice", "invoices"));
        assert!(!tokens_similar("invoice", "receipt"));
        assert!(!tokens_similar("invoice", "invoice-number-long"));
    }

    #[test]
    fn test_subtract_tokens() {
        let main = strings(&["insurance", "premium", "2024"]);
        let remove = strings(&["Insurances", "2024"]);
        assert_eq!(subtract_tokens(&main, &remove), strings(&["premium"]));
    }

    #[test]
    fn test_normalize_keywords_filters_and_caps() {
        let raw = strings(&[
            "alpha", "na", "...", "beta", "Alpha", "xxx", "w1", "w2", "gamma", "delta", "epsilon",
            "zeta", "eta", "theta",
        ]);
        let normalized = normalize_keywords(&raw);
        assert_eq!(normalized.len(), 7);
        assert_eq!(normalized[0], "alpha");
        assert!(!normalized.contains(&"na".to_string()));
        // Case-insensitive dedupe kept the first "alpha" only
        assert_eq!(
            normalized.iter().filter(|k| k.to_lowercase() == "alpha").count(),
            1
        );
    }
}
