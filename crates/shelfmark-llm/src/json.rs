//! Tolerant JSON-field extraction from LLM responses.
//!
//! LLMs wrap their JSON in code fences, prefix it with prose, and leave
//! quotes unescaped inside string values. `extract_json_object` recovers the
//! first balanced object by brace matching; `parse_field` pulls a string or
//! list-of-strings value out of it, with a quote-escaping repair pass and an
//! optional regex scrape for responses with no recoverable object at all.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// A successfully extracted field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<String>> {
        match self {
            FieldValue::List(items) => Some(items),
            FieldValue::Text(_) => None,
        }
    }
}

/// Why a field could not be extracted. Expected outcomes, not faults — the
/// worst case downstream is an "unknown" category or an empty summary.
#[derive(Debug, Error, PartialEq)]
pub enum FieldParseError {
    #[error("no JSON object in response")]
    NoObject,
    #[error("key {0:?} missing from JSON object")]
    MissingKey(String),
    #[error("value for key {0:?} is empty or a placeholder")]
    EmptyValue(String),
    #[error("value for key {0:?} has an unsupported type")]
    WrongType(String),
}

/// Extract the first balanced `{...}` object from a response, tolerating
/// code fences and leading prose. Returns the object substring.
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in response[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Escape unescaped quotes inside the string value for `key`. Best-effort
/// repair for the most common LLM formatting defect.
fn repair_quotes(object: &str, key: &str) -> String {
    let pattern = format!(r#"("{}":\s*")(.*?)(")"#, regex::escape(key));
    let Ok(re) = Regex::new(&format!("(?s){}", pattern)) else {
        return object.to_string();
    };
    let repaired = re
        .replace(object, |caps: &regex::Captures| {
            let value = caps[2].replace('"', "\\\"");
            format!("{}{}{}", &caps[1], value, &caps[3])
        })
        .into_owned();

    // Unescaped quotes may have prematurely closed the value. Salvage by
    // treating everything up to the last quote before the closing brace as
    // the value (the prompts only ask for single-field objects).
    if serde_json::from_str::<serde_json::Value>(&repaired).is_ok() {
        return repaired;
    }
    let Some(key_idx) = repaired.find(&format!("\"{}\"", key)) else {
        return repaired;
    };
    let Some(colon_idx) = repaired[key_idx..].find(':').map(|i| key_idx + i) else {
        return repaired;
    };
    let Some(first_quote) = repaired[colon_idx..].find('"').map(|i| colon_idx + i) else {
        return repaired;
    };
    let Some(close_brace) = repaired.rfind('}') else {
        return repaired;
    };
    let Some(last_quote) = repaired[..close_brace].rfind('"').filter(|&q| q > first_quote) else {
        return repaired;
    };
    let value = repaired[first_quote + 1..last_quote]
        .replace("\\\"", "\"")
        .replace('"', "\\\"");
    format!(
        "{}{}{}",
        &repaired[..first_quote + 1],
        value,
        &repaired[last_quote..]
    )
}

static SCRAPE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""?([^",}\n]+)"?"#).expect("static regex"));

/// Last-ditch scrape for `key: value` shapes when no JSON object can be
/// recovered. Lenient mode only.
fn scrape_field(response: &str, key: &str) -> Option<String> {
    let key_re = Regex::new(&format!(r#"(?i)"?{}"?\s*[:=]\s*"#, regex::escape(key))).ok()?;
    let m = key_re.find(response)?;
    let rest = &response[m.end()..];
    let value = SCRAPE_VALUE.captures(rest)?.get(1)?.as_str().trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn value_from_json(
    data: &serde_json::Value,
    key: &str,
) -> Result<FieldValue, FieldParseError> {
    let value = data
        .get(key)
        .ok_or_else(|| FieldParseError::MissingKey(key.to_string()))?;
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("na") {
                Err(FieldParseError::EmptyValue(key.to_string()))
            } else {
                Ok(FieldValue::Text(trimmed.to_string()))
            }
        }
        serde_json::Value::Array(items) => {
            let mut cleaned = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str() {
                    Some(s) if !s.trim().is_empty() => cleaned.push(s.trim().to_string()),
                    Some(_) => {}
                    None => return Err(FieldParseError::WrongType(key.to_string())),
                }
            }
            if cleaned.is_empty() {
                Err(FieldParseError::EmptyValue(key.to_string()))
            } else {
                Ok(FieldValue::List(cleaned))
            }
        }
        _ => Err(FieldParseError::WrongType(key.to_string())),
    }
}

/// Extract the value for `key` from a response. Tries the recovered JSON
/// object first (with quote repair); in lenient mode, falls back to a
/// regex `key: value` scrape when no object can be recovered at all.
pub fn parse_field(
    response: &str,
    key: &str,
    lenient: bool,
) -> Result<FieldValue, FieldParseError> {
    let Some(object) = extract_json_object(response) else {
        if lenient {
            if let Some(value) = scrape_field(response, key) {
                if !value.eq_ignore_ascii_case("na") {
                    return Ok(FieldValue::Text(value));
                }
            }
        }
        return Err(FieldParseError::NoObject);
    };

    let data = match serde_json::from_str::<serde_json::Value>(object) {
        Ok(data) => data,
        Err(_) => serde_json::from_str(&repair_quotes(object, key))
            .map_err(|_| FieldParseError::NoObject)?,
    };
    value_from_json(&data, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_object() {
        assert_eq!(
            extract_json_object(r#"{"summary":"ok"}"#),
            Some(r#"{"summary":"ok"}"#)
        );
    }

    #[test]
    fn test_extract_fenced_object() {
        let response = "```json\n{\"category\":\"invoice\"}\n```";
        assert_eq!(extract_json_object(response), Some(r#"{"category":"invoice"}"#));
    }

    #[test]
    fn test_extract_with_leading_prose() {
        let response = "Sure! Here is the JSON you asked for: {\"summary\":\"a {nested} value\"} hope it helps";
        assert_eq!(
            extract_json_object(response),
            Some(r#"{"summary":"a {nested} value"}"#)
        );
    }

    #[test]
    fn test_extract_braces_inside_strings_ignored() {
        let response = r#"{"summary":"open { brace"}"#;
        assert_eq!(extract_json_object(response), Some(response));
    }

    #[test]
    fn test_extract_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{unterminated"), None);
    }

    #[test]
    fn test_parse_text_field() {
        let value = parse_field(r#"{"summary":"  An invoice.  "}"#, "summary", false).unwrap();
        assert_eq!(value, FieldValue::Text("An invoice.".to_string()));
    }

    #[test]
    fn test_parse_list_field() {
        let value =
            parse_field(r#"{"keywords":["a", " b ", ""]}"#, "keywords", false).unwrap();
        assert_eq!(
            value,
            FieldValue::List(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_parse_na_is_empty_value() {
        assert_eq!(
            parse_field(r#"{"summary":"na"}"#, "summary", false),
            Err(FieldParseError::EmptyValue("summary".to_string()))
        );
    }

    #[test]
    fn test_parse_missing_key() {
        assert_eq!(
            parse_field(r#"{"other":"x"}"#, "summary", false),
            Err(FieldParseError::MissingKey("summary".to_string()))
        );
    }

    #[test]
    fn test_parse_wrong_type() {
        assert_eq!(
            parse_field(r#"{"summary": 42}"#, "summary", false),
            Err(FieldParseError::WrongType("summary".to_string()))
        );
    }

    #[test]
    fn test_quote_repair() {
        let response = r#"{"summary":"He said "hello" twice"}"#;
        let value = parse_field(response, "summary", false).unwrap();
        assert_eq!(
            value,
            FieldValue::Text(r#"He said "hello" twice"#.to_string())
        );
    }

    #[test]
    fn test_lenient_scrape_without_object() {
        let value = parse_field("category: invoice", "category", true).unwrap();
        assert_eq!(value, FieldValue::Text("invoice".to_string()));
    }

    #[test]
    fn test_strict_mode_rejects_scrape() {
        assert_eq!(
            parse_field("category: invoice", "category", false),
            Err(FieldParseError::NoObject)
        );
    }
}
