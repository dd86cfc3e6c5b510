//! Shared enums used across the pipeline.

use serde::{Deserialize, Serialize};

/// Prompt and rule language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    En,
}

impl Language {
    /// Parse a language code. Unknown codes yield None (treated as "any").
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "de" => Some(Language::De),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::En => "en",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::De
    }
}

/// Filename case format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseStyle {
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "kebabCase")]
    Kebab,
    #[serde(rename = "snakeCase")]
    Snake,
}

impl CaseStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "camelCase" => Some(CaseStyle::Camel),
            "kebabCase" => Some(CaseStyle::Kebab),
            "snakeCase" => Some(CaseStyle::Snake),
            _ => None,
        }
    }

    /// Separator between filename parts ("_" for snake, "-" otherwise).
    pub fn separator(&self) -> &'static str {
        match self {
            CaseStyle::Snake => "_",
            _ => "-",
        }
    }
}

impl Default for CaseStyle {
    fn default() -> Self {
        CaseStyle::Kebab
    }
}

/// How a resolved category is rendered in the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStyle {
    Specific,
    WithParent,
    ParentOnly,
}

impl DisplayStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "specific" => Some(DisplayStyle::Specific),
            "with_parent" => Some(DisplayStyle::WithParent),
            "parent_only" => Some(DisplayStyle::ParentOnly),
            _ => None,
        }
    }
}

impl Default for DisplayStyle {
    fn default() -> Self {
        DisplayStyle::Specific
    }
}

/// Ambiguous-numeric-date disambiguation: day-first or month-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateLocale {
    Dmy,
    Mdy,
}

impl Default for DateLocale {
    fn default() -> Self {
        DateLocale::Dmy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!(Language::parse("de"), Some(Language::De));
        assert_eq!(Language::parse(" EN "), Some(Language::En));
        assert_eq!(Language::parse("fr"), None);
    }

    #[test]
    fn test_case_style_separator() {
        assert_eq!(CaseStyle::Snake.separator(), "_");
        assert_eq!(CaseStyle::Kebab.separator(), "-");
        assert_eq!(CaseStyle::Camel.separator(), "-");
    }

    #[test]
    fn test_display_style_parse() {
        assert_eq!(DisplayStyle::parse("with_parent"), Some(DisplayStyle::WithParent));
        assert_eq!(DisplayStyle::parse("bogus"), None);
    }
}
