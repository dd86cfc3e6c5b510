//! Category alias table.
//!
//! Maps free-text LLM output into the heuristic rule vocabulary. Keys are
//! normalized (lowercase, spaces → underscores); unmapped inputs pass through
//! unchanged.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use shelfmark_core::{Error, Result};

/// Values meaning "the LLM declined to answer".
const PLACEHOLDERS: [&str; 4] = ["document", "unknown", "na", ""];

/// Whether a (normalized or raw) category value counts as "no answer".
pub fn is_placeholder(category: &str) -> bool {
    let normalized = normalize_key(category);
    PLACEHOLDERS.contains(&normalized.as_str())
}

/// Lowercase, trim, spaces → underscores.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Configuration-driven alias mapping.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

#[derive(Deserialize)]
struct RawAliasFile {
    #[serde(default)]
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        Self { aliases }
    }

    /// Load from a JSON file `{"aliases": {"rechnung": "invoice", ...}}`.
    /// A missing file yields an empty table with a warning; malformed JSON is
    /// a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Alias file {} not readable ({}); using empty alias table",
                    path.display(),
                    e
                );
                return Ok(Self::default());
            }
        };
        let file: RawAliasFile = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid JSON in alias file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(file.aliases))
    }

    /// Normalize an LLM category guess into the heuristic vocabulary.
    /// Unmapped inputs pass through in normalized form.
    pub fn normalize(&self, raw: &str) -> String {
        let key = normalize_key(raw);
        self.aliases.get(&key).cloned().unwrap_or(key)
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table() -> AliasTable {
        let mut aliases = HashMap::new();
        aliases.insert("rechnung".to_string(), "invoice".to_string());
        aliases.insert("Lohnabrechnung".to_string(), "payslip".to_string());
        AliasTable::new(aliases)
    }

    #[test]
    fn test_normalize_maps_aliases() {
        let t = table();
        assert_eq!(t.normalize("Rechnung"), "invoice");
        assert_eq!(t.normalize("lohnabrechnung"), "payslip");
    }

    #[test]
    fn test_unmapped_passes_through_normalized() {
        let t = table();
        assert_eq!(t.normalize("Motor Insurance"), "motor_insurance");
        assert_eq!(t.normalize("something_else"), "something_else");
    }

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder("document"));
        assert!(is_placeholder("Unknown"));
        assert!(is_placeholder(" na "));
        assert!(is_placeholder(""));
        assert!(!is_placeholder("invoice"));
    }

    #[test]
    fn test_load_missing_file_is_empty_table() {
        let t = AliasTable::load(Path::new("/nonexistent/aliases.json")).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn test_load_malformed_is_fatal() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "not json").unwrap();
        assert!(matches!(AliasTable::load(f.path()), Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"aliases": {{"Kfz Versicherung": "motor_insurance"}}}}"#).unwrap();
        let t = AliasTable::load(f.path()).unwrap();
        assert_eq!(t.normalize("kfz versicherung"), "motor_insurance");
    }
}
