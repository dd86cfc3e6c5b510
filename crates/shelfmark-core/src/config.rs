//! Runtime configuration.
//!
//! `RenamerConfig` is loadable from a JSON file (field-wise defaults apply),
//! overridable by CLI flags at the composition root. The LLM endpoint can
//! additionally be overridden from `SHELFMARK_LLM_URL` / `SHELFMARK_LLM_MODEL`
//! / `SHELFMARK_LLM_TIMEOUT` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{CaseStyle, DateLocale, DisplayStyle, Language};

const DEFAULT_LLM_URL: &str = "http://127.0.0.1:11434/v1/completions";
const DEFAULT_LLM_MODEL: &str = "qwen3:8b";
const DEFAULT_LLM_TIMEOUT_S: f64 = 60.0;

/// Full renamer configuration. Every field has a default so partial JSON
/// config files work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamerConfig {
    pub language: Language,
    pub desired_case: CaseStyle,
    pub project: String,
    pub version: String,

    /// On unresolvable category conflict, prefer the LLM answer.
    pub prefer_llm_category: bool,
    pub date_locale: DateLocale,
    /// Prefer a date found within the first N chars (0 = whole text).
    pub date_prefer_leading_chars: usize,
    /// Fall back to PDF CreationDate/ModDate when content has no date.
    pub use_pdf_metadata_for_date: bool,
    pub dry_run: bool,

    // Heuristic scoring
    pub min_heuristic_score_gap: f64,
    pub min_heuristic_score: f64,
    /// Weight matches within the first N chars (0 = off).
    pub title_weight_region: usize,
    pub title_weight_factor: f64,
    pub max_score_per_category: Option<f64>,

    // Conflict arbitration
    pub use_keyword_overlap_for_category: bool,
    pub use_embeddings_for_conflict: bool,
    pub category_display: DisplayStyle,
    /// Skip the LLM category call when the heuristic is this confident.
    pub skip_llm_category_if_heuristic_score_ge: Option<f64>,
    pub skip_llm_category_if_heuristic_gap_ge: Option<f64>,
    /// Top-N heuristic categories suggested to the LLM.
    pub heuristic_suggestions_top_n: usize,
    /// Bonus for the heuristic in keyword-overlap comparison.
    pub heuristic_score_weight: f64,
    /// Override the LLM outright when score >= this and gap >= min_gap.
    pub heuristic_override_min_score: Option<f64>,
    pub heuristic_override_min_gap: Option<f64>,
    /// Pass the full category list to the LLM and reject answers outside it.
    pub use_constrained_llm_category: bool,
    /// If > 0, score categories only on the first N chars.
    pub heuristic_leading_chars: usize,
    /// For documents at least this long, score only the leading slice.
    pub heuristic_long_doc_chars_threshold: usize,
    pub heuristic_long_doc_leading_chars: usize,

    // Extraction
    /// Cap on extracted text length in chars (~4 chars per model token).
    pub max_extract_chars: usize,
    /// Run OCR (ocrmypdf) when extracted text is too short.
    pub use_ocr: bool,
    /// Minimum extracted length below which OCR is attempted.
    pub ocr_min_chars: usize,

    // LLM transport (env: SHELFMARK_LLM_URL / _MODEL / _TIMEOUT)
    pub llm_base_url: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout_s: Option<f64>,
    /// If false, never call the LLM (heuristic-only mode).
    pub use_llm: bool,
    /// Regex key:value fallback for LLM responses without a JSON object.
    pub lenient_llm_json: bool,

    // Directory walk
    pub recursive: bool,
    /// Max depth when recursive (0 = unlimited).
    pub max_depth: usize,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Skip files already matching YYYYMMDD-*.pdf.
    pub skip_if_already_named: bool,

    // Rename mechanics
    pub backup_dir: Option<PathBuf>,
    pub rename_log_path: Option<PathBuf>,
    pub export_metadata_path: Option<PathBuf>,
    pub plan_file_path: Option<PathBuf>,
    pub max_filename_chars: Option<usize>,
    pub interactive: bool,
    /// Write the new basename into the renamed PDF's /Title metadata.
    pub write_pdf_metadata: bool,

    /// Custom filename template. Placeholders: {date} {project} {category}
    /// {keywords} {summary} {version} {invoice_id} {amount} {company}.
    pub filename_template: Option<String>,
    /// Extract invoice id / amount / company for template placeholders.
    pub use_structured_fields: bool,

    /// Parallel workers for extract + filename generation.
    pub workers: usize,
}

impl Default for RenamerConfig {
    fn default() -> Self {
        Self {
            language: Language::De,
            desired_case: CaseStyle::Kebab,
            project: String::new(),
            version: String::new(),
            prefer_llm_category: true,
            date_locale: DateLocale::Dmy,
            date_prefer_leading_chars: 8000,
            use_pdf_metadata_for_date: true,
            dry_run: false,
            min_heuristic_score_gap: 0.0,
            min_heuristic_score: 0.0,
            title_weight_region: 2000,
            title_weight_factor: 1.5,
            max_score_per_category: None,
            use_keyword_overlap_for_category: true,
            use_embeddings_for_conflict: false,
            category_display: DisplayStyle::Specific,
            skip_llm_category_if_heuristic_score_ge: None,
            skip_llm_category_if_heuristic_gap_ge: None,
            heuristic_suggestions_top_n: 5,
            heuristic_score_weight: 0.15,
            heuristic_override_min_score: None,
            heuristic_override_min_gap: None,
            use_constrained_llm_category: true,
            heuristic_leading_chars: 0,
            heuristic_long_doc_chars_threshold: 40_000,
            heuristic_long_doc_leading_chars: 12_000,
            max_extract_chars: 48_000,
            use_ocr: false,
            ocr_min_chars: 50,
            llm_base_url: None,
            llm_model: None,
            llm_timeout_s: None,
            use_llm: true,
            lenient_llm_json: false,
            recursive: false,
            max_depth: 0,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            skip_if_already_named: false,
            backup_dir: None,
            rename_log_path: None,
            export_metadata_path: None,
            plan_file_path: None,
            max_filename_chars: None,
            interactive: false,
            write_pdf_metadata: false,
            filename_template: None,
            use_structured_fields: true,
            workers: 1,
        }
    }
}

/// Resolved LLM endpoint settings after config + env layering.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_s: f64,
}

fn config_or_env(value: Option<&str>, env_key: &str, default: &str) -> String {
    let from_config = value.map(str::trim).filter(|s| !s.is_empty());
    if let Some(v) = from_config {
        return v.to_string();
    }
    if let Ok(v) = std::env::var(env_key) {
        let v = v.trim().to_string();
        if !v.is_empty() {
            return v;
        }
    }
    default.to_string()
}

impl RenamerConfig {
    /// Load config from a JSON file. Unreadable or malformed files are fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("could not read config file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid JSON in config file {}: {}", path.display(), e))
        })
    }

    /// LLM endpoint settings, layering config over `SHELFMARK_LLM_*` env vars
    /// over built-in defaults.
    pub fn llm_settings(&self) -> LlmSettings {
        let base_url = config_or_env(
            self.llm_base_url.as_deref(),
            "SHELFMARK_LLM_URL",
            DEFAULT_LLM_URL,
        );
        let model = config_or_env(
            self.llm_model.as_deref(),
            "SHELFMARK_LLM_MODEL",
            DEFAULT_LLM_MODEL,
        );
        let timeout_s = self
            .llm_timeout_s
            .filter(|t| *t > 0.0)
            .or_else(|| {
                std::env::var("SHELFMARK_LLM_TIMEOUT")
                    .ok()
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|t| *t > 0.0)
            })
            .unwrap_or(DEFAULT_LLM_TIMEOUT_S);
        LlmSettings {
            base_url,
            model,
            timeout_s,
        }
    }

    /// The slice of content used for heuristic category scoring.
    pub fn heuristic_slice<'a>(&self, content: &'a str) -> &'a str {
        fn take_chars(s: &str, n: usize) -> &str {
            match s.char_indices().nth(n) {
                Some((idx, _)) => &s[..idx],
                None => s,
            }
        }
        if self.heuristic_leading_chars > 0 {
            return take_chars(content, self.heuristic_leading_chars);
        }
        if self.heuristic_long_doc_chars_threshold > 0
            && content.chars().count() >= self.heuristic_long_doc_chars_threshold
        {
            return take_chars(content, self.heuristic_long_doc_leading_chars);
        }
        content
    }
}
