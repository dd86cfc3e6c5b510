//! Filename assembly.
//!
//! Default layout is `date-project-category-keywords-summary-version.pdf`
//! with each part cleaned and case-styled. A custom template with
//! `{date} {project} {category} {keywords} {summary} {version} {invoice_id}
//! {amount} {company}` placeholders can replace the default layout.

use once_cell::sync::Lazy;
use regex::Regex;

use shelfmark_core::CaseStyle;
use shelfmark_extract::text::{clean_token, convert_case};
use shelfmark_extract::StructuredFields;

const MAX_KEYWORD_TOKENS: usize = 3;
const MAX_SUMMARY_TOKENS: usize = 5;

static ALREADY_NAMED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}-.+\.(?i:pdf)$").expect("static regex"));
static SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]{2,}").expect("static regex"));

const WINDOWS_RESERVED: [&str; 22] = [
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Inputs to filename assembly. `category` is already display-rendered.
#[derive(Debug, Default)]
pub struct FilenameParts<'a> {
    pub date: &'a str,
    pub project: &'a str,
    pub category: &'a str,
    pub keywords: &'a [String],
    pub summary_tokens: &'a [String],
    pub version: &'a str,
    pub fields: Option<&'a StructuredFields>,
}

/// True for files already carrying a `YYYYMMDD-` prefix.
pub fn is_already_named(file_name: &str) -> bool {
    ALREADY_NAMED.is_match(file_name)
}

/// Make a basename filesystem-safe: strip control and forbidden characters,
/// collapse whitespace to `_`, guard against Windows reserved device names.
pub fn sanitize_filename_base(base: &str) -> String {
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .trim_matches(['.', '_', '-'])
        .to_string();
    if cleaned.is_empty() {
        return "unnamed".to_string();
    }
    if WINDOWS_RESERVED.contains(&cleaned.to_lowercase().as_str()) {
        return format!("{cleaned}_");
    }
    cleaned
}

fn styled(value: &str, style: CaseStyle) -> String {
    if value.trim().is_empty() {
        return String::new();
    }
    convert_case(&[value.to_string()], style)
}

fn styled_tokens(tokens: &[String], limit: usize, style: CaseStyle) -> String {
    let capped: Vec<String> = tokens.iter().take(limit).cloned().collect();
    convert_case(&capped, style)
}

fn default_layout(parts: &FilenameParts<'_>, style: CaseStyle) -> String {
    let segments = [
        parts.date.trim().to_string(),
        styled(parts.project, style),
        styled(parts.category, style),
        styled_tokens(parts.keywords, MAX_KEYWORD_TOKENS, style),
        styled_tokens(parts.summary_tokens, MAX_SUMMARY_TOKENS, style),
        styled(parts.version, style),
    ];
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(style.separator())
}

fn template_layout(template: &str, parts: &FilenameParts<'_>, style: CaseStyle) -> String {
    let empty = StructuredFields::default();
    let fields = parts.fields.unwrap_or(&empty);
    let field = |v: &Option<String>| v.as_deref().map(clean_token).unwrap_or_default();
    let rendered = template
        .replace("{date}", parts.date.trim())
        .replace("{project}", &styled(parts.project, style))
        .replace("{category}", &styled(parts.category, style))
        .replace(
            "{keywords}",
            &styled_tokens(parts.keywords, MAX_KEYWORD_TOKENS, style),
        )
        .replace(
            "{summary}",
            &styled_tokens(parts.summary_tokens, MAX_SUMMARY_TOKENS, style),
        )
        .replace("{version}", &styled(parts.version, style))
        .replace("{invoice_id}", &field(&fields.invoice_id))
        .replace("{amount}", &field(&fields.amount))
        .replace("{company}", &field(&fields.company));
    // Empty placeholders leave separator runs behind
    SEPARATOR_RUN
        .replace_all(&rendered, style.separator())
        .into_owned()
}

fn truncate_base(base: &str, budget: usize) -> String {
    if base.chars().count() <= budget {
        return base.to_string();
    }
    let cut: String = base.chars().take(budget).collect();
    // Prefer cutting at a part boundary so no half token survives
    match cut.rfind(['-', '_']) {
        Some(idx) if idx > 0 => cut[..idx].to_string(),
        _ => cut,
    }
}

/// Assemble the target filename (with `.pdf` extension). `max_chars`
/// bounds the whole filename; truncation happens at part boundaries.
pub fn build_filename(
    parts: &FilenameParts<'_>,
    style: CaseStyle,
    template: Option<&str>,
    max_chars: Option<usize>,
) -> String {
    let base = match template {
        Some(template) => template_layout(template, parts, style),
        None => default_layout(parts, style),
    };
    let mut base = sanitize_filename_base(&base);
    if let Some(max) = max_chars {
        let budget = max.saturating_sub(".pdf".len()).max(1);
        base = truncate_base(&base, budget);
        base = sanitize_filename_base(&base);
    }
    format!("{base}.pdf")
}
