//! Document date derivation.
//!
//! Scans content for numeric dates (YMD and DMY/MDY, locale-disambiguated)
//! and German/English month-name forms. Candidates found within the leading
//! region of the text win over later ones. Falls back to PDF metadata dates,
//! then filesystem mtime, then today.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use shelfmark_core::DateLocale;

use crate::pdf::PdfMetadata;

static DATE_YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("static regex"));
static DATE_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})[./-](\d{1,2})[./-](\d{4})\b").expect("static regex"));
static DATE_MONTH_DE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(\d{1,2})\.?\s+)?(Januar|Februar|März|Maerz|April|Mai|Juni|Juli|August|September|Oktober|November|Dezember)\s+(\d{4})\b",
    )
    .expect("static regex")
});
static DATE_MONTH_EN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(\d{1,2})(?:st|nd|rd|th)?\s+)?(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b",
    )
    .expect("static regex")
});

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "januar" | "january" => 1,
        "februar" | "february" => 2,
        "märz" | "maerz" | "march" => 3,
        "april" => 4,
        "mai" | "may" => 5,
        "juni" | "june" => 6,
        "juli" | "july" => 7,
        "august" => 8,
        "september" => 9,
        "oktober" | "october" => 10,
        "november" => 11,
        "dezember" | "december" => 12,
        _ => return None,
    };
    Some(n)
}

/// Plausibility bounds for document years.
fn valid_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1900..=2099).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// A date candidate with its byte offset in the content.
struct Candidate {
    offset: usize,
    date: NaiveDate,
}

fn collect_candidates(content: &str, locale: DateLocale) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for caps in DATE_YMD.captures_iter(content) {
        let (Ok(year), Ok(month), Ok(day)) = (
            caps[1].parse::<i32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<u32>(),
        ) else {
            continue;
        };
        if let Some(date) = valid_date(year, month, day) {
            candidates.push(Candidate {
                offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
                date,
            });
        }
    }

    for caps in DATE_NUMERIC.captures_iter(content) {
        let (Ok(first), Ok(second), Ok(year)) = (
            caps[1].parse::<u32>(),
            caps[2].parse::<u32>(),
            caps[3].parse::<i32>(),
        ) else {
            continue;
        };
        let (day, month) = match locale {
            DateLocale::Dmy => (first, second),
            DateLocale::Mdy => (second, first),
        };
        if let Some(date) = valid_date(year, month, day) {
            candidates.push(Candidate {
                offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
                date,
            });
        }
    }

    for re in [&*DATE_MONTH_DE, &*DATE_MONTH_EN] {
        for caps in re.captures_iter(content) {
            let Some(month) = month_number(&caps[2]) else {
                continue;
            };
            let Ok(year) = caps[3].parse::<i32>() else {
                continue;
            };
            let day = caps
                .get(1)
                .and_then(|d| d.as_str().parse::<u32>().ok())
                .unwrap_or(1);
            if let Some(date) = valid_date(year, month, day) {
                candidates.push(Candidate {
                    offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
                    date,
                });
            }
        }
    }

    candidates.sort_by_key(|c| c.offset);
    candidates
}

/// Extract a document date from content. Candidates in the leading
/// `prefer_leading_chars` region win over later ones (0 = whole text);
/// within a region, the earliest plausible candidate is used.
pub fn extract_date_from_content(
    content: &str,
    locale: DateLocale,
    prefer_leading_chars: usize,
) -> Option<NaiveDate> {
    let candidates = collect_candidates(content, locale);
    if candidates.is_empty() {
        return None;
    }
    if prefer_leading_chars > 0 {
        // The region is configured in characters; offsets are bytes
        let region_end = content
            .char_indices()
            .nth(prefer_leading_chars)
            .map_or(content.len(), |(i, _)| i);
        if let Some(leading) = candidates.iter().find(|c| c.offset < region_end) {
            return Some(leading.date);
        }
    }
    Some(candidates[0].date)
}

/// Parse a PDF info-dict date string already normalized to `YYYY-MM-DD`.
fn parse_metadata_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Derive the filename date (`YYYYMMDD`): content first, then PDF metadata
/// (when enabled), then filesystem mtime, then today.
pub fn derive_date(
    content: &str,
    locale: DateLocale,
    prefer_leading_chars: usize,
    metadata: Option<&PdfMetadata>,
    use_pdf_metadata: bool,
    mtime: Option<DateTime<Local>>,
) -> String {
    if let Some(date) = extract_date_from_content(content, locale, prefer_leading_chars) {
        return format_ymd(date);
    }
    if use_pdf_metadata {
        if let Some(meta) = metadata {
            for value in [&meta.creation_date, &meta.mod_date].into_iter().flatten() {
                if let Some(date) = parse_metadata_date(value) {
                    debug!("No content date; using PDF metadata date {}", date);
                    return format_ymd(date);
                }
            }
        }
    }
    if let Some(mtime) = mtime {
        debug!("No content or metadata date; using file mtime");
        return format_ymd(mtime.date_naive());
    }
    format_ymd(Local::now().date_naive())
}

fn format_ymd(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_ymd_format() {
        assert_eq!(
            extract_date_from_content("Report 2024-03-15 final", DateLocale::Dmy, 0),
            Some(date(2024, 3, 15))
        );
    }

    #[test]
    fn test_dmy_locale() {
        assert_eq!(
            extract_date_from_content("Stand: 18.02.2025", DateLocale::Dmy, 0),
            Some(date(2025, 2, 18))
        );
    }

    #[test]
    fn test_mdy_locale() {
        assert_eq!(
            extract_date_from_content("Date: 02/18/2025", DateLocale::Mdy, 0),
            Some(date(2025, 2, 18))
        );
    }

    #[test]
    fn test_german_month_name() {
        assert_eq!(
            extract_date_from_content("Mitteilung Februar 2024", DateLocale::Dmy, 0),
            Some(date(2024, 2, 1))
        );
        assert_eq!(
            extract_date_from_content("am 18. Februar 2024", DateLocale::Dmy, 0),
            Some(date(2024, 2, 18))
        );
    }

    #[test]
    fn test_english_month_name() {
        assert_eq!(
            extract_date_from_content("Issued January 2025", DateLocale::Dmy, 0),
            Some(date(2025, 1, 1))
        );
    }

    #[test]
    fn test_leading_region_preference() {
        let text = format!(
            "{}intro 01.01.2020 body{}footer 31.12.2030",
            "", "x".repeat(100)
        );
        // Both candidates exist; the one in the leading region wins
        assert_eq!(
            extract_date_from_content(&text, DateLocale::Dmy, 50),
            Some(date(2020, 1, 1))
        );
    }

    #[test]
    fn test_leading_region_counts_chars_not_bytes() {
        // 40 two-byte chars push the byte offset to 80 while the char
        // offset stays at 40, still inside a 50-char region
        let text = format!("{}am 18.02.2025 {} 31.12.2030", "ä".repeat(40), "x".repeat(100));
        assert_eq!(
            extract_date_from_content(&text, DateLocale::Dmy, 50),
            Some(date(2025, 2, 18))
        );
    }

    #[test]
    fn test_earliest_candidate_outside_region() {
        let text = format!("{}only 15.06.2021 here", "x".repeat(100));
        assert_eq!(
            extract_date_from_content(&text, DateLocale::Dmy, 50),
            Some(date(2021, 6, 15))
        );
    }

    #[test]
    fn test_implausible_dates_rejected() {
        assert_eq!(
            extract_date_from_content("32.13.2024 and 1234-99-99", DateLocale::Dmy, 0),
            None
        );
        assert_eq!(
            extract_date_from_content("01.01.1850", DateLocale::Dmy, 0),
            None
        );
    }

    #[test]
    fn test_derive_date_metadata_fallback() {
        let meta = PdfMetadata {
            creation_date: Some("2023-05-09".to_string()),
            mod_date: None,
        };
        assert_eq!(
            derive_date("no dates here", DateLocale::Dmy, 0, Some(&meta), true, None),
            "20230509"
        );
        // Metadata disabled: falls through to today (non-empty 8 digits)
        let today = derive_date("no dates here", DateLocale::Dmy, 0, Some(&meta), false, None);
        assert_eq!(today.len(), 8);
        assert_ne!(today, "20230509");
    }

    #[test]
    fn test_derive_date_content_beats_metadata() {
        let meta = PdfMetadata {
            creation_date: Some("2023-05-09".to_string()),
            mod_date: None,
        };
        assert_eq!(
            derive_date("Rechnung vom 18.02.2025", DateLocale::Dmy, 0, Some(&meta), true, None),
            "20250218"
        );
    }
}
