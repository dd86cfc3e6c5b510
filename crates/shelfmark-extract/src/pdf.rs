//! PDF text and metadata extraction, with OCR escalation for scans.

use std::path::Path;
use std::process::Command;

use lopdf::{Document, Object};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use shelfmark_core::{Error, Result};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
static PDF_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"D:(\d{4})(\d{2})(\d{2})").expect("static regex"));

/// Info-dict dates, normalized to `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfMetadata {
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

/// Extract text from a PDF, squeezing whitespace runs and capping at
/// `max_chars` characters (0 = unlimited).
pub fn pdf_to_text(path: &Path, max_chars: usize) -> Result<String> {
    let raw = pdf_extract::extract_text(path)
        .map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
    let text = WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned();
    if max_chars > 0 && text.chars().count() > max_chars {
        return Ok(text.chars().take(max_chars).collect());
    }
    Ok(text)
}

fn parse_pdf_date(raw: &str) -> Option<String> {
    let caps = PDF_DATE.captures(raw)?;
    Some(format!("{}-{}-{}", &caps[1], &caps[2], &caps[3]))
}

fn info_string(doc: &Document, info: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    let object = info.get(key).ok()?;
    let object = match object {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    match object {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// Read creation/modification dates from the PDF info dictionary.
/// Best-effort: any failure yields empty metadata.
pub fn pdf_metadata(path: &Path) -> PdfMetadata {
    let doc = match Document::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Could not read PDF metadata from {}: {e}", path.display());
            return PdfMetadata::default();
        }
    };
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });
    let Some(info) = info else {
        return PdfMetadata::default();
    };
    PdfMetadata {
        creation_date: info_string(&doc, info, b"CreationDate")
            .as_deref()
            .and_then(parse_pdf_date),
        mod_date: info_string(&doc, info, b"ModDate")
            .as_deref()
            .and_then(parse_pdf_date),
    }
}

/// Extract text, escalating to `ocrmypdf` when the embedded text layer is
/// shorter than `ocr_min_chars` (scanned documents). A missing `ocrmypdf`
/// binary keeps the original text with a warning.
pub fn pdf_to_text_with_ocr(path: &Path, max_chars: usize, ocr_min_chars: usize) -> Result<String> {
    let text = pdf_to_text(path, max_chars)?;
    if text.chars().count() >= ocr_min_chars {
        return Ok(text);
    }
    debug!(
        "Text layer below {} chars for {}; attempting OCR",
        ocr_min_chars,
        path.display()
    );
    let ocr_dir = tempfile::tempdir()?;
    let ocr_path = ocr_dir.path().join("ocr.pdf");
    let status = Command::new("ocrmypdf")
        .arg("--force-ocr")
        .arg("--quiet")
        .arg(path)
        .arg(&ocr_path)
        .status();
    match status {
        Ok(status) if status.success() => {
            let ocr_text = pdf_to_text(&ocr_path, max_chars)?;
            if ocr_text.chars().count() > text.chars().count() {
                return Ok(ocr_text);
            }
            Ok(text)
        }
        Ok(status) => {
            warn!("ocrmypdf exited with {status} for {}", path.display());
            Ok(text)
        }
        Err(e) => {
            warn!("ocrmypdf not available ({e}); keeping embedded text");
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pdf_date() {
        assert_eq!(
            parse_pdf_date("D:20230509120000+02'00'").as_deref(),
            Some("2023-05-09")
        );
        assert_eq!(parse_pdf_date("garbage"), None);
    }

    #[test]
    fn test_metadata_of_missing_file_is_empty() {
        assert_eq!(
            pdf_metadata(Path::new("/nonexistent/file.pdf")),
            PdfMetadata::default()
        );
    }

    #[test]
    fn test_text_extraction_of_missing_file_is_error() {
        assert!(pdf_to_text(Path::new("/nonexistent/file.pdf"), 0).is_err());
    }
}
