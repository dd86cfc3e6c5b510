//! Structured field extraction for invoice-style documents.
//!
//! Labeled regexes pull an invoice number, a monetary amount, and a company
//! name out of the document text. These are best-effort: any field may be
//! absent, and absent fields simply drop out of the filename template.

use once_cell::sync::Lazy;
use regex::Regex;

/// Fields recoverable from invoice-style documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredFields {
    pub invoice_id: Option<String>,
    pub amount: Option<String>,
    pub company: Option<String>,
}

static INVOICE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:Rechnungs(?:nummer|-Nr\.?|nr\.?)|Invoice\s*(?:No\.?|Number|#)|Beleg(?:nummer|-Nr\.?))\s*[:.]?\s*([A-Za-z0-9][A-Za-z0-9/_-]{2,24})",
    )
    .expect("static regex")
});

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:EUR|€|USD|\$)\s?(\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?)|(\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?)\s?(?:EUR|€|USD)",
    )
    .expect("static regex")
});

static COMPANY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b([A-ZÄÖÜ][\w&.ÄÖÜäöüß-]*(?:\s+[A-ZÄÖÜ&][\w&.ÄÖÜäöüß-]*){0,3})\s+(GmbH\s*&\s*Co\.\s*KG|GmbH|AG|KG|SE|e\.V\.|Inc\.?|LLC|Ltd\.?|Corp\.?)",
    )
    .expect("static regex")
});

fn normalize_amount(raw: &str) -> String {
    // German convention: dot groups thousands, comma separates cents.
    // "1.234,56" -> "1234.56"; "1,234.56" -> "1234.56"; "120,00" -> "120.00"
    let last_comma = raw.rfind(',');
    let last_dot = raw.rfind('.');
    match (last_comma, last_dot) {
        (Some(c), Some(d)) if c > d => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(c), None) => {
            if raw.len() - c == 3 {
                raw.replace(',', ".")
            } else {
                raw.replace(',', "")
            }
        }
        _ => raw.to_string(),
    }
}

/// Scan document text for invoice number, amount, and company name.
/// The first match of each pattern wins.
pub fn extract_structured_fields(content: &str) -> StructuredFields {
    let invoice_id = INVOICE_ID
        .captures(content)
        .map(|caps| caps[1].trim_end_matches(['.', ',']).to_string());

    let amount = AMOUNT.captures(content).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| normalize_amount(m.as_str()))
    });

    let company = COMPANY
        .captures(content)
        .map(|caps| format!("{} {}", caps[1].trim(), caps[2].trim()));

    StructuredFields {
        invoice_id,
        amount,
        company,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_german_label() {
        let fields = extract_structured_fields("Rechnungsnummer: RE-2024-0042\nBetrag folgt");
        assert_eq!(fields.invoice_id.as_deref(), Some("RE-2024-0042"));
    }

    #[test]
    fn test_invoice_number_english_label() {
        let fields = extract_structured_fields("Invoice No. INV12345 dated today");
        assert_eq!(fields.invoice_id.as_deref(), Some("INV12345"));
    }

    #[test]
    fn test_amount_currency_prefix_and_suffix() {
        assert_eq!(
            extract_structured_fields("Gesamt: EUR 1.234,56").amount.as_deref(),
            Some("1234.56")
        );
        assert_eq!(
            extract_structured_fields("Summe 120,00 €").amount.as_deref(),
            Some("120.00")
        );
        assert_eq!(
            extract_structured_fields("Total $1,234.56 due").amount.as_deref(),
            Some("1234.56")
        );
    }

    #[test]
    fn test_company_suffix_forms() {
        assert_eq!(
            extract_structured_fields("gestellt von Muster Bau GmbH in Berlin")
                .company
                .as_deref(),
            Some("Muster Bau GmbH")
        );
        assert_eq!(
            extract_structured_fields("from Acme Widgets Inc. in 2024")
                .company
                .as_deref(),
            Some("Acme Widgets Inc.")
        );
    }

    #[test]
    fn test_absent_fields_are_none() {
        let fields = extract_structured_fields("plain prose without any of it");
        assert_eq!(fields, StructuredFields::default());
    }
}
