//! Metadata export: JSON array or CSV, chosen by file extension.

use std::io::Write;
use std::path::Path;

use shelfmark_core::Result;

use crate::pipeline::DocumentRecord;

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn write_csv(path: &Path, records: &[DocumentRecord]) -> Result<()> {
    let mut out = std::fs::File::create(path)?;
    writeln!(
        out,
        "source,target,applied,date,category,provenance,heuristic_score,summary,keywords"
    )?;
    for r in records {
        let row = [
            r.source.display().to_string(),
            r.target.display().to_string(),
            r.applied.to_string(),
            r.date.clone(),
            r.category.clone(),
            r.provenance.as_str().to_string(),
            format!("{:.2}", r.heuristic_score),
            r.summary.clone(),
            r.keywords.join(";"),
        ];
        let row: Vec<String> = row.iter().map(|f| csv_escape(f)).collect();
        writeln!(out, "{}", row.join(","))?;
    }
    Ok(())
}

/// Write records to `path`. A `.csv` extension selects CSV; anything else
/// gets a pretty-printed JSON array.
pub fn write_records(path: &Path, records: &[DocumentRecord]) -> Result<()> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(path, records)
    } else {
        let json = serde_json::to_string_pretty(records)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Provenance;
    use std::path::PathBuf;

    fn record() -> DocumentRecord {
        DocumentRecord {
            source: PathBuf::from("/docs/scan.pdf"),
            target: PathBuf::from("/docs/20240315-invoice.pdf"),
            applied: true,
            date: "20240315".to_string(),
            category: "invoice".to_string(),
            provenance: Provenance::Combined,
            heuristic_score: 4.5,
            summary: "Invoice for services, March 2024".to_string(),
            keywords: vec!["invoice".to_string(), "services".to_string()],
        }
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        write_records(&path, &[record()]).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0]["category"], "invoice");
        assert_eq!(parsed[0]["provenance"], "combined");
    }

    #[test]
    fn test_csv_export_quotes_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        write_records(&path, &[record()]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("source,target,"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Invoice for services, March 2024\""));
        assert!(row.contains("invoice;services"));
    }

    #[test]
    fn test_csv_escape_doubles_quotes() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
