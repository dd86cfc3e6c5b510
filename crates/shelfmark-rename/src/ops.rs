//! Rename mechanics: collision handling, backups, dry-run plans, undo log.

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::{Document, Object};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use shelfmark_core::{Error, Result};

/// Collision suffix attempts (`_1` .. `_20`) before giving up.
pub const MAX_RENAME_RETRIES: usize = 20;

/// One planned or applied rename, serialized into the plan file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub applied: bool,
}

/// What happened to a single file.
#[derive(Debug, Clone, PartialEq)]
pub enum RenameOutcome {
    /// Target equals source; nothing to do.
    Unchanged,
    /// Dry run: the rename was recorded but not applied.
    Planned(PathBuf),
    Renamed(PathBuf),
}

#[derive(Debug, Default)]
pub struct RenameOptions<'a> {
    pub dry_run: bool,
    pub backup_dir: Option<&'a Path>,
    pub undo_log: Option<&'a Path>,
    /// Record the new basename in the renamed PDF's `/Title` info entry.
    pub write_pdf_title: bool,
}

/// Find a free path by suffixing `_1` .. `_20` before the extension.
fn resolve_collision(target: &Path) -> Result<PathBuf> {
    if !target.exists() {
        return Ok(target.to_path_buf());
    }
    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("pdf");
    for n in 1..=MAX_RENAME_RETRIES {
        let candidate = target.with_file_name(format!("{stem}_{n}.{ext}"));
        if !candidate.exists() {
            debug!("Collision on {}; using {}", target.display(), candidate.display());
            return Ok(candidate);
        }
    }
    Err(Error::Rename(format!(
        "no free name for {} after {} attempts",
        target.display(),
        MAX_RENAME_RETRIES
    )))
}

fn backup_copy(source: &Path, backup_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(backup_dir)?;
    let name = source
        .file_name()
        .ok_or_else(|| Error::Rename(format!("no file name in {}", source.display())))?;
    let backup_target = resolve_collision(&backup_dir.join(name))?;
    std::fs::copy(source, &backup_target)?;
    debug!("Backed up {} to {}", source.display(), backup_target.display());
    Ok(())
}

#[cfg(unix)]
fn is_cross_device(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(18) // EXDEV
}

#[cfg(not(unix))]
fn is_cross_device(_err: &std::io::Error) -> bool {
    false
}

fn rename_file(source: &Path, target: &Path) -> Result<()> {
    match std::fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device(&e) => {
            warn!("Cross-device rename; falling back to copy+remove");
            std::fs::copy(source, target)?;
            std::fs::remove_file(source)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Append one `old\tnew` line to the undo log.
pub fn append_undo_log(log_path: &Path, source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}\t{}", source.display(), target.display())?;
    Ok(())
}

/// Write `title` into the PDF's `/Title` info entry, creating the info
/// dictionary when the document has none.
pub fn write_pdf_title(path: &Path, title: &str) -> Result<()> {
    let mut doc =
        Document::load(path).map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
    let title_obj = Object::string_literal(title);
    match doc.trailer.get(b"Info").ok().cloned() {
        Some(Object::Reference(id)) => {
            let dict = doc
                .get_object_mut(id)
                .ok()
                .and_then(|obj| obj.as_dict_mut().ok());
            match dict {
                Some(dict) => dict.set("Title", title_obj),
                None => {
                    return Err(Error::Pdf(format!(
                        "invalid Info dictionary in {}",
                        path.display()
                    )))
                }
            }
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set("Title", title_obj);
            doc.trailer.set("Info", Object::Dictionary(dict));
        }
        _ => {
            let mut dict = lopdf::Dictionary::new();
            dict.set("Title", title_obj);
            let id = doc.add_object(dict);
            doc.trailer.set("Info", Object::Reference(id));
        }
    }
    doc.save(path)
        .map_err(|e| Error::Pdf(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Serialize plan entries to a JSON plan file.
pub fn write_plan_file(path: &Path, entries: &[PlanEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Rename `source` to `target_name` in its own directory, with collision
/// suffixing, optional backup, and undo-log recording. Dry runs record the
/// outcome without touching the filesystem.
pub fn apply_rename(
    source: &Path,
    target_name: &str,
    opts: &RenameOptions<'_>,
) -> Result<RenameOutcome> {
    let parent = source
        .parent()
        .ok_or_else(|| Error::Rename(format!("no parent directory for {}", source.display())))?;
    let target = parent.join(target_name);
    if target == source {
        debug!("{} already has the target name", source.display());
        return Ok(RenameOutcome::Unchanged);
    }
    let target = resolve_collision(&target)?;
    if opts.dry_run {
        info!("[dry-run] {} -> {}", source.display(), target.display());
        return Ok(RenameOutcome::Planned(target));
    }
    if let Some(backup_dir) = opts.backup_dir {
        backup_copy(source, backup_dir)?;
    }
    rename_file(source, &target)?;
    if let Some(log_path) = opts.undo_log {
        append_undo_log(log_path, source, &target)?;
    }
    if opts.write_pdf_title {
        let title = target
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed");
        // Best-effort: a document we cannot rewrite keeps its old metadata
        if let Err(e) = write_pdf_title(&target, title) {
            warn!("Could not write PDF title for {}: {e}", target.display());
        }
    }
    info!("{} -> {}", source.display(), target.display());
    Ok(RenameOutcome::Renamed(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"pdf").unwrap();
    }

    #[test]
    fn test_rename_applies() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.pdf");
        touch(&source);
        let outcome = apply_rename(&source, "new.pdf", &RenameOptions::default()).unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed(dir.path().join("new.pdf")));
        assert!(!source.exists());
        assert!(dir.path().join("new.pdf").exists());
    }

    #[test]
    fn test_same_name_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("same.pdf");
        touch(&source);
        let outcome = apply_rename(&source, "same.pdf", &RenameOptions::default()).unwrap();
        assert_eq!(outcome, RenameOutcome::Unchanged);
        assert!(source.exists());
    }

    #[test]
    fn test_collision_gets_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.pdf");
        touch(&source);
        touch(&dir.path().join("new.pdf"));
        touch(&dir.path().join("new_1.pdf"));
        let outcome = apply_rename(&source, "new.pdf", &RenameOptions::default()).unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed(dir.path().join("new_2.pdf")));
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.pdf");
        touch(&source);
        let opts = RenameOptions {
            dry_run: true,
            ..Default::default()
        };
        let outcome = apply_rename(&source, "new.pdf", &opts).unwrap();
        assert_eq!(outcome, RenameOutcome::Planned(dir.path().join("new.pdf")));
        assert!(source.exists());
        assert!(!dir.path().join("new.pdf").exists());
    }

    #[test]
    fn test_backup_and_undo_log() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.pdf");
        touch(&source);
        let backup_dir = dir.path().join("backup");
        let undo = dir.path().join("undo.log");
        let opts = RenameOptions {
            dry_run: false,
            backup_dir: Some(&backup_dir),
            undo_log: Some(&undo),
            ..Default::default()
        };
        apply_rename(&source, "new.pdf", &opts).unwrap();
        assert!(backup_dir.join("old.pdf").exists());
        let log = std::fs::read_to_string(&undo).unwrap();
        assert!(log.contains("old.pdf\t"));
        assert!(log.trim_end().ends_with("new.pdf"));
    }

    fn minimal_pdf(path: &Path) {
        let mut doc = Document::with_version("1.5");
        let mut pages = lopdf::Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![]));
        pages.set("Count", Object::Integer(0));
        let pages_id = doc.add_object(pages);
        let mut catalog = lopdf::Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.save(path).unwrap();
    }

    fn read_title(path: &Path) -> Vec<u8> {
        let doc = Document::load(path).unwrap();
        let info = match doc.trailer.get(b"Info").unwrap() {
            Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
            Object::Dictionary(dict) => dict,
            other => panic!("unexpected Info object: {other:?}"),
        };
        match info.get(b"Title").unwrap() {
            Object::String(bytes, _) => bytes.clone(),
            other => panic!("unexpected Title object: {other:?}"),
        }
    }

    #[test]
    fn test_write_pdf_title_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        minimal_pdf(&path);
        write_pdf_title(&path, "20240101-rechnung").unwrap();
        assert_eq!(read_title(&path), b"20240101-rechnung");
        // Overwrites on a second pass
        write_pdf_title(&path, "20240202-vertrag").unwrap();
        assert_eq!(read_title(&path), b"20240202-vertrag");
    }

    #[test]
    fn test_write_pdf_title_rejects_non_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not.pdf");
        touch(&path);
        assert!(write_pdf_title(&path, "title").is_err());
    }

    #[test]
    fn test_rename_survives_title_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.pdf");
        touch(&source); // not a real PDF; the title write fails
        let opts = RenameOptions {
            write_pdf_title: true,
            ..Default::default()
        };
        let outcome = apply_rename(&source, "new.pdf", &opts).unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed(dir.path().join("new.pdf")));
        assert!(dir.path().join("new.pdf").exists());
    }

    #[test]
    fn test_rename_writes_title_into_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.pdf");
        minimal_pdf(&source);
        let opts = RenameOptions {
            write_pdf_title: true,
            ..Default::default()
        };
        apply_rename(&source, "20250218-rechnung.pdf", &opts).unwrap();
        assert_eq!(
            read_title(&dir.path().join("20250218-rechnung.pdf")),
            b"20250218-rechnung"
        );
    }

    #[test]
    fn test_plan_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let entries = vec![PlanEntry {
            source: PathBuf::from("/a/old.pdf"),
            target: PathBuf::from("/a/new.pdf"),
            applied: false,
        }];
        write_plan_file(&path, &entries).unwrap();
        let parsed: Vec<PlanEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(!parsed[0].applied);
    }
}
