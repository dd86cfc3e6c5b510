//! Reverse renames recorded in an undo log.

use std::path::Path;

use tracing::{info, warn};

use shelfmark_core::{Error, Result};

/// Reverse the renames in `log_path` (one `old\tnew` line each), newest
/// first. Entries whose current file is missing, or whose original name is
/// taken again, are skipped with a warning. Returns the number reversed.
pub fn undo(log_path: &Path, dry_run: bool) -> Result<usize> {
    let raw = std::fs::read_to_string(log_path).map_err(|e| {
        Error::Config(format!("could not read undo log {}: {}", log_path.display(), e))
    })?;
    let mut reversed = 0;
    for line in raw.lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((old, new)) = line.split_once('\t') else {
            warn!("Malformed undo log line skipped: {:?}", line);
            continue;
        };
        let old_path = Path::new(old);
        let new_path = Path::new(new);
        if !new_path.exists() {
            warn!("{} no longer exists; skipping", new_path.display());
            continue;
        }
        if old_path.exists() {
            warn!(
                "{} already exists; not restoring {}",
                old_path.display(),
                new_path.display()
            );
            continue;
        }
        if dry_run {
            info!("[dry-run] {} -> {}", new_path.display(), old_path.display());
        } else {
            std::fs::rename(new_path, old_path)?;
            info!("{} -> {}", new_path.display(), old_path.display());
        }
        reversed += 1;
    }
    Ok(reversed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_undo_reverses_last_first() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        // a.pdf was renamed to b.pdf, then b.pdf to c.pdf
        let c = dir.path().join("c.pdf");
        std::fs::write(&c, b"pdf").unwrap();
        let log = dir.path().join("undo.log");
        let mut f = std::fs::File::create(&log).unwrap();
        writeln!(f, "{}\t{}", a.display(), b.display()).unwrap();
        writeln!(f, "{}\t{}", b.display(), c.display()).unwrap();

        let reversed = undo(&log, false).unwrap();
        assert_eq!(reversed, 2);
        assert!(a.exists());
        assert!(!b.exists());
        assert!(!c.exists());
    }

    #[test]
    fn test_undo_skips_missing_and_occupied() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("undo.log");
        let old = dir.path().join("old.pdf");
        let new = dir.path().join("new.pdf");
        std::fs::write(&old, b"other").unwrap();
        std::fs::write(&new, b"pdf").unwrap();
        let mut f = std::fs::File::create(&log).unwrap();
        // First line: renamed file vanished. Second: original name re-taken.
        writeln!(f, "{}\t{}", dir.path().join("x.pdf").display(), dir.path().join("gone.pdf").display()).unwrap();
        writeln!(f, "{}\t{}", old.display(), new.display()).unwrap();

        assert_eq!(undo(&log, false).unwrap(), 0);
        assert!(new.exists());
    }

    #[test]
    fn test_dry_run_counts_without_renaming() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.pdf");
        let new = dir.path().join("new.pdf");
        std::fs::write(&new, b"pdf").unwrap();
        let log = dir.path().join("undo.log");
        std::fs::write(&log, format!("{}\t{}\n", old.display(), new.display())).unwrap();

        assert_eq!(undo(&log, true).unwrap(), 1);
        assert!(new.exists());
        assert!(!old.exists());
    }

    #[test]
    fn test_missing_log_is_config_error() {
        assert!(matches!(
            undo(Path::new("/nonexistent/undo.log"), false),
            Err(Error::Config(_))
        ));
    }
}
