//! Data-file discovery.
//!
//! Rule, alias, and stopword files live in a `data/` directory resolved from
//! the `SHELFMARK_DATA_DIR` env var, then a `data/` dir beside the executable,
//! then `data/` under the current working directory.

use std::path::PathBuf;

/// Resolve the data directory from env, executable location, or CWD.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SHELFMARK_DATA_DIR") {
        let dir = dir.trim();
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()));
    if let Some(dir) = exe_dir {
        let candidate = dir.join("data");
        if candidate.is_dir() {
            return candidate;
        }
        let parent_data = dir.join("../data");
        if parent_data.is_dir() {
            return parent_data;
        }
    }
    PathBuf::from("data")
}

/// Path to a named file inside the resolved data directory.
pub fn data_path(name: &str) -> PathBuf {
    resolve_data_dir().join(name)
}
