//! Read-through scorer cache.
//!
//! Rule loading is memoized per (path, language) pair. The cache is owned by
//! the composition root and injected into callers — no hidden module-level
//! singleton, so tests can supply isolated instances. Config is loaded once
//! per process; invalidation is not required.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use shelfmark_core::{Language, Result};

use crate::rules::load_rules_for_language;
use crate::scorer::Scorer;

/// Thread-safe memoized scorer store keyed by (rule file, language).
#[derive(Default)]
pub struct ScorerCache {
    inner: Mutex<HashMap<(PathBuf, Language), Arc<Scorer>>>,
}

impl ScorerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the scorer for (path, language), loading rules on first use.
    /// Load failures are not cached; a later call retries.
    pub fn get_or_load(&self, path: &Path, language: Language) -> Result<Arc<Scorer>> {
        let key = (path.to_path_buf(), language);
        if let Some(scorer) = self.inner.lock().get(&key) {
            return Ok(scorer.clone());
        }
        let rules = load_rules_for_language(path, language)?;
        let scorer = Arc::new(Scorer::new(rules));
        self.inner.lock().insert(key, scorer.clone());
        Ok(scorer)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
