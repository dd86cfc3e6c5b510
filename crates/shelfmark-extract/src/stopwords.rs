//! Stopword filtering for summary tokens.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

use shelfmark_core::{Error, Result};

#[derive(Debug, Deserialize)]
struct StopwordsFile {
    #[serde(default)]
    stopwords: Vec<String>,
}

/// A case-insensitive stopword set loaded from a JSON data file.
#[derive(Debug, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// Load from a `{"stopwords": [...]}` file. A missing file yields an
    /// empty set; a malformed file is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Stopwords file not found at {}; using empty set", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let file: StopwordsFile = serde_json::from_str(&raw).map_err(|e| {
            Error::Config(format!("invalid stopwords file {}: {e}", path.display()))
        })?;
        let words: HashSet<String> = file
            .stopwords
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        debug!("Loaded {} stopwords from {}", words.len(), path.display());
        Ok(Self { words })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(&token.to_lowercase())
    }

    /// Drop stopwords, preserving the order of the remaining tokens.
    pub fn filter_tokens(&self, tokens: &[String]) -> Vec<String> {
        tokens
            .iter()
            .filter(|t| !self.contains(t))
            .cloned()
            .collect()
    }
}

/// Caches stopword sets per data file path.
#[derive(Default)]
pub struct StopwordsCache {
    inner: Mutex<HashMap<PathBuf, Arc<Stopwords>>>,
}

impl StopwordsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load failures are not cached, so a fixed file is picked up on retry.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Stopwords>> {
        let mut cache = self.inner.lock();
        if let Some(existing) = cache.get(path) {
            return Ok(Arc::clone(existing));
        }
        let loaded = Arc::new(Stopwords::load(path)?);
        cache.insert(path.to_path_buf(), Arc::clone(&loaded));
        Ok(loaded)
    }
}
