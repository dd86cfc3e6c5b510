//! Polling directory watcher.
//!
//! No inotify dependency: a simple interval poll with an mtime seen-map is
//! enough for a drop-folder workflow and works on network mounts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use shelfmark_core::Result;

use crate::pipeline::Pipeline;

/// Watch `root`, processing new or changed PDFs every `interval`.
/// Runs until the process is terminated.
pub async fn watch(pipeline: &Pipeline, root: &Path, interval: Duration) -> Result<()> {
    info!(
        "Watching {} (every {}s)",
        root.display(),
        interval.as_secs()
    );
    let mut seen: HashMap<PathBuf, SystemTime> = HashMap::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let files = match pipeline.collect_pdfs(root) {
            Ok(files) => files,
            Err(e) => {
                warn!("Scan of {} failed: {}", root.display(), e);
                continue;
            }
        };
        let fresh: Vec<PathBuf> = files
            .into_iter()
            .filter(|path| {
                let Ok(mtime) = std::fs::metadata(path).and_then(|m| m.modified()) else {
                    return false;
                };
                match seen.get(path) {
                    Some(prev) if mtime <= *prev => false,
                    _ => {
                        seen.insert(path.clone(), mtime);
                        true
                    }
                }
            })
            .collect();
        if fresh.is_empty() {
            continue;
        }
        info!("Processing {} new/changed PDF(s)", fresh.len());
        if let Err(e) = pipeline.run_files(fresh).await {
            warn!("Batch failed: {}", e);
        }
    }
}
