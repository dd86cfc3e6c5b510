//! Shelfmark Embed — optional embedding-similarity capability.
//!
//! The resolver uses `SimilarityBackend` as an injected optional capability
//! for conflict voting. With the `onnx` feature enabled and model files
//! present, `OnnxSimilarity` computes cosine similarity over mean-pooled
//! all-MiniLM-L6-v2 embeddings. Without it, `NoopSimilarity` reports
//! unavailable and the resolver falls through to keyword overlap.

pub mod onnx;

use std::path::Path;
use std::sync::Arc;

/// Text-pair similarity capability. Availability is wired once at
/// composition time; the resolver checks `is_available` per call.
pub trait SimilarityBackend: Send + Sync {
    /// Similarity between two texts in [-1, 1]. None when unavailable.
    fn similarity(&self, a: &str, b: &str) -> Option<f64>;

    /// Whether the backend can actually compute similarities.
    fn is_available(&self) -> bool;
}

/// Placeholder backend that is never available.
pub struct NoopSimilarity;

impl SimilarityBackend for NoopSimilarity {
    fn similarity(&self, _a: &str, _b: &str) -> Option<f64> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}

/// Create the best available similarity backend for the given model
/// directory. Tries ONNX first (if the feature is enabled and model files
/// are present), falls back to the noop backend.
pub fn create_similarity(model_dir: &Path) -> Arc<dyn SimilarityBackend> {
    #[cfg(feature = "onnx")]
    {
        match onnx::OnnxSimilarity::load(model_dir) {
            Ok(backend) => {
                tracing::info!("Using ONNX similarity backend");
                return Arc::new(backend);
            }
            Err(e) => {
                tracing::warn!(
                    "ONNX similarity unavailable: {}. Conflict voting falls back to keyword overlap.",
                    e
                );
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        let _ = model_dir;
        tracing::debug!("ONNX feature disabled. Conflict voting uses keyword overlap only.");
    }

    Arc::new(NoopSimilarity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_is_never_available() {
        let noop = NoopSimilarity;
        assert!(!noop.is_available());
        assert!(noop.similarity("a", "b").is_none());
    }
}
