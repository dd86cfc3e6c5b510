//! ONNX-based similarity backend using all-MiniLM-L6-v2.
//!
//! Embeds both texts with a SentenceTransformers ONNX model (mean pooling
//! over token embeddings) and returns the cosine similarity. Requires the
//! `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::{info, warn};

    use crate::SimilarityBackend;

    /// Maximum sequence length for the model.
    const MAX_SEQ_LEN: usize = 512;

    /// Category names and overlap contexts repeat across documents, so a
    /// small embedding cache pays off.
    const CACHE_CAPACITY: usize = 512;

    /// ONNX similarity backend over mean-pooled MiniLM embeddings.
    pub struct OnnxSimilarity {
        session: Arc<Mutex<Session>>,
        tokenizer: Tokenizer,
        cache: Mutex<HashMap<String, Array1<f32>>>,
    }

    impl OnnxSimilarity {
        /// Load an ONNX model and tokenizer from the given directory.
        ///
        /// Expects:
        /// - `model_dir/model.onnx` — the ONNX model file
        /// - `model_dir/tokenizer.json` — the HuggingFace tokenizer
        pub fn load(model_dir: &Path) -> Result<Self, String> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            if !model_path.exists() {
                return Err(format!("Model not found: {}", model_path.display()));
            }
            if !tokenizer_path.exists() {
                return Err(format!("Tokenizer not found: {}", tokenizer_path.display()));
            }

            // With load-dynamic, ORT_DYLIB_PATH must point to libonnxruntime
            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| format!("Failed to create session builder: {}", e))?
                .with_intra_threads(2)
                .map_err(|e| format!("Failed to set threads: {}", e))?
                .commit_from_file(&model_path)
                .map_err(|e| format!("Failed to load ONNX model: {}", e))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| format!("Failed to load tokenizer: {}", e))?;

            info!("ONNX similarity backend loaded: {}", model_path.display());

            Ok(Self {
                session: Arc::new(Mutex::new(session)),
                tokenizer,
                cache: Mutex::new(HashMap::new()),
            })
        }

        fn embed(&self, text: &str) -> Option<Array1<f32>> {
            if let Some(cached) = self.cache.lock().get(text) {
                return Some(cached.clone());
            }

            let embedding = self.infer(text)?;

            let mut cache = self.cache.lock();
            if cache.len() >= CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(text.to_string(), embedding.clone());
            Some(embedding)
        }

        fn infer(&self, text: &str) -> Option<Array1<f32>> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| {
                    warn!("Tokenization failed: {}", e);
                    e
                })
                .ok()?;

            let input_ids = encoding.get_ids();
            let attention_mask = encoding.get_attention_mask();

            let seq_len = input_ids.len().min(MAX_SEQ_LEN);
            let input_ids = &input_ids[..seq_len];
            let attention_mask = &attention_mask[..seq_len];

            let ids_data: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
            let mask_data: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();
            let type_ids_data: Vec<i64> = vec![0i64; seq_len];

            let ids_tensor = Tensor::from_array(([1usize, seq_len], ids_data))
                .map_err(|e| warn!("Failed to create ids tensor: {}", e))
                .ok()?;
            let mask_tensor = Tensor::from_array(([1usize, seq_len], mask_data))
                .map_err(|e| warn!("Failed to create mask tensor: {}", e))
                .ok()?;
            let type_ids_tensor = Tensor::from_array(([1usize, seq_len], type_ids_data))
                .map_err(|e| warn!("Failed to create type_ids tensor: {}", e))
                .ok()?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids_tensor, mask_tensor, type_ids_tensor])
                .map_err(|e| {
                    warn!("ONNX inference failed: {}", e);
                    e
                })
                .ok()?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| {
                    warn!("Failed to extract output tensor: {}", e);
                    e
                })
                .ok()?;

            let shape_dims: Vec<i64> = shape.iter().copied().collect();

            if shape_dims.len() == 3 {
                // Token embeddings [1, seq_len, dim] → mean pooling over the
                // attention mask
                let dim = shape_dims[2] as usize;
                let mask_f32: Vec<f32> = attention_mask.iter().map(|&m| m as f32).collect();
                let mask_sum: f32 = mask_f32.iter().sum();
                if mask_sum < 1e-9 {
                    return None;
                }
                let mut pooled = Array1::zeros(dim);
                for (i, &m) in mask_f32.iter().enumerate() {
                    if m > 0.0 {
                        let offset = i * dim;
                        for d in 0..dim {
                            pooled[d] += data[offset + d] * m;
                        }
                    }
                }
                Some(pooled / mask_sum)
            } else if shape_dims.len() == 2 {
                // Already pooled [1, dim]
                let dim = shape_dims[1] as usize;
                Some(Array1::from_vec(data[..dim].to_vec()))
            } else {
                warn!("Unexpected output shape: {:?}", shape_dims);
                None
            }
        }
    }

    fn cosine(a: &Array1<f32>, b: &Array1<f32>) -> Option<f64> {
        let dot: f32 = a.dot(b);
        let norm_a = a.dot(a).sqrt();
        let norm_b = b.dot(b).sqrt();
        if norm_a < 1e-9 || norm_b < 1e-9 {
            return None;
        }
        Some((dot / (norm_a * norm_b)) as f64)
    }

    impl SimilarityBackend for OnnxSimilarity {
        fn similarity(&self, a: &str, b: &str) -> Option<f64> {
            let emb_a = self.embed(a)?;
            let emb_b = self.embed(b)?;
            cosine(&emb_a, &emb_b)
        }

        fn is_available(&self) -> bool {
            true
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxSimilarity;
