// Sentence-embedding title similarity using all-MiniLM-L6-v2.
//
// Unigram overlap fails when two titles use different words for the same
// thing ("Notebook computers" vs "Laptops"). This strategy embeds titles
// into 384-dimensional vectors with a local sentence transformer and
// compares them by cosine similarity.
//
// The model runs locally via ONNX; mean pooling is applied to token
// embeddings (matching the model's training).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use rayon::prelude::*;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::traits::TitleSimilarity;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Titles embedded per inference call.
const BATCH_SIZE: usize = 64;

/// Sentence embedder using a local ONNX model.
///
/// The session is behind a Mutex since inference needs exclusive access;
/// batching keeps that lock from becoming the bottleneck.
pub struct SentenceEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl SentenceEmbedder {
    /// Load the model and tokenizer from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `label-overlap download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `label-overlap download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        debug!("Loaded sentence embedding model from {}", model_dir.display());

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Embed a batch of texts: tokenize, run the model, mean-pool over the
    /// attention mask.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings: Vec<_> = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
        }

        // BERT inputs, padded to max_len with token id 0 and mask 0.
        let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for enc in &encodings {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();
            let pad_len = max_len - ids.len();

            input_ids_flat.extend(ids.iter().map(|&id| id as i64));
            attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
            token_type_ids_flat.extend(std::iter::repeat_n(0i64, ids.len()));

            input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
            attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
            token_type_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        }

        let shape = [batch_size as i64, max_len as i64];

        let input_ids_tensor = Tensor::from_array((shape, input_ids_flat))
            .context("Failed to create input_ids tensor")?;
        let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
            .context("Failed to create attention_mask tensor")?;
        let token_type_ids_tensor = Tensor::from_array((shape, token_type_ids_flat))
            .context("Failed to create token_type_ids tensor")?;

        // last_hidden_state: [batch, seq_len, 384]
        let hidden_states = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                })
                .context("Embedding ONNX inference failed")?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .context("Failed to extract embedding output tensor")?;

            data.to_vec()
        };

        let embeddings = (0..batch_size)
            .map(|i| mean_pool(&hidden_states, &attention_mask_flat, i, max_len))
            .collect();

        Ok(embeddings)
    }
}

/// Average the token embeddings of row `i`, weighted by its attention mask.
fn mean_pool(hidden_states: &[f32], mask: &[i64], i: usize, max_len: usize) -> Vec<f64> {
    let mut sum = vec![0.0_f64; EMBEDDING_DIM];
    let mut mask_sum = 0.0_f64;

    for j in 0..max_len {
        let mask_val = mask[i * max_len + j] as f64;
        if mask_val > 0.0 {
            mask_sum += mask_val;
            let offset = (i * max_len + j) * EMBEDDING_DIM;
            for (k, slot) in sum.iter_mut().enumerate() {
                *slot += hidden_states[offset + k] as f64 * mask_val;
            }
        }
    }

    if mask_sum > 0.0 {
        for val in &mut sum {
            *val /= mask_sum;
        }
    }
    sum
}

/// Cosine similarity between two embedding vectors, clamped to 0.0..=1.0.
pub fn cosine_similarity_embeddings(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}

/// Title similarity backed by a [`SentenceEmbedder`].
pub struct EmbeddingTitleSimilarity {
    embedder: SentenceEmbedder,
}

impl EmbeddingTitleSimilarity {
    pub fn load(model_dir: &Path) -> Result<Self> {
        Ok(Self {
            embedder: SentenceEmbedder::load(model_dir)?,
        })
    }
}

impl TitleSimilarity for EmbeddingTitleSimilarity {
    fn similarity(&self, title_1: &str, title_2: &str) -> Result<f64> {
        let vectors = self
            .embedder
            .embed_batch(&[title_1.to_string(), title_2.to_string()])?;
        Ok(cosine_similarity_embeddings(&vectors[0], &vectors[1]))
    }

    /// Embed every distinct title once, then compare vectors in parallel.
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
        let mut distinct: Vec<String> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for (a, b) in pairs {
            for title in [a, b] {
                index.entry(title.as_str()).or_insert_with(|| {
                    distinct.push(title.clone());
                    distinct.len() - 1
                });
            }
        }

        let mut vectors: Vec<Vec<f64>> = Vec::with_capacity(distinct.len());
        for chunk in distinct.chunks(BATCH_SIZE) {
            vectors.extend(self.embedder.embed_batch(chunk)?);
        }
        info!(titles = distinct.len(), "Embedded label titles");

        Ok(pairs
            .par_iter()
            .map(|(a, b)| cosine_similarity_embeddings(&vectors[index[a.as_str()]], &vectors[index[b.as_str()]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity_embeddings(&a, &a) - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity_embeddings(&a, &b).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_opposite_clamps_to_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert_eq!(cosine_similarity_embeddings(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_mismatched_or_zero() {
        assert_eq!(cosine_similarity_embeddings(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity_embeddings(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity_embeddings(&[], &[]), 0.0);
    }

    #[test]
    fn test_mean_pool_ignores_padding() {
        // One row, two positions; only the first is a real token.
        let mut hidden = vec![0.0_f32; 2 * EMBEDDING_DIM];
        hidden[0] = 2.0;
        hidden[EMBEDDING_DIM] = 100.0;
        let pooled = mean_pool(&hidden, &[1, 0], 0, 2);
        assert_eq!(pooled.len(), EMBEDDING_DIM);
        assert!((pooled[0] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_load_missing_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmbeddingTitleSimilarity::load(dir.path()).err().unwrap();
        assert!(err.to_string().contains("download-model"));
    }
}
