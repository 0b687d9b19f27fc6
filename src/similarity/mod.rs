// Title similarity: trait-based abstraction for swappable strategies.
//
// TitleSimilarity is the interface; `create_similarity` picks the
// implementation named by configuration.

pub mod download;
pub mod embeddings;
pub mod traits;
pub mod unigram;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::lexical::normalize::UnigramNormalizer;
use traits::{SimilarityMetric, TitleSimilarity};

/// Create the title similarity strategy selected in `config`.
pub fn create_similarity(config: &Config) -> Result<Box<dyn TitleSimilarity>> {
    match config.similarity_metric {
        SimilarityMetric::UnigramOverlap => {
            info!("Using unigram overlap title similarity");
            let normalizer = UnigramNormalizer::new(&config.special_chars);
            Ok(Box::new(unigram::UnigramTitleSimilarity::new(normalizer)))
        }
        SimilarityMetric::Embedding => {
            info!("Using local ONNX embedding title similarity");
            let dir = download::embedding_model_dir(&config.model_dir);
            Ok(Box::new(embeddings::EmbeddingTitleSimilarity::load(&dir)?))
        }
    }
}
