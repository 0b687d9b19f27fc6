// Title similarity trait: the swap-ready abstraction.
//
// Label titles are compared by a pluggable strategy. The default compares
// their unigrams with the same overlap score used for records; the
// embedding strategy runs a local sentence-transformer instead. Callers
// only see this trait, so adding a strategy never touches the pipeline.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use rayon::prelude::*;

/// Which title similarity strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityMetric {
    /// Unigram overlap ratio of the two titles (default, no model needed)
    #[default]
    UnigramOverlap,
    /// Cosine similarity of local ONNX sentence embeddings
    Embedding,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::UnigramOverlap => "unigram",
            SimilarityMetric::Embedding => "embedding",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unigram" | "unigram_overlap" => Ok(SimilarityMetric::UnigramOverlap),
            "embedding" | "onnx" => Ok(SimilarityMetric::Embedding),
            other => anyhow::bail!("Unknown similarity metric '{other}' (expected unigram or embedding)"),
        }
    }
}

/// Scores how semantically close two label titles are, from 0.0 to 1.0.
pub trait TitleSimilarity: Send + Sync {
    /// Score a single pair of titles.
    fn similarity(&self, title_1: &str, title_2: &str) -> Result<f64>;

    /// Score many pairs, returning results in the same order.
    /// Default implementation scores pairs independently on the worker
    /// pool; strategies with per-text setup cost can override it.
    fn score_pairs(&self, pairs: &[(String, String)]) -> Result<Vec<f64>> {
        pairs
            .par_iter()
            .map(|(a, b)| self.similarity(a, b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_parsing() {
        assert_eq!("unigram".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::UnigramOverlap);
        assert_eq!(" Embedding ".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Embedding);
        assert!("spacy".parse::<SimilarityMetric>().is_err());
    }

    #[test]
    fn test_metric_display_round_trips() {
        for metric in [SimilarityMetric::UnigramOverlap, SimilarityMetric::Embedding] {
            assert_eq!(metric.to_string().parse::<SimilarityMetric>().unwrap(), metric);
        }
    }

    struct ConstantSimilarity(f64);

    impl TitleSimilarity for ConstantSimilarity {
        fn similarity(&self, _a: &str, _b: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_default_batch_preserves_order_and_length() {
        let pairs: Vec<(String, String)> = (0..50)
            .map(|i| (format!("a{i}"), format!("b{i}")))
            .collect();
        let scores = ConstantSimilarity(0.25).score_pairs(&pairs).unwrap();
        assert_eq!(scores.len(), 50);
        assert!(scores.iter().all(|&s| s == 0.25));
    }
}
