// Unigram title similarity: the default strategy.
//
// Titles go through the same normalizer as record text and are scored with
// the overlap ratio. Zero setup, runs anywhere, but only sees shared words:
// "Notebook computers" and "Laptops" score 0.0.

use anyhow::Result;

use super::traits::TitleSimilarity;
use crate::lexical::normalize::UnigramNormalizer;
use crate::lexical::overlap::unigrams_in_common;

#[derive(Debug, Clone, Default)]
pub struct UnigramTitleSimilarity {
    normalizer: UnigramNormalizer,
}

impl UnigramTitleSimilarity {
    pub fn new(normalizer: UnigramNormalizer) -> Self {
        Self { normalizer }
    }
}

impl TitleSimilarity for UnigramTitleSimilarity {
    fn similarity(&self, title_1: &str, title_2: &str) -> Result<f64> {
        let a = self.normalizer.normalize(Some(title_1));
        let b = self.normalizer.normalize(Some(title_2));
        Ok(unigrams_in_common(&a, &b).ratio)
    }
}
