// Label pair enumeration.
//
// Every label is paired with every other label exactly once, keyed on code:
// the full code × code grid minus self-pairs, keeping only the orientation
// where the first code is numerically smaller. Titles may collide between
// different codes; that never merges pairs.
//
// Like the frequency index, the pair list is a checkpoint loaded verbatim
// when present.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::frequency::Label;
use crate::similarity::traits::TitleSimilarity;
use crate::store;

/// Column order of the persisted pair file.
pub const PAIR_HEADERS: [&str; 5] = [
    "label_1",
    "label_2",
    "label_1_title",
    "label_2_title",
    "titles_similarity_score",
];

/// Canonical, unordered identity of a label pair (smaller code first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    pub label_1: u64,
    pub label_2: u64,
}

impl PairKey {
    /// Canonical key for two distinct codes, in either order.
    pub fn canonical(a: u64, b: u64) -> Result<Self> {
        if a == b {
            anyhow::bail!("A label cannot be paired with itself ({a})");
        }
        Ok(Self {
            label_1: a.min(b),
            label_2: a.max(b),
        })
    }
}

/// A label pair with its titles and title similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPair {
    pub label_1: u64,
    pub label_2: u64,
    pub label_1_title: String,
    pub label_2_title: String,
    pub titles_similarity_score: f64,
}

impl LabelPair {
    pub fn key(&self) -> PairKey {
        PairKey {
            label_1: self.label_1,
            label_2: self.label_2,
        }
    }
}

/// All canonical pairs of the index, in index order.
///
/// Walks the grid row by row in the order labels appear in the index and
/// keeps `(a, b)` only when `a.code < b.code`.
pub fn enumerate_pairs(labels: &[Label]) -> Vec<(&Label, &Label)> {
    labels
        .iter()
        .flat_map(|a| labels.iter().map(move |b| (a, b)))
        .filter(|(a, b)| a.code < b.code)
        .collect()
}

/// Enumerate pairs and score their titles with `similarity`.
pub fn build_pairs(labels: &[Label], similarity: &dyn TitleSimilarity) -> Result<Vec<LabelPair>> {
    let grid = enumerate_pairs(labels);

    let titles: Vec<(String, String)> = grid
        .iter()
        .map(|(a, b)| (a.title.clone(), b.title.clone()))
        .collect();
    let scores = similarity
        .score_pairs(&titles)
        .context("Failed to score label title similarity")?;

    if scores.len() != grid.len() {
        anyhow::bail!(
            "Title similarity returned {} scores for {} pairs",
            scores.len(),
            grid.len()
        );
    }

    Ok(grid
        .into_iter()
        .zip(scores)
        .map(|((a, b), score)| LabelPair {
            label_1: a.code,
            label_2: b.code,
            label_1_title: a.title.clone(),
            label_2_title: b.title.clone(),
            titles_similarity_score: score,
        })
        .collect())
}

/// Load the persisted pair file if present, otherwise build and persist it.
pub fn load_or_build_pairs(
    path: &Path,
    labels: &[Label],
    similarity: &dyn TitleSimilarity,
) -> Result<Vec<LabelPair>> {
    if path.is_file() {
        let pairs: Vec<LabelPair> = store::read_csv(path)?;
        info!(pairs = pairs.len(), path = %path.display(), "Label similarity file found");
        return Ok(pairs);
    }

    info!(labels = labels.len(), "Label similarity file not found, generating");
    let pairs = build_pairs(labels, similarity)?;

    store::write_csv_atomic(path, &PAIR_HEADERS, &pairs)?;
    info!(pairs = pairs.len(), path = %path.display(), "Label similarity file saved");

    Ok(pairs)
}
