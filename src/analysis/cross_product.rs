// Cross-product overlap aggregation for one label pair.
//
// Every record of label A is scored against every record of label B. The
// result is persisted as a per-pair cache file and reduced to one scalar:
// the mean overlap score over the full cross product.
//
// Records with identical normalized text collapse to one combination, so
// the cross product is evaluated over distinct values with multiplicities:
// a combination of values seen m and n times has `count = m * n`. Each
// distinct combination is scored once on the worker pool.
//
// The mean is always weighted by `count`. A cache hit recomputes it from
// the persisted rows and their counts, which gives exactly the value the
// cache miss returned, so resuming from cache never drifts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::Record;
use crate::labels::pairs::PairKey;
use crate::lexical::overlap::unigrams_in_common;
use crate::store;

/// Column order of a per-pair cache file.
pub const CACHE_HEADERS: [&str; 5] = [
    "lid_1_reduced",
    "lid_2_reduced",
    "unigram_overlap_score",
    "common_unigrams",
    "count",
];

/// One distinct record × record combination of a label pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapCell {
    #[serde(rename = "lid_1_reduced")]
    pub tokens_1: String,
    #[serde(rename = "lid_2_reduced")]
    pub tokens_2: String,
    /// Overlap ratio scaled to 0..=100
    #[serde(rename = "unigram_overlap_score")]
    pub score: f64,
    #[serde(rename = "common_unigrams")]
    pub shared: String,
    /// Occurrences of this combination in the full cross product
    pub count: u64,
}

/// Where a pair's mean came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSource {
    Cache,
    Computed,
}

/// The aggregated overlap of one label pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PairOverlap {
    pub key: PairKey,
    /// Mean score over the full cross product, 0..=100
    pub mean: f64,
    /// Distinct combinations (rows in the cache file)
    pub distinct: usize,
    /// Size of the full cross product
    pub combinations: u64,
    pub source: PairSource,
}

/// Distinct normalized values of each label, with multiplicities, in
/// order of first appearance.
#[derive(Debug, Default)]
pub struct LabelGroups {
    groups: HashMap<u64, Vec<(String, u64)>>,
}

impl LabelGroups {
    pub fn from_records(records: &[Record]) -> Self {
        let mut groups: HashMap<u64, Vec<(String, u64)>> = HashMap::new();
        let mut positions: HashMap<(u64, &str), usize> = HashMap::new();

        for record in records {
            let values = groups.entry(record.label).or_default();
            match positions.get(&(record.label, record.tokens.as_str())) {
                Some(&i) => values[i].1 += 1,
                None => {
                    positions.insert((record.label, record.tokens.as_str()), values.len());
                    values.push((record.tokens.clone(), 1));
                }
            }
        }

        Self { groups }
    }

    /// Distinct values of `label`, or an error when it has no records.
    pub fn values(&self, label: u64) -> Result<&[(String, u64)]> {
        self.groups
            .get(&label)
            .map(Vec::as_slice)
            .ok_or_else(|| anyhow::anyhow!("Label {label} has no records in the dataset"))
    }
}

/// Cache file name for a pair, e.g. `overlap_43211500_43211600.csv`.
pub fn cache_file_name(key: PairKey) -> String {
    format!("overlap_{}_{}.csv", key.label_1, key.label_2)
}

/// Score every distinct combination of two value groups.
///
/// Rows come back sorted by descending score; ties keep cross-product
/// order (A-major).
pub fn score_cross_product(group_1: &[(String, u64)], group_2: &[(String, u64)]) -> Vec<OverlapCell> {
    let combos: Vec<(&(String, u64), &(String, u64))> = group_1
        .iter()
        .flat_map(|a| group_2.iter().map(move |b| (a, b)))
        .collect();

    let mut cells: Vec<OverlapCell> = combos
        .par_iter()
        .map(|((tokens_1, m), (tokens_2, n))| {
            let overlap = unigrams_in_common(tokens_1, tokens_2);
            OverlapCell {
                tokens_1: tokens_1.clone(),
                tokens_2: tokens_2.clone(),
                score: overlap.ratio * 100.0,
                shared: overlap.shared,
                count: m * n,
            }
        })
        .collect();

    cells.sort_by(|a, b| b.score.total_cmp(&a.score));
    cells
}

/// Mean score over the full cross product, each row weighted by its count.
pub fn weighted_mean(cells: &[OverlapCell]) -> Result<f64> {
    let total: u64 = cells.iter().map(|c| c.count).sum();
    if total == 0 {
        anyhow::bail!("Cannot average an empty cross product");
    }
    let sum: f64 = cells.iter().map(|c| c.score * c.count as f64).sum();
    Ok(sum / total as f64)
}

/// Read and validate a per-pair cache file.
///
/// Anything other than the exact header, at least one row, scores within
/// 0..=100 and positive counts is reported as corrupt.
pub fn read_pair_cache(path: &Path) -> Result<Vec<OverlapCell>> {
    let headers = store::read_csv_headers(path)?;
    if headers != CACHE_HEADERS {
        anyhow::bail!("Unexpected cache header in {}: {:?}", path.display(), headers);
    }

    let cells: Vec<OverlapCell> = store::read_csv(path)?;
    if cells.is_empty() {
        anyhow::bail!("Cache file {} has no rows", path.display());
    }
    if let Some(bad) = cells
        .iter()
        .find(|c| !(0.0..=100.0).contains(&c.score) || c.count == 0)
    {
        anyhow::bail!(
            "Cache file {} has an invalid row (score {}, count {})",
            path.display(),
            bad.score,
            bad.count
        );
    }

    Ok(cells)
}

/// Computes, caches and averages label pair cross products.
pub struct CrossProductAggregator {
    cache_dir: PathBuf,
    groups: LabelGroups,
}

impl CrossProductAggregator {
    pub fn new(cache_dir: impl Into<PathBuf>, records: &[Record]) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            groups: LabelGroups::from_records(records),
        }
    }

    pub fn cache_path(&self, key: PairKey) -> PathBuf {
        self.cache_dir.join(cache_file_name(key))
    }

    /// Mean overlap of a pair, from its cache file when present.
    ///
    /// A corrupt cache file is deleted and the pair is recomputed.
    pub fn aggregate(&self, key: PairKey) -> Result<PairOverlap> {
        let path = self.cache_path(key);

        if path.is_file() {
            match read_pair_cache(&path) {
                Ok(cells) => return summarize(key, &cells, PairSource::Cache),
                Err(e) => {
                    warn!(
                        label_1 = key.label_1,
                        label_2 = key.label_2,
                        error = %e,
                        "Discarding corrupt overlap cache"
                    );
                    fs::remove_file(&path)
                        .with_context(|| format!("Failed to remove {}", path.display()))?;
                }
            }
        }

        let cells = score_cross_product(
            self.groups.values(key.label_1)?,
            self.groups.values(key.label_2)?,
        );

        fs::create_dir_all(&self.cache_dir)
            .with_context(|| format!("Failed to create {}", self.cache_dir.display()))?;
        store::write_csv_atomic(&path, &CACHE_HEADERS, &cells)?;

        debug!(
            label_1 = key.label_1,
            label_2 = key.label_2,
            distinct = cells.len(),
            "Computed pair overlap"
        );

        summarize(key, &cells, PairSource::Computed)
    }
}

fn summarize(key: PairKey, cells: &[OverlapCell], source: PairSource) -> Result<PairOverlap> {
    Ok(PairOverlap {
        key,
        mean: weighted_mean(cells)?,
        distinct: cells.len(),
        combinations: cells.iter().map(|c| c.count).sum(),
        source,
    })
}
