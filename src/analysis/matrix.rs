// Overlap matrix orchestration: the end-to-end batch.
//
// Strategy: build or load the label index, build or load the pair list,
// normalize the dataset, then aggregate each pair in turn. Every pair
// writes its own cache file, so an interrupted run resumes where it left
// off. The matrix itself is written once, after every pair has resolved.
//
// A failing pair is logged and recorded in the run summary; its similarity
// cell stays empty and the remaining pairs still run.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::cross_product::{CrossProductAggregator, PairSource};
use crate::config::Config;
use crate::dataset::{normalize_dataset, RawRecord, TitleTable};
use crate::labels::frequency::load_or_build_label_index;
use crate::labels::pairs::{load_or_build_pairs, LabelPair};
use crate::lexical::normalize::UnigramNormalizer;
use crate::similarity::traits::TitleSimilarity;
use crate::store;

/// Column order of the final matrix.
pub const MATRIX_HEADERS: [&str; 6] = [
    "label_1",
    "label_2",
    "label_1_title",
    "label_2_title",
    "titles_similarity_score",
    "similarity",
];

/// One row of the final overlap matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapRow {
    pub label_1: u64,
    pub label_2: u64,
    pub label_1_title: String,
    pub label_2_title: String,
    pub titles_similarity_score: f64,
    /// Mean unigram overlap (0..=100); empty when the pair failed
    pub similarity: Option<f64>,
}

impl OverlapRow {
    fn from_pair(pair: LabelPair, similarity: Option<f64>) -> Self {
        Self {
            label_1: pair.label_1,
            label_2: pair.label_2,
            label_1_title: pair.label_1_title,
            label_2_title: pair.label_2_title,
            titles_similarity_score: pair.titles_similarity_score,
            similarity,
        }
    }
}

/// A pair that could not be aggregated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairFailure {
    pub label_1: u64,
    pub label_2: u64,
    pub error: String,
}

/// What a run did, persisted next to the matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub finished_at: DateTime<Utc>,
    pub labels: usize,
    pub pairs: usize,
    pub cache_hits: usize,
    pub computed: usize,
    pub failures: Vec<PairFailure>,
}

/// The matrix rows and the summary of the run that produced them.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub rows: Vec<OverlapRow>,
    pub summary: RunSummary,
}

/// Drives one overlap analysis run over a data directory.
pub struct OverlapAnalysis {
    config: Config,
    show_progress: bool,
}

impl OverlapAnalysis {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Draw a progress bar over the pair loop.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline and write the matrix and run summary.
    pub fn run(
        &self,
        raw: &[RawRecord],
        tables: &[TitleTable],
        similarity: &dyn TitleSimilarity,
    ) -> Result<RunOutcome> {
        let labels = load_or_build_label_index(
            &self.config.label_frequency_path(),
            raw.iter().map(|r| r.label),
            tables,
        )?;
        let pairs = load_or_build_pairs(&self.config.title_similarity_path(), &labels, similarity)?;

        info!("Preprocessing record descriptions");
        let normalizer = UnigramNormalizer::new(&self.config.special_chars);
        let records = normalize_dataset(raw, &normalizer);

        let aggregator = CrossProductAggregator::new(self.config.overlap_scores_path(), &records);

        info!(pairs = pairs.len(), "Beginning overlap analysis");
        let (rows, mut summary) = self.aggregate_pairs(&aggregator, pairs)?;
        summary.labels = labels.len();

        store::write_csv_atomic(&self.config.result_path(), &MATRIX_HEADERS, &rows)?;
        store::write_json_atomic(&self.config.run_summary_path(), &summary)?;

        info!(
            path = %self.config.result_path().display(),
            computed = summary.computed,
            cache_hits = summary.cache_hits,
            failed = summary.failures.len(),
            "Overlap analysis concluded"
        );

        Ok(RunOutcome { rows, summary })
    }

    fn aggregate_pairs(
        &self,
        aggregator: &CrossProductAggregator,
        pairs: Vec<LabelPair>,
    ) -> Result<(Vec<OverlapRow>, RunSummary)> {
        let pb = if self.show_progress {
            let pb = ProgressBar::new(pairs.len() as u64);
            pb.set_style(ProgressStyle::default_bar().template("  Pairs [{bar:30}] {pos}/{len} ({eta})")?);
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut summary = RunSummary {
            finished_at: Utc::now(),
            labels: 0,
            pairs: pairs.len(),
            cache_hits: 0,
            computed: 0,
            failures: Vec::new(),
        };
        let mut rows = Vec::with_capacity(pairs.len());

        for pair in pairs {
            let key = pair.key();
            let similarity = match aggregator.aggregate(key) {
                Ok(overlap) => {
                    match overlap.source {
                        PairSource::Cache => summary.cache_hits += 1,
                        PairSource::Computed => summary.computed += 1,
                    }
                    Some(overlap.mean)
                }
                Err(e) => {
                    warn!(
                        label_1 = key.label_1,
                        label_2 = key.label_2,
                        error = %e,
                        "Failed to aggregate pair, skipping"
                    );
                    summary.failures.push(PairFailure {
                        label_1: key.label_1,
                        label_2: key.label_2,
                        error: format!("{e:#}"),
                    });
                    None
                }
            };
            rows.push(OverlapRow::from_pair(pair, similarity));
            pb.inc(1);
        }
        pb.finish_and_clear();

        summary.finished_at = Utc::now();
        Ok((rows, summary))
    }
}

/// Read a previously written overlap matrix.
pub fn read_matrix(path: &Path) -> Result<Vec<OverlapRow>> {
    store::read_csv(path)
}

/// Read the summary of the last completed run, if any.
pub fn read_run_summary(path: &Path) -> Result<Option<RunSummary>> {
    if !path.is_file() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run summary {}", path.display()))?;
    let summary = serde_json::from_str(&json)
        .with_context(|| format!("Malformed run summary {}", path.display()))?;
    Ok(Some(summary))
}

/// Matrix rows with a score, highest overlap first.
pub fn rank_rows(rows: &[OverlapRow], min_score: f64) -> Vec<&OverlapRow> {
    let mut ranked: Vec<&OverlapRow> = rows
        .iter()
        .filter(|r| r.similarity.is_some_and(|s| s >= min_score))
        .collect();
    ranked.sort_by(|a, b| {
        b.similarity
            .unwrap_or(0.0)
            .total_cmp(&a.similarity.unwrap_or(0.0))
    });
    ranked
}
