use std::env;
use std::path::PathBuf;

use anyhow::Result;

use crate::lexical::normalize::DEFAULT_SPECIAL_CHARS;
use crate::similarity::download;
use crate::similarity::traits::SimilarityMetric;

/// Default free-text columns, concatenated in this order.
pub const DEFAULT_TEXT_COLUMNS: [&str; 4] = [
    "PartDescription1",
    "PartDescription2",
    "InvoiceDescription",
    "PODescription",
];

/// Default reference tables, lowest precedence first.
pub const DEFAULT_TITLE_TABLES: [&str; 3] =
    ["titles_v23_1.csv", "titles_v23_2.csv", "titles_v23_3.csv"];

/// Central configuration loaded from environment variables.
///
/// Every file name is relative to `data_dir`. The .env file is loaded
/// automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding inputs, checkpoints and results
    pub data_dir: PathBuf,
    pub dataset_file: String,
    /// Column holding the label code of each record
    pub label_column: String,
    pub text_columns: Vec<String>,
    /// Code-to-title CSVs; a later table overrides an earlier one
    pub title_tables: Vec<String>,
    pub label_frequency_file: String,
    pub title_similarity_file: String,
    /// Directory of per-pair overlap caches
    pub overlap_scores_dir: String,
    pub result_file: String,
    pub run_summary_file: String,
    /// Characters replaced by a space before tokenizing
    pub special_chars: String,
    /// Which title similarity strategy to use (default: unigram)
    pub similarity_metric: SimilarityMetric,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    /// Worker pool size; 0 uses every core
    pub threads: usize,
}

/// Platform data directory for this tool (~/.local/share/label-overlap on Linux).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("label-overlap")
}

impl Config {
    /// Default configuration with everything under `data_dir`.
    pub fn rooted_at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            dataset_file: "dataset.csv".to_string(),
            label_column: "v23_level3".to_string(),
            text_columns: DEFAULT_TEXT_COLUMNS.iter().map(|s| s.to_string()).collect(),
            title_tables: DEFAULT_TITLE_TABLES.iter().map(|s| s.to_string()).collect(),
            label_frequency_file: "label_frequency.csv".to_string(),
            title_similarity_file: "unspsc_title_similarity.csv".to_string(),
            overlap_scores_dir: "overlap_scores".to_string(),
            result_file: "oa_results.csv".to_string(),
            run_summary_file: "last_run.json".to_string(),
            special_chars: DEFAULT_SPECIAL_CHARS.to_string(),
            similarity_metric: SimilarityMetric::default(),
            model_dir: download::default_model_dir(),
            threads: 0,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Every variable is optional; unset ones keep the defaults of
    /// [`Config::rooted_at`].
    pub fn load() -> Result<Self> {
        let data_dir = env::var("OVERLAP_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());
        let mut config = Self::rooted_at(data_dir);

        let set = |target: &mut String, var: &str| {
            if let Ok(value) = env::var(var) {
                *target = value;
            }
        };
        set(&mut config.dataset_file, "OVERLAP_DATASET");
        set(&mut config.label_column, "OVERLAP_LABEL_COLUMN");
        set(&mut config.label_frequency_file, "OVERLAP_LABEL_FREQUENCY");
        set(&mut config.title_similarity_file, "OVERLAP_TITLE_SIMILARITY");
        set(&mut config.overlap_scores_dir, "OVERLAP_SCORES_DIR");
        set(&mut config.result_file, "OVERLAP_RESULT");
        set(&mut config.special_chars, "OVERLAP_SPECIAL_CHARS");

        if let Ok(columns) = env::var("OVERLAP_TEXT_COLUMNS") {
            config.text_columns = split_list(&columns);
        }
        if let Ok(tables) = env::var("OVERLAP_TITLE_TABLES") {
            config.title_tables = split_list(&tables);
        }
        if let Ok(metric) = env::var("OVERLAP_SIMILARITY") {
            config.similarity_metric = metric.parse()?;
        }
        if let Ok(dir) = env::var("OVERLAP_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Ok(threads) = env::var("OVERLAP_THREADS") {
            config.threads = threads.trim().parse().map_err(|_| {
                anyhow::anyhow!("OVERLAP_THREADS must be a non-negative integer, got '{threads}'")
            })?;
        }

        Ok(config)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.data_dir.join(&self.dataset_file)
    }

    pub fn title_table_paths(&self) -> Vec<PathBuf> {
        self.title_tables.iter().map(|t| self.data_dir.join(t)).collect()
    }

    pub fn label_frequency_path(&self) -> PathBuf {
        self.data_dir.join(&self.label_frequency_file)
    }

    pub fn title_similarity_path(&self) -> PathBuf {
        self.data_dir.join(&self.title_similarity_file)
    }

    pub fn overlap_scores_path(&self) -> PathBuf {
        self.data_dir.join(&self.overlap_scores_dir)
    }

    pub fn result_path(&self) -> PathBuf {
        self.data_dir.join(&self.result_file)
    }

    pub fn run_summary_path(&self) -> PathBuf {
        self.data_dir.join(&self.run_summary_file)
    }

    /// Check that the dataset and every title table exist.
    /// Call this before any operation that reads the inputs.
    pub fn require_inputs(&self) -> Result<()> {
        let dataset = self.dataset_path();
        if !dataset.is_file() {
            anyhow::bail!(
                "Dataset not found: {}\n\
                 Set OVERLAP_DATA_DIR / OVERLAP_DATASET to point at it.",
                dataset.display()
            );
        }
        for table in self.title_table_paths() {
            if !table.is_file() {
                anyhow::bail!(
                    "Title table not found: {}\n\
                     Set OVERLAP_TITLE_TABLES to a comma-separated list of Code,Title CSVs.",
                    table.display()
                );
            }
        }
        Ok(())
    }

    /// Validate that the chosen similarity strategy has what it needs.
    /// For embedding: model files must exist (or user should run download-model).
    pub fn require_similarity(&self) -> Result<()> {
        match self.similarity_metric {
            SimilarityMetric::UnigramOverlap => Ok(()),
            SimilarityMetric::Embedding => {
                if !download::embedding_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "Embedding model files not found in {}\n\
                         Run `label-overlap download-model` to download them.\n\
                         Or set OVERLAP_SIMILARITY=unigram to compare titles by shared words.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
