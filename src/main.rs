use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use label_overlap::config::Config;
use label_overlap::dataset::{loader, RawRecord, TitleTable};

/// label-overlap: cross-label lexical overlap analysis.
///
/// Measures how much vocabulary the records of each pair of labels share,
/// flagging label pairs a classifier is likely to confuse.
#[derive(Parser)]
#[command(name = "label-overlap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and write the overlap matrix
    Run,

    /// Build (or load) and show the label frequency index
    Frequency,

    /// Build (or load) the label pair list with title similarity
    Pairs,

    /// Show the top record combinations of one label pair
    Inspect {
        /// First label code
        label_1: u64,

        /// Second label code
        label_2: u64,

        /// Number of rows to show (default: 20)
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Show the overlap matrix ranked by overlap score
    Report {
        /// Number of pairs to show (default: 25)
        #[arg(long, default_value = "25")]
        limit: usize,

        /// Only include pairs at or above this overlap score (0-100)
        #[arg(long, default_value = "0")]
        min_score: f64,
    },

    /// Show checkpoint status (index, pairs, caches, last run)
    Status,

    /// Download the ONNX sentence embedding model (~90 MB)
    DownloadModel,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("label_overlap=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
        .context("Failed to start worker pool")?;

    match cli.command {
        Commands::Run => {
            config.require_inputs()?;
            config.require_similarity()?;

            let (raw, tables) = load_inputs(&config)?;
            let similarity = label_overlap::similarity::create_similarity(&config)?;

            println!("Running overlap analysis in {}...", config.data_dir.display());

            let analysis =
                label_overlap::analysis::matrix::OverlapAnalysis::new(config.clone()).with_progress(true);
            let outcome = analysis.run(&raw, &tables, similarity.as_ref())?;

            println!("\n{}", "Overlap analysis complete.".bold());
            label_overlap::output::terminal::display_run_summary(&outcome.summary);
            println!(
                "\n{}",
                format!("Result saved to: {}", config.result_path().display()).bold()
            );
        }

        Commands::Frequency => {
            let labels = load_label_index(&config)?;
            label_overlap::output::terminal::display_label_index(&labels);
        }

        Commands::Pairs => {
            config.require_similarity()?;
            let labels = load_label_index(&config)?;
            let similarity = label_overlap::similarity::create_similarity(&config)?;

            let pairs = label_overlap::labels::pairs::load_or_build_pairs(
                &config.title_similarity_path(),
                &labels,
                similarity.as_ref(),
            )?;

            println!(
                "{} pairs from {} labels saved to: {}",
                pairs.len(),
                labels.len(),
                config.title_similarity_path().display()
            );
        }

        Commands::Inspect {
            label_1,
            label_2,
            limit,
        } => {
            let key = label_overlap::labels::pairs::PairKey::canonical(label_1, label_2)?;
            let path = config.overlap_scores_path().join(
                label_overlap::analysis::cross_product::cache_file_name(key),
            );

            if !path.is_file() {
                println!(
                    "No cached overlap for {} x {}. Run `label-overlap run` first.",
                    key.label_1, key.label_2
                );
                return Ok(());
            }

            let cells = label_overlap::analysis::cross_product::read_pair_cache(&path)?;
            label_overlap::output::terminal::display_pair_detail(
                key.label_1,
                key.label_2,
                &cells,
                limit,
            );
        }

        Commands::Report { limit, min_score } => {
            let path = config.result_path();
            if !path.is_file() {
                println!("No overlap matrix yet. Run `label-overlap run` first.");
                return Ok(());
            }

            let rows = label_overlap::analysis::matrix::read_matrix(&path)?;
            let ranked = label_overlap::analysis::matrix::rank_rows(&rows, min_score);
            let shown: Vec<_> = ranked.into_iter().take(limit).collect();

            label_overlap::output::terminal::display_overlap_report(&shown);

            let failed = rows.iter().filter(|r| r.similarity.is_none()).count();
            if failed > 0 {
                println!(
                    "  {} {failed} pairs have no score (see `label-overlap status`)",
                    "Warning:".yellow()
                );
            }
        }

        Commands::Status => {
            label_overlap::status::show(&config)?;
        }

        Commands::DownloadModel => {
            let model_dir = &config.model_dir;

            println!("Downloading ONNX embedding model...");
            println!("  Destination: {}", model_dir.display());

            label_overlap::similarity::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("Set OVERLAP_SIMILARITY=embedding to compare label titles semantically.");
        }
    }

    Ok(())
}

/// Load the dataset and every title table named in the configuration.
fn load_inputs(config: &Config) -> Result<(Vec<RawRecord>, Vec<TitleTable>)> {
    let raw = loader::load_dataset(
        &config.dataset_path(),
        &config.label_column,
        &config.text_columns,
    )?;
    let tables = loader::load_title_tables(&config.title_table_paths())?;
    Ok((raw, tables))
}

/// Load the persisted label index, building it from the inputs only when missing.
fn load_label_index(config: &Config) -> Result<Vec<label_overlap::labels::frequency::Label>> {
    let path = config.label_frequency_path();
    if path.is_file() {
        return label_overlap::labels::frequency::load_or_build_label_index(&path, [], &[]);
    }

    config.require_inputs()?;
    let (raw, tables) = load_inputs(config)?;
    info!(records = raw.len(), "Building label frequency index");
    label_overlap::labels::frequency::load_or_build_label_index(
        &path,
        raw.iter().map(|r| r.label),
        &tables,
    )
}
