// Checkpoint status display: which pipeline steps are done for a data dir.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::analysis::matrix::read_run_summary;
use crate::config::Config;
use crate::store;

/// Counts of files in the per-pair cache directory.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheCounts {
    /// Completed pair cache files
    pub pairs: usize,
    /// Leftover temp files from interrupted writes
    pub stale_temp: usize,
}

/// Count pair caches and interrupted writes under `dir`.
pub fn count_pair_caches(dir: &Path) -> Result<CacheCounts> {
    let mut counts = CacheCounts::default();
    if !dir.is_dir() {
        return Ok(counts);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if store::is_temp_file(&path) {
            counts.stale_temp += 1;
        } else if path.extension().is_some_and(|e| e == "csv") {
            counts.pairs += 1;
        }
    }
    Ok(counts)
}

/// Display checkpoint status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    println!("Data directory: {}", config.data_dir.display());

    let checkpoint = |name: &str, path: &Path| {
        let state = match fs::metadata(path) {
            Ok(meta) => format!("present ({})", format_bytes(meta.len())),
            Err(_) => "not yet built".to_string(),
        };
        println!("{name:<18} {state}");
    };

    checkpoint("Dataset:", &config.dataset_path());
    checkpoint("Label frequency:", &config.label_frequency_path());
    checkpoint("Label pairs:", &config.title_similarity_path());
    checkpoint("Overlap matrix:", &config.result_path());

    let counts = count_pair_caches(&config.overlap_scores_path())?;
    println!("{:<18} {} cached", "Pair caches:", counts.pairs);
    if counts.stale_temp > 0 {
        println!(
            "{:<18} {} interrupted writes (safe to delete)",
            "",
            counts.stale_temp
        );
    }

    match read_run_summary(&config.run_summary_path())? {
        Some(summary) => {
            println!(
                "Last run: {} ({} pairs, {} failed)",
                summary.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                summary.pairs,
                summary.failures.len()
            );
        }
        None => {
            println!("Last run: never");
            println!("  Run `label-overlap run` to build the overlap matrix");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pair_caches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("overlap_1_2.csv"), "x").unwrap();
        fs::write(dir.path().join("overlap_1_3.csv"), "x").unwrap();
        fs::write(dir.path().join(".overlap_2_3.csv.42.0.tmp"), "x").unwrap();

        let counts = count_pair_caches(dir.path()).unwrap();
        assert_eq!(counts, CacheCounts { pairs: 2, stale_temp: 1 });
    }

    #[test]
    fn test_missing_cache_dir_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counts = count_pair_caches(&dir.path().join("nope")).unwrap();
        assert_eq!(counts, CacheCounts::default());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }
}
