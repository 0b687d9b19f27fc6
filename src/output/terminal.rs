// Colored terminal output for label indexes, overlap reports and pair detail.
//
// This module handles all terminal-specific formatting: colors, tables and
// summaries. The main.rs commands delegate here.

use colored::Colorize;

use super::truncate_chars;
use crate::analysis::cross_product::OverlapCell;
use crate::analysis::matrix::{OverlapRow, RunSummary};
use crate::labels::frequency::Label;

/// Overlap band of a 0..=100 mean score, for display only.
pub fn overlap_band(score: f64) -> &'static str {
    match score {
        s if s >= 50.0 => "High",
        s if s >= 25.0 => "Elevated",
        s if s >= 10.0 => "Watch",
        _ => "Low",
    }
}

/// Display the label frequency index.
pub fn display_label_index(labels: &[Label]) {
    if labels.is_empty() {
        println!("No labels with a known title. Check the title tables.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Label Frequency ({} labels) ===", labels.len()).bold()
    );
    println!();
    println!(
        "  {:>4}  {:<10} {:>5} {:>8}  {}",
        "Rank".dimmed(),
        "Label".dimmed(),
        "Level".dimmed(),
        "Count".dimmed(),
        "Title".dimmed(),
    );
    println!("  {}", "-".repeat(78).dimmed());

    for (i, label) in labels.iter().enumerate() {
        println!(
            "  {:>4}. {:<10} {:>5} {:>8}  {}",
            i + 1,
            label.code,
            label.level,
            label.count,
            truncate_chars(&label.title, 48),
        );
    }
    println!();
}

/// Display the overlap matrix ranked by score.
pub fn display_overlap_report(rows: &[&OverlapRow]) {
    if rows.is_empty() {
        println!("No scored pairs. Run `label-overlap run` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Label Overlap Report ({} pairs) ===", rows.len()).bold()
    );
    println!();
    println!(
        "  {:>4}  {:<10} {:<10} {:>7} {:>6}  {:<10} {}",
        "Rank".dimmed(),
        "Label 1".dimmed(),
        "Label 2".dimmed(),
        "Overlap".dimmed(),
        "TSim".dimmed(),
        "Band".dimmed(),
        "Titles".dimmed(),
    );
    println!("  {}", "-".repeat(96).dimmed());

    for (i, row) in rows.iter().enumerate() {
        let score = row.similarity.unwrap_or(0.0);
        println!(
            "  {:>4}. {:<10} {:<10} {:>7.2} {:>6.2}  {:<10} {} / {}",
            i + 1,
            row.label_1,
            row.label_2,
            score,
            row.titles_similarity_score,
            colorize_band(overlap_band(score)),
            truncate_chars(&row.label_1_title, 28),
            truncate_chars(&row.label_2_title, 28).dimmed(),
        );
    }

    println!();

    let high = rows
        .iter()
        .filter(|r| overlap_band(r.similarity.unwrap_or(0.0)) == "High")
        .count();
    if high > 0 {
        println!(
            "  {} {} pairs share most of their vocabulary",
            "!!".red().bold(),
            high
        );
    }
}

/// Display the top combinations of one pair's cache file.
pub fn display_pair_detail(label_1: u64, label_2: u64, cells: &[OverlapCell], limit: usize) {
    let total: u64 = cells.iter().map(|c| c.count).sum();
    println!(
        "\n{}",
        format!(
            "=== Overlap {label_1} x {label_2} ({} distinct of {total} combinations) ===",
            cells.len()
        )
        .bold()
    );
    println!();

    for (i, cell) in cells.iter().take(limit).enumerate() {
        println!(
            "  {:>3}. [{:>6.2}] x{:<4} {}",
            i + 1,
            cell.score,
            cell.count,
            colorize_band(overlap_band(cell.score)),
        );
        println!("       A: {}", truncate_chars(&cell.tokens_1, 100));
        println!("       B: {}", truncate_chars(&cell.tokens_2, 100).dimmed());
        if !cell.shared.is_empty() {
            println!("       shared: {}", cell.shared.replace(',', ", ").cyan());
        }
    }

    if cells.len() > limit {
        println!("\n  {}", format!("... {} more rows", cells.len() - limit).dimmed());
    }
}

/// Display what a pipeline run did.
pub fn display_run_summary(summary: &RunSummary) {
    println!("  Labels:      {}", summary.labels);
    println!("  Pairs:       {}", summary.pairs);
    println!("  Computed:    {}", summary.computed);
    println!("  From cache:  {}", summary.cache_hits);

    if summary.failures.is_empty() {
        println!("  Failed:      {}", "0".green());
    } else {
        println!(
            "  Failed:      {}",
            summary.failures.len().to_string().red().bold()
        );
        for failure in summary.failures.iter().take(10) {
            println!(
                "    {} x {}: {}",
                failure.label_1,
                failure.label_2,
                failure.error.dimmed()
            );
        }
    }
}

/// Colorize an overlap band string.
fn colorize_band(band: &str) -> colored::ColoredString {
    match band {
        "High" => band.red().bold(),
        "Elevated" => band.bright_red(),
        "Watch" => band.yellow(),
        "Low" => band.green(),
        _ => band.dimmed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_band_thresholds() {
        assert_eq!(overlap_band(100.0), "High");
        assert_eq!(overlap_band(50.0), "High");
        assert_eq!(overlap_band(49.9), "Elevated");
        assert_eq!(overlap_band(10.0), "Watch");
        assert_eq!(overlap_band(0.0), "Low");
    }
}
