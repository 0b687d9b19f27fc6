// CSV loaders for the labeled dataset and the title reference tables.
//
// Columns are located by header name, so extra columns and column order in
// the source files do not matter.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{RawRecord, TitleTable};

/// Load the labeled dataset.
///
/// Empty cells become null fields. Rows whose label cell is not an unsigned
/// integer are skipped and logged; a missing column is an error.
pub fn load_dataset(path: &Path, label_column: &str, text_columns: &[String]) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open dataset {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read dataset headers from {}", path.display()))?
        .clone();

    let label_idx = column_index(&headers, label_column)
        .with_context(|| format!("Dataset {} has no label column", path.display()))?;
    let text_idx: Vec<usize> = text_columns
        .iter()
        .map(|c| {
            column_index(&headers, c)
                .with_context(|| format!("Dataset {} has no text column", path.display()))
        })
        .collect::<Result<_>>()?;

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed dataset row {}", line + 1))?;

        let label = match row.get(label_idx).map(str::trim).and_then(|s| parse_code(s)) {
            Some(label) => label,
            None => {
                skipped += 1;
                continue;
            }
        };

        let fields = text_idx
            .iter()
            .map(|&i| row.get(i).filter(|s| !s.is_empty()).map(str::to_string))
            .collect();

        records.push(RawRecord { label, fields });
    }

    if skipped > 0 {
        warn!(skipped, "Dataset rows without a numeric label were skipped");
    }
    info!(records = records.len(), path = %path.display(), "Loaded dataset");

    Ok(records)
}

/// Load code-to-title reference tables, in precedence order.
///
/// Each file needs `Code` and `Title` columns. Rows with a non-numeric code
/// are ignored (reference files often carry section headings).
pub fn load_title_tables(paths: &[impl AsRef<Path>]) -> Result<Vec<TitleTable>> {
    paths.iter().map(|p| load_title_table(p.as_ref())).collect()
}

fn load_title_table(path: &Path) -> Result<TitleTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open title table {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let code_idx = column_index(&headers, "Code")
        .with_context(|| format!("Title table {} has no Code column", path.display()))?;
    let title_idx = column_index(&headers, "Title")
        .with_context(|| format!("Title table {} has no Title column", path.display()))?;

    let mut entries = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("Malformed row in {}", path.display()))?;
        let code = row.get(code_idx).map(str::trim).and_then(parse_code);
        let title = row.get(title_idx).map(str::trim).unwrap_or_default();
        if let Some(code) = code {
            entries.push((code, title.to_string()));
        }
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    info!(table = %name, entries = entries.len(), "Loaded title table");
    Ok(TitleTable { name, entries })
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow::anyhow!("missing column '{name}'"))
}

/// Codes exported by spreadsheets often arrive as floats ("43211500.0").
fn parse_code(cell: &str) -> Option<u64> {
    let digits = cell.strip_suffix(".0").unwrap_or(cell);
    digits.parse().ok()
}
