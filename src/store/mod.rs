// Durable artifact storage: CSV and JSON files written atomically.
//
// Every checkpoint in the pipeline is a file whose presence means "this step
// is done". Writes therefore go to a unique temporary file in the target
// directory, are synced, and are renamed over the destination. A reader sees
// either no file or a complete one, even when two workers race on the same
// target or the process dies mid-write.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `rows` as CSV under `headers`, atomically replacing `path`.
///
/// The header row is always written, so an empty table round-trips as an
/// empty table rather than an empty file.
pub fn write_csv_atomic<T: Serialize>(path: &Path, headers: &[&str], rows: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to serialize row for {}", path.display()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))?;

    write_bytes_atomic(path, &bytes)
}

/// Write `value` as pretty JSON, atomically replacing `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &bytes)
}

/// Write raw bytes to a sibling temp file, sync it, then rename over `path`.
pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    write_with(path, |file| {
        file.write_all(bytes)?;
        Ok(())
    })
}

/// Fill a sibling temp file with `fill`, sync it, then rename over `path`.
///
/// The temp file is removed on any failure, whether in `fill`, the sync or
/// the rename.
fn write_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut File) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let temp_path = temp_path_for(path);
    let result = (|| -> Result<()> {
        let mut file = File::create(&temp_path)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        fill(&mut file).with_context(|| format!("Failed to write {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", temp_path.display()))?;
        drop(file);
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move result into {}", path.display()))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Read every row of a CSV file with a header row.
pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.with_context(|| format!("Malformed row {} in {}", i + 1, path.display()))
        })
        .collect()
}

/// Read only the header row of a CSV file.
pub fn read_csv_headers(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read headers of {}", path.display()))?;
    Ok(headers.iter().map(str::to_string).collect())
}

/// Temp files are hidden and carry the pid and a counter so concurrent
/// writers to the same target never share one.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{file_name}.{}.{n}.tmp", std::process::id()))
}

/// Whether a directory entry is a leftover temp file from an interrupted write.
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(".tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        name: String,
        score: Option<f64>,
    }

    #[test]
    fn test_round_trip_with_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![
            Row { name: "a, b".to_string(), score: Some(1.5) },
            Row { name: "c".to_string(), score: None },
        ];

        write_csv_atomic(&path, &["name", "score"], &rows).unwrap();
        let back: Vec<Row> = read_csv(&path).unwrap();

        assert_eq!(back, rows);
    }

    #[test]
    fn test_empty_table_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");

        write_csv_atomic::<Row>(&path, &["name", "score"], &[]).unwrap();

        assert_eq!(read_csv_headers(&path).unwrap(), vec!["name", "score"]);
        assert!(read_csv::<Row>(&path).unwrap().is_empty());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();

        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries, vec![path.clone()]);
    }

    #[test]
    fn test_temp_file_detection() {
        let target = Path::new("/data/overlap_1_2.csv");
        let temp = temp_path_for(target);
        assert!(is_temp_file(&temp));
        assert!(!is_temp_file(target));
    }

    fn dir_entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let result = write_with(&path, |file| {
            file.write_all(b"partial")?;
            anyhow::bail!("disk full")
        });

        assert!(result.is_err());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the way makes the rename fail
        let path = dir.path().join("out.csv");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        assert!(write_bytes_atomic(&path, b"data").is_err());
        assert_eq!(dir_entries(dir.path()), vec![path.clone()]);
    }
}
