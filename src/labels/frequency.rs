// Label frequency index.
//
// Ranks every label code in the dataset by how many records carry it,
// resolves a display title from the reference tables, and derives the
// hierarchy level from the code's digit pattern. Labels without a title
// are dropped here and never reach pairing.
//
// The index is a checkpoint: once written it is loaded verbatim on later
// runs and never rebuilt.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::Result;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::dataset::TitleTable;
use crate::store;

/// Title used when no reference table knows a code.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Column order of the persisted index.
pub const LABEL_FREQUENCY_HEADERS: [&str; 4] = ["label", "level", "count", "label_title"];

/// Deepest hierarchy level (a fully specific code).
const MAX_LEVEL: i32 = 4;

/// Codes are eight decimal digits; the leading segment is never zero.
const CODE_PATTERN: &str = r"^[1-9][0-9]{7}$";

/// A classification label with its frequency in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(rename = "label")]
    pub code: u64,
    pub level: u8,
    pub count: usize,
    #[serde(rename = "label_title")]
    pub title: String,
}

/// Outcome of building the index from scratch.
#[derive(Debug, Default)]
pub struct LabelIndexBuild {
    /// Labels with a resolved title, most frequent first
    pub labels: Vec<Label>,
    /// Codes dropped because no reference table had a title
    pub unresolved: Vec<u64>,
    /// Codes dropped because they are not eight-digit codes
    pub malformed: Vec<u64>,
}

fn code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CODE_PATTERN).expect("valid code pattern"))
}

/// Derive the hierarchy level of a code from where "00" appears in it.
///
/// Every start position of "00" is found, overlaps included. No position
/// means a leaf (level 4). A single position lowers the level by one, except
/// at an odd offset (e.g. 94132001) where the pair straddles two segments and
/// the level is kept. Several positions lower it by their count, offset by
/// half their count since a zeroed segment contributes overlapping matches.
pub fn derive_level(code: u64) -> Result<u8> {
    let digits = code.to_string();
    if !code_regex().is_match(&digits) {
        anyhow::bail!("Label code {code} is not an eight-digit classification code");
    }

    let bytes = digits.as_bytes();
    let positions: Vec<usize> = (0..bytes.len() - 1)
        .filter(|&i| bytes[i] == b'0' && bytes[i + 1] == b'0')
        .collect();

    let n = positions.len() as i32;
    let level = match positions.as_slice() {
        [] => MAX_LEVEL,
        [only] => MAX_LEVEL - 1 + (only % 2) as i32,
        _ => MAX_LEVEL - n + n / 2,
    };

    Ok(level as u8)
}

/// Title for `code`: the first match within a table, the last table that matches.
pub fn resolve_title(code: u64, tables: &[TitleTable]) -> Option<String> {
    tables
        .iter()
        .filter_map(|t| t.lookup(code))
        .filter(|title| !title.is_empty() && *title != UNKNOWN_TITLE)
        .last()
        .map(str::to_string)
}

/// Count codes by frequency, most frequent first.
///
/// Ties keep the order in which codes first appear.
pub fn count_labels(codes: impl IntoIterator<Item = u64>) -> Vec<(u64, usize)> {
    let mut order: Vec<u64> = Vec::new();
    let mut counts: HashMap<u64, usize> = HashMap::new();

    for code in codes {
        let count = counts.entry(code).or_insert_with(|| {
            order.push(code);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<(u64, usize)> = order.into_iter().map(|c| (c, counts[&c])).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

/// Build the index from the dataset's label codes.
pub fn build_label_index(
    codes: impl IntoIterator<Item = u64>,
    tables: &[TitleTable],
) -> LabelIndexBuild {
    let mut build = LabelIndexBuild::default();

    for (code, count) in count_labels(codes) {
        let level = match derive_level(code) {
            Ok(level) => level,
            Err(e) => {
                warn!(code, error = %e, "Excluding malformed label code");
                build.malformed.push(code);
                continue;
            }
        };

        match resolve_title(code, tables) {
            Some(title) => build.labels.push(Label {
                code,
                level,
                count,
                title,
            }),
            None => build.unresolved.push(code),
        }
    }

    build
}

/// Load the persisted index if present, otherwise build and persist it.
pub fn load_or_build_label_index(
    path: &Path,
    codes: impl IntoIterator<Item = u64>,
    tables: &[TitleTable],
) -> Result<Vec<Label>> {
    if path.is_file() {
        let labels: Vec<Label> = store::read_csv(path)?;
        info!(labels = labels.len(), path = %path.display(), "Label frequency file found");
        return Ok(labels);
    }

    info!("Label frequency file not found, generating");
    let build = build_label_index(codes, tables);

    if !build.unresolved.is_empty() {
        info!(
            count = build.unresolved.len(),
            "Labels without a reference title were excluded"
        );
    }
    if !build.malformed.is_empty() {
        warn!(
            count = build.malformed.len(),
            codes = ?build.malformed,
            "Malformed label codes were excluded"
        );
    }

    store::write_csv_atomic(path, &LABEL_FREQUENCY_HEADERS, &build.labels)?;
    info!(labels = build.labels.len(), path = %path.display(), "Label frequency file saved");

    Ok(build.labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, entries: &[(u64, &str)]) -> TitleTable {
        TitleTable {
            name: name.to_string(),
            entries: entries.iter().map(|(c, t)| (*c, t.to_string())).collect(),
        }
    }

    #[test]
    fn test_level_reference_table() {
        let cases: [(u64, u8); 12] = [
            (94131500, 3),
            (94132001, 4), // single "00" at odd offset
            (94131501, 4),
            (12345678, 4),
            (10101010, 4),
            (43211500, 3),
            (43210000, 2),
            (43201500, 3),
            (94100000, 2),
            (94000000, 1),
            (10000000, 1),
            (10100100, 3),
        ];
        for (code, expected) in cases {
            assert_eq!(
                derive_level(code).unwrap(),
                expected,
                "level of {code}"
            );
        }
    }

    #[test]
    fn test_level_rejects_wrong_width() {
        assert!(derive_level(4321150).is_err());
        assert!(derive_level(432115001).is_err());
        assert!(derive_level(0).is_err());
    }

    #[test]
    fn test_count_labels_descending_with_stable_ties() {
        let ranked = count_labels([30, 10, 20, 10, 20, 40]);
        assert_eq!(ranked, vec![(10, 2), (20, 2), (30, 1), (40, 1)]);
    }

    #[test]
    fn test_resolve_title_last_table_wins() {
        let tables = vec![
            table("v1", &[(43211500, "Computers")]),
            table("v2", &[]),
            table("v3", &[(43211500, "Computer equipment"), (43211500, "Dup")]),
        ];
        assert_eq!(
            resolve_title(43211500, &tables).as_deref(),
            Some("Computer equipment")
        );
        assert_eq!(resolve_title(43211501, &tables), None);
    }

    #[test]
    fn test_build_drops_unresolved_and_malformed() {
        let tables = vec![table("v1", &[(43211500, "Computers"), (43211600, "Unknown")])];
        let codes = [43211500, 43211500, 43211600, 999, 43211700];

        let build = build_label_index(codes, &tables);

        assert_eq!(
            build.labels,
            vec![Label {
                code: 43211500,
                level: 3,
                count: 2,
                title: "Computers".to_string(),
            }]
        );
        assert_eq!(build.unresolved, vec![43211600, 43211700]);
        assert_eq!(build.malformed, vec![999]);
    }

    #[test]
    fn test_persisted_index_is_loaded_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label_frequency.csv");
        let tables = vec![table("v1", &[(43211500, "Computers"), (43211600, "Accessories")])];

        let first = load_or_build_label_index(&path, [43211500, 43211600, 43211600], &tables).unwrap();
        assert_eq!(first[0].code, 43211600);

        // Different input, same file: nothing is rebuilt.
        let second = load_or_build_label_index(&path, [43211500], &[]).unwrap();
        assert_eq!(first, second);
    }
}
