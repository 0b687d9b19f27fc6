// Dataset tables: raw labeled records, their normalized form, and the
// code-to-title reference tables.
//
// Loading is the only place that touches the raw CSV layout. Everything
// downstream works with these in-memory value types.

pub mod loader;

use rayon::prelude::*;

use crate::lexical::normalize::UnigramNormalizer;

/// One dataset row as loaded: a label code and its nullable text fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub label: u64,
    pub fields: Vec<Option<String>>,
}

impl RawRecord {
    /// Concatenate all text fields in column order, null fields as empty.
    ///
    /// Fields are joined with no separator, so the last word of one field
    /// and the first word of the next run together.
    pub fn concatenated(&self) -> String {
        self.fields.iter().flatten().map(String::as_str).collect()
    }
}

/// A record after normalization. Immutable for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub label: u64,
    /// Space-joined unique unigrams of the concatenated text
    pub tokens: String,
}

/// One code-to-title lookup table (e.g. one release of the code list).
#[derive(Debug, Clone, Default)]
pub struct TitleTable {
    pub name: String,
    pub entries: Vec<(u64, String)>,
}

impl TitleTable {
    /// First title listed for `code` in this table.
    pub fn lookup(&self, code: u64) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, title)| title.as_str())
    }
}

/// Normalize every record's concatenated text on the worker pool.
pub fn normalize_dataset(raw: &[RawRecord], normalizer: &UnigramNormalizer) -> Vec<Record> {
    raw.par_iter()
        .map(|r| Record {
            label: r.label,
            tokens: normalizer.normalize(Some(&r.concatenated())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(label: u64, fields: &[Option<&str>]) -> RawRecord {
        RawRecord {
            label,
            fields: fields.iter().map(|f| f.map(str::to_string)).collect(),
        }
    }

    #[test]
    fn test_concatenation_skips_nulls() {
        let r = raw(1, &[Some("hex "), None, Some("bolt"), Some("")]);
        assert_eq!(r.concatenated(), "hex bolt");
    }

    #[test]
    fn test_concatenation_has_no_separator() {
        let r = raw(1, &[Some("hex"), Some("bolt")]);
        assert_eq!(r.concatenated(), "hexbolt");
    }

    #[test]
    fn test_normalize_dataset_keeps_order_and_labels() {
        let records = vec![
            raw(10, &[Some("pump, pump "), Some("seal")]),
            raw(20, &[None, None]),
        ];
        let normalized = normalize_dataset(&records, &UnigramNormalizer::default());
        assert_eq!(
            normalized,
            vec![
                Record { label: 10, tokens: "pump seal".to_string() },
                Record { label: 20, tokens: String::new() },
            ]
        );
    }

    #[test]
    fn test_title_lookup_takes_first_match() {
        let table = TitleTable {
            name: "t".to_string(),
            entries: vec![(1, "first".to_string()), (1, "second".to_string())],
        };
        assert_eq!(table.lookup(1), Some("first"));
        assert_eq!(table.lookup(2), None);
    }
}
