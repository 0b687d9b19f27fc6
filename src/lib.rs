// label-overlap: cross-label lexical overlap analysis.
//
// This is the library root. Each module corresponds to a stage of the
// overlap pipeline, leaf-first: text normalization and scoring, label
// indexing and pairing, title similarity, and the per-pair aggregation
// driven by the matrix orchestrator.

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod labels;
pub mod lexical;
pub mod output;
pub mod similarity;
pub mod status;
pub mod store;
