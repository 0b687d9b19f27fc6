// Overlap analysis: per-pair cross-product aggregation and the batch that
// assembles the final matrix.

pub mod cross_product;
pub mod matrix;
