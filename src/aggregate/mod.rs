//! Aggregation over the combined dataset.
//!
//! - `filter`: row selection, export scope, reports-used summary
//! - `weighted`: head-count-weighted metrics and the weight-range pivot
//! - `weekly`: the same metrics per (week, weight range) for trends

pub mod filter;
pub mod weekly;
pub mod weighted;

pub use filter::*;
pub use weekly::*;
pub use weighted::*;
